//! Payment domain module.
//!
//! Everything needed to turn a gateway delivery into a settlement decision.
//!
//! # Module Structure
//!
//! - `notification` - parsed gateway notification and status
//! - `reference` - payment reference codec and settlement dispatch
//! - `signature` - RSA-SHA256 webhook signature verification
//! - `webhook_errors` - WebhookError with HTTP status mapping

mod notification;
mod reference;
mod signature;
mod webhook_errors;

pub use notification::{PaymentNotification, PaymentStatus};
pub use reference::{PaymentReference, SettlementTarget};
pub use signature::WebhookSignatureVerifier;
pub use webhook_errors::WebhookError;
