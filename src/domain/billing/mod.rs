//! Billing domain module.
//!
//! The billing period, warning window and grace window, plus the generic
//! warn-then-enforce obligation used by both recurring sweeps.

mod obligation;
mod policy;

pub use obligation::{Enforcement, ObligationPhase, RecurringObligation};
pub use policy::BillingPolicy;
