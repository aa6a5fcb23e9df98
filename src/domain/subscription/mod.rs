//! Subscription gate domain module.
//!
//! A trial window followed by a monthly platform fee. Structurally the same
//! due-date and warning pattern as seat billing, but enforcement is a
//! request-time check instead of an ejection.

mod errors;
mod gate;

pub use errors::SubscriptionError;
pub use gate::{AccessStatus, SubscriptionPolicy, TrialOutcome, UserAccount};
