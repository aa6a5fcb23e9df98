//! Subscription gate handlers.
//!
//! ## Commands
//! - Starting the one-time trial
//! - Starting a monthly subscription payment
//!
//! ## Queries
//! - Access status for the current user

mod check_subscription;
mod initiate_subscription_payment;
mod start_trial;

pub use check_subscription::{CheckSubscriptionHandler, CheckSubscriptionQuery};
pub use initiate_subscription_payment::{
    InitiateSubscriptionPaymentCommand, InitiateSubscriptionPaymentHandler,
    InitiateSubscriptionPaymentResult,
};
pub use start_trial::{StartTrialCommand, StartTrialHandler, StartTrialResult};
