//! Enrollment domain module.
//!
//! # Module Structure
//!
//! - `aggregate` - Enrollment aggregate entity
//! - `effect` - seat counter effects persisted with each transition
//! - `errors` - EnrollmentError
//! - `status` - EnrollmentStatus state machine

mod aggregate;
mod effect;
mod errors;
mod status;

pub use aggregate::{Activation, ActivationKind, Enrollment};
pub use effect::LedgerEffect;
pub use errors::EnrollmentError;
pub use status::EnrollmentStatus;
