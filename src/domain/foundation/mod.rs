//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, error types and the state machine
//! trait used across the capacity, enrollment and subscription domains.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CenterId, CourseId, EnrollmentId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
