//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresCenterRepository` - Centers and manual locks
//! - `PostgresEnrollmentRepository` - Versioned enrollment writes with
//!   conditional seat updates in the same transaction
//! - `PostgresCourseReader` - Course summaries
//! - `PostgresSubscriptionRepository` - Trial and paid-until state
//! - `PostgresPaymentEventLog` - Gateway delivery audit log

mod center_repository;
mod course_reader;
mod enrollment_repository;
mod payment_event_log;
mod subscription_repository;

pub use center_repository::PostgresCenterRepository;
pub use course_reader::PostgresCourseReader;
pub use enrollment_repository::PostgresEnrollmentRepository;
pub use payment_event_log::PostgresPaymentEventLog;
pub use subscription_repository::PostgresSubscriptionRepository;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Maps a sqlx error to a `DatabaseError` with context.
fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}
