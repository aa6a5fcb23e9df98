//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `CenterRepository` - Centers and their manual lock
//! - `EnrollmentRepository` - Enrollment transitions with their seat effects
//! - `CourseReader` - Read-only course summaries
//! - `SubscriptionRepository` - Trial and paid-until state per user
//! - `PaymentEventLog` - Audit trail of gateway notifications
//!
//! ## External Service Ports
//!
//! - `PaymentGateway` - Starting mobile-money collections
//! - `Notifier` - Best-effort email/SMS delivery
//! - `RateLimiter` - Fixed-window throttling of mutating actions

mod center_repository;
mod course_reader;
mod enrollment_repository;
mod notifier;
mod payment_event_log;
mod payment_gateway;
mod rate_limiter;
mod subscription_repository;

pub use center_repository::{CenterDeletion, CenterRepository};
pub use course_reader::{CourseReader, CourseSummary};
pub use enrollment_repository::{CommitOutcome, EnrollmentChange, EnrollmentRepository};
pub use notifier::{
    enrollment_pay_path, Notification, NotificationError, NotificationKind, NotificationPayload,
    Notifier, Recipient,
};
pub use payment_event_log::{EventOutcome, PaymentEventLog, PaymentEventRecord, SaveResult};
pub use payment_gateway::{
    PaymentError, PaymentErrorCode, PaymentGateway, PaymentRequest, PaymentSession,
};
pub use rate_limiter::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus,
    RateLimitedAction, RateLimiter,
};
pub use subscription_repository::{PaymentApplication, SubscriptionPayment, SubscriptionRepository};
