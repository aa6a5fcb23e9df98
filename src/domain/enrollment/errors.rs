//! Enrollment-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound / NotFoundForPayment | 404 |
//! | CourseNotFound / CenterNotFound | 404 |
//! | NotCenterBacked | 400 |
//! | AlreadyEnrolled | 409 |
//! | CenterLocked | 409 |
//! | CapacityExceeded | 409 |
//! | LocationLocked | 409 |
//! | AlreadyActive | 409 |
//! | NotEjected | 409 |
//! | InvalidState | 409 |
//! | NotOwner | 403 |
//! | ValidationFailed | 400 |
//! | Conflict | 409 |
//! | UpstreamPayment | 502 |
//! | Infrastructure | 500 |

use crate::domain::capacity::LockReason;
use crate::domain::foundation::{
    CenterId, CourseId, DomainError, EnrollmentId, ErrorCode, ValidationError,
};

/// Enrollment-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentError {
    /// Enrollment was not found.
    NotFound(EnrollmentId),

    /// No enrollment matches the payment id.
    NotFoundForPayment(String),

    /// Course was not found.
    CourseNotFound(CourseId),

    /// Center was not found.
    CenterNotFound(CenterId),

    /// Course does not use centers.
    NotCenterBacked { course_id: CourseId, title: String },

    /// User already holds an Active enrollment for the course.
    AlreadyEnrolled(CourseId),

    /// Center refuses new claims.
    CenterLocked {
        center_id: CenterId,
        reason: LockReason,
    },

    /// No seat left at the center.
    CapacityExceeded(CenterId),

    /// Enrollment is bound to another center.
    LocationLocked { bound_to: CenterId },

    /// Enrollment is already Active.
    AlreadyActive(EnrollmentId),

    /// Unlock requested for an enrollment that was never ejected.
    NotEjected(EnrollmentId),

    /// Transition not allowed from the current state.
    InvalidState { current: String, attempted: String },

    /// Caller does not own the enrollment.
    NotOwner,

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// The record kept changing underneath us.
    Conflict(EnrollmentId),

    /// Payment gateway failure.
    UpstreamPayment(String),

    /// Storage failure.
    Infrastructure(String),
}

impl EnrollmentError {
    pub fn not_found(id: EnrollmentId) -> Self {
        EnrollmentError::NotFound(id)
    }

    pub fn not_found_for_payment(payment_id: impl Into<String>) -> Self {
        EnrollmentError::NotFoundForPayment(payment_id.into())
    }

    pub fn course_not_found(id: CourseId) -> Self {
        EnrollmentError::CourseNotFound(id)
    }

    pub fn center_not_found(id: CenterId) -> Self {
        EnrollmentError::CenterNotFound(id)
    }

    pub fn not_center_backed(course_id: CourseId, title: impl Into<String>) -> Self {
        EnrollmentError::NotCenterBacked {
            course_id,
            title: title.into(),
        }
    }

    pub fn already_enrolled(course_id: CourseId) -> Self {
        EnrollmentError::AlreadyEnrolled(course_id)
    }

    pub fn center_locked(center_id: CenterId, reason: LockReason) -> Self {
        EnrollmentError::CenterLocked { center_id, reason }
    }

    pub fn capacity_exceeded(center_id: CenterId) -> Self {
        EnrollmentError::CapacityExceeded(center_id)
    }

    pub fn location_locked(bound_to: CenterId) -> Self {
        EnrollmentError::LocationLocked { bound_to }
    }

    pub fn already_active(id: EnrollmentId) -> Self {
        EnrollmentError::AlreadyActive(id)
    }

    pub fn not_ejected(id: EnrollmentId) -> Self {
        EnrollmentError::NotEjected(id)
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        EnrollmentError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EnrollmentError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        EnrollmentError::UpstreamPayment(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        EnrollmentError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EnrollmentError::NotFound(_) | EnrollmentError::NotFoundForPayment(_) => {
                ErrorCode::EnrollmentNotFound
            }
            EnrollmentError::CourseNotFound(_) => ErrorCode::CourseNotFound,
            EnrollmentError::CenterNotFound(_) => ErrorCode::CenterNotFound,
            EnrollmentError::NotCenterBacked { .. } | EnrollmentError::ValidationFailed { .. } => {
                ErrorCode::ValidationFailed
            }
            EnrollmentError::AlreadyEnrolled(_) => ErrorCode::AlreadyEnrolled,
            EnrollmentError::CenterLocked { .. } => ErrorCode::CenterLocked,
            EnrollmentError::CapacityExceeded(_) => ErrorCode::CapacityExceeded,
            EnrollmentError::LocationLocked { .. } => ErrorCode::LocationLocked,
            EnrollmentError::AlreadyActive(_) => ErrorCode::AlreadyActive,
            EnrollmentError::NotEjected(_) => ErrorCode::NotEjected,
            EnrollmentError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            EnrollmentError::NotOwner => ErrorCode::Forbidden,
            EnrollmentError::Conflict(_) => ErrorCode::ConcurrentModification,
            EnrollmentError::UpstreamPayment(_) => ErrorCode::UpstreamPaymentError,
            EnrollmentError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            EnrollmentError::NotFound(id) => format!("Enrollment not found: {}", id),
            EnrollmentError::NotFoundForPayment(payment_id) => {
                format!("No enrollment found for payment {}", payment_id)
            }
            EnrollmentError::CourseNotFound(id) => format!("Course not found: {}", id),
            EnrollmentError::CenterNotFound(id) => format!("Center not found: {}", id),
            EnrollmentError::NotCenterBacked { title, .. } => {
                format!("Course '{}' is not an infrastructure-based course", title)
            }
            EnrollmentError::AlreadyEnrolled(_) => {
                "You are already enrolled in this course".to_string()
            }
            EnrollmentError::CenterLocked { reason, .. } => {
                format!("This center is locked: {}", reason.describe())
            }
            EnrollmentError::CapacityExceeded(_) => "This center is full".to_string(),
            EnrollmentError::LocationLocked { bound_to } => format!(
                "Your enrollment is locked to center {}; contact an administrator to move",
                bound_to
            ),
            EnrollmentError::AlreadyActive(id) => {
                format!("Enrollment {} is already active", id)
            }
            EnrollmentError::NotEjected(id) => {
                format!("Enrollment {} was not ejected", id)
            }
            EnrollmentError::InvalidState { current, attempted } => {
                format!("Cannot {} an enrollment in {} state", attempted, current)
            }
            EnrollmentError::NotOwner => "You do not own this enrollment".to_string(),
            EnrollmentError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            EnrollmentError::Conflict(id) => {
                format!("Enrollment {} was modified concurrently, please retry", id)
            }
            EnrollmentError::UpstreamPayment(msg) => format!("Payment provider error: {}", msg),
            EnrollmentError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EnrollmentError::Infrastructure(_)
                | EnrollmentError::UpstreamPayment(_)
                | EnrollmentError::Conflict(_)
        )
    }
}

impl std::fmt::Display for EnrollmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for EnrollmentError {}

impl From<ValidationError> for EnrollmentError {
    fn from(err: ValidationError) -> Self {
        EnrollmentError::validation(err.field().to_string(), err.to_string())
    }
}

impl From<DomainError> for EnrollmentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidStateTransition => EnrollmentError::InvalidState {
                current: "unknown".to_string(),
                attempted: err.message,
            },
            ErrorCode::ValidationFailed => EnrollmentError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::UpstreamPaymentError => EnrollmentError::UpstreamPayment(err.message),
            _ => EnrollmentError::Infrastructure(err.to_string()),
        }
    }
}

impl From<EnrollmentError> for DomainError {
    fn from(err: EnrollmentError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
