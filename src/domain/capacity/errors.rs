//! Capacity-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | CourseNotFound | 404 |
//! | NotCenterBacked | 400 |
//! | InUse | 409 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{CenterId, CourseId, DomainError, ErrorCode, ValidationError};

/// Errors raised while administering centers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CenterError {
    /// Center was not found.
    NotFound(CenterId),

    /// Parent course was not found.
    CourseNotFound(CourseId),

    /// Course does not use centers.
    NotCenterBacked(CourseId),

    /// Center still has Pending or Active enrollments.
    InUse { center_id: CenterId, seats_held: u64 },

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Storage failure.
    Infrastructure(String),
}

impl CenterError {
    pub fn not_found(id: CenterId) -> Self {
        CenterError::NotFound(id)
    }

    pub fn course_not_found(id: CourseId) -> Self {
        CenterError::CourseNotFound(id)
    }

    pub fn not_center_backed(id: CourseId) -> Self {
        CenterError::NotCenterBacked(id)
    }

    pub fn in_use(center_id: CenterId, seats_held: u64) -> Self {
        CenterError::InUse {
            center_id,
            seats_held,
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CenterError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        CenterError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CenterError::NotFound(_) => ErrorCode::CenterNotFound,
            CenterError::CourseNotFound(_) => ErrorCode::CourseNotFound,
            CenterError::NotCenterBacked(_) | CenterError::ValidationFailed { .. } => {
                ErrorCode::ValidationFailed
            }
            CenterError::InUse { .. } => ErrorCode::CenterInUse,
            CenterError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            CenterError::NotFound(id) => format!("Center not found: {}", id),
            CenterError::CourseNotFound(id) => format!("Course not found: {}", id),
            CenterError::NotCenterBacked(id) => {
                format!("Course {} is not an infrastructure-based course", id)
            }
            CenterError::InUse {
                center_id,
                seats_held,
            } => format!(
                "Center {} still has {} enrollment(s) holding seats",
                center_id, seats_held
            ),
            CenterError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            CenterError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for CenterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for CenterError {}

impl From<ValidationError> for CenterError {
    fn from(err: ValidationError) -> Self {
        CenterError::validation(err.field().to_string(), err.to_string())
    }
}

impl From<DomainError> for CenterError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => CenterError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => CenterError::Infrastructure(err.to_string()),
        }
    }
}

impl From<CenterError> for DomainError {
    fn from(err: CenterError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
