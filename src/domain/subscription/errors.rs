//! Subscription-specific error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId, ValidationError};

/// Errors raised by the subscription gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("User account not found: {0}")]
    UserNotFound(UserId),

    #[error("Subscription for {user_id} is already active")]
    AlreadyActive {
        user_id: UserId,
        paid_until: Option<Timestamp>,
    },

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Payment provider error: {0}")]
    UpstreamPayment(String),

    #[error("Error: {0}")]
    Infrastructure(String),
}

impl SubscriptionError {
    pub fn user_not_found(user_id: UserId) -> Self {
        SubscriptionError::UserNotFound(user_id)
    }

    pub fn already_active(user_id: UserId, paid_until: Option<Timestamp>) -> Self {
        SubscriptionError::AlreadyActive {
            user_id,
            paid_until,
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        SubscriptionError::UpstreamPayment(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SubscriptionError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::UserNotFound(_) => ErrorCode::UserNotFound,
            SubscriptionError::AlreadyActive { .. } => ErrorCode::SubscriptionActive,
            SubscriptionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SubscriptionError::UpstreamPayment(_) => ErrorCode::UpstreamPaymentError,
            SubscriptionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubscriptionError::UpstreamPayment(_) | SubscriptionError::Infrastructure(_)
        )
    }
}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        SubscriptionError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::UpstreamPaymentError => SubscriptionError::UpstreamPayment(err.message),
            _ => SubscriptionError::Infrastructure(err.to_string()),
        }
    }
}

impl From<SubscriptionError> for DomainError {
    fn from(err: SubscriptionError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_active_maps_to_subscription_active() {
        let err = SubscriptionError::already_active(UserId::new("u").unwrap(), None);
        assert_eq!(err.code(), ErrorCode::SubscriptionActive);
        assert!(!err.is_retryable());
    }

    #[test]
    fn upstream_domain_error_is_retryable() {
        let err: SubscriptionError =
            DomainError::new(ErrorCode::UpstreamPaymentError, "gateway down").into();
        assert!(matches!(err, SubscriptionError::UpstreamPayment(ref m) if m == "gateway down"));
        assert!(err.is_retryable());
    }

    #[test]
    fn displays_user() {
        let err = SubscriptionError::user_not_found(UserId::new("user-9").unwrap());
        assert_eq!(err.to_string(), "User account not found: user-9");
    }
}
