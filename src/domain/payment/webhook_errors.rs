//! Webhook error types for payment gateway notifications.
//!
//! The gateway only redelivers on transport failures, so anything past
//! signature verification is acknowledged with 200 and logged.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// A required header was absent.
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The configured public key could not be loaded.
    #[error("Invalid verification key: {0}")]
    InvalidKey(String),

    /// Failed to parse the payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from the payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Notification was intentionally ignored (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if reprocessing the same delivery might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_))
    }

    /// Maps the error to the status code returned to the gateway.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingHeader(_)
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            WebhookError::InvalidSignature => StatusCode::FORBIDDEN,

            WebhookError::InvalidKey(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // Acknowledged; failures are reconciled from the event log
            WebhookError::Ignored(_) | WebhookError::Database(_) => StatusCode::OK,
        }
    }
}
