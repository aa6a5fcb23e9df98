//! Mapping of domain errors onto HTTP responses.
//!
//! Every handler returns `Result<_, ApiError>`. The status comes from the
//! error's [`ErrorCode`]; infrastructure failures are logged here and the
//! client only sees a generic message.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::capacity::CenterError;
use crate::domain::enrollment::EnrollmentError;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::subscription::SubscriptionError;

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

/// HTTP status for an error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,

        ErrorCode::CourseNotFound
        | ErrorCode::CenterNotFound
        | ErrorCode::EnrollmentNotFound
        | ErrorCode::UserNotFound => StatusCode::NOT_FOUND,

        ErrorCode::AlreadyEnrolled
        | ErrorCode::CenterLocked
        | ErrorCode::CapacityExceeded
        | ErrorCode::LocationLocked
        | ErrorCode::CenterInUse
        | ErrorCode::AlreadyActive
        | ErrorCode::NotEjected
        | ErrorCode::SubscriptionActive
        | ErrorCode::InvalidStateTransition
        | ErrorCode::ConcurrentModification => StatusCode::CONFLICT,

        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden | ErrorCode::SignatureInvalid => StatusCode::FORBIDDEN,
        ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,

        ErrorCode::UpstreamPaymentError => StatusCode::BAD_GATEWAY,
        ErrorCode::DatabaseError | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// API error returned by every handler.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            retry_after_secs: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.code)
    }
}

impl From<EnrollmentError> for ApiError {
    fn from(err: EnrollmentError) -> Self {
        let api = ApiError::new(err.code(), err.message());
        match err {
            EnrollmentError::LocationLocked { bound_to } => {
                api.with_details(serde_json::json!({ "bound_center_id": bound_to }))
            }
            EnrollmentError::CenterLocked { center_id, reason } => api.with_details(
                serde_json::json!({ "center_id": center_id, "reason": reason.describe() }),
            ),
            _ => api,
        }
    }
}

impl From<CenterError> for ApiError {
    fn from(err: CenterError) -> Self {
        let api = ApiError::new(err.code(), err.message());
        match err {
            CenterError::InUse { seats_held, .. } => {
                api.with_details(serde_json::json!({ "seats_held": seats_held }))
            }
            _ => api,
        }
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        let api = ApiError::new(err.code(), err.to_string());
        match err {
            SubscriptionError::AlreadyActive {
                paid_until: Some(paid_until),
                ..
            } => api.with_details(serde_json::json!({ "paid_until": paid_until })),
            _ => api,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::new(err.code, err.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            tracing::error!(code = %self.code, error = %self.message, "request failed");
            "An internal error occurred".to_string()
        } else {
            self.message
        };

        let body = ErrorResponse {
            error_code: self.code.to_string(),
            message,
            details: self.details,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
