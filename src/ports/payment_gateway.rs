//! Payment gateway port.
//!
//! Starts a collection with the external mobile-money gateway. Settlement
//! arrives later through the signed webhook, so this port only needs to
//! hand back the gateway's payment id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};

/// Port for starting payments with the gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Request a payment. The returned `payment_id` is what later
    /// notifications carry as `id`.
    async fn request_payment(&self, request: PaymentRequest) -> Result<PaymentSession, PaymentError>;
}

/// A payment to collect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Reference echoed back in notifications.
    pub reference: String,

    /// Amount in currency units.
    pub amount: i64,

    pub description: String,

    /// Mobile-money number to collect from, when known up front.
    pub phone_number: Option<String>,

    pub customer_email: Option<String>,
}

/// Gateway answer to a payment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Gateway payment id.
    pub payment_id: String,

    /// Hosted page for the payer, if the gateway provides one.
    pub payment_link: Option<String>,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,

    /// HTTP status returned by the gateway, if any.
    pub upstream_status: Option<u16>,

    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            upstream_status: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_upstream_status(mut self, status: u16) -> Self {
        self.upstream_status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::InvalidRequest => ErrorCode::ValidationFailed,
            _ => ErrorCode::UpstreamPaymentError,
        };
        DomainError::new(code, err.message)
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Gateway unreachable or timed out.
    NetworkError,

    /// API key rejected.
    AuthenticationError,

    /// Gateway refused the request (bad phone number, amount, ...).
    InvalidRequest,

    /// Gateway throttled us.
    RateLimitExceeded,

    /// Gateway-side failure.
    ProviderError,

    /// Response could not be understood.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ProviderError
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_retryable() {
        assert!(PaymentError::network("timeout").retryable);
        assert!(!PaymentError::authentication("bad key").retryable);
    }

    #[test]
    fn invalid_request_maps_to_validation() {
        let err: DomainError = PaymentError::invalid_request("bad phone").into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn provider_errors_map_to_upstream() {
        let err: DomainError = PaymentError::provider("500").with_upstream_status(500).into();
        assert_eq!(err.code, ErrorCode::UpstreamPaymentError);
    }

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }
}
