//! Payment gateway webhook endpoint.
//!
//! The signature covers the raw body, so the body is taken as bytes and only
//! parsed after verification. Anything past verification is acknowledged
//! with 200; the gateway retries non-2xx answers and settlement outcomes are
//! reconciled from the payment event log instead.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::application::handlers::{SettlePaymentCommand, SettlementReport};
use crate::domain::enrollment::ActivationKind;
use crate::domain::foundation::{EnrollmentId, ErrorCode};
use crate::domain::payment::{PaymentNotification, WebhookError};

use super::super::error::ErrorResponse;
use super::super::state::AppState;

pub const SIGNATURE_HEADER: &str = "X-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Timestamp";

/// Acknowledgement body returned to the gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_id: Option<EnrollmentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ActivationKind>,
}

impl From<SettlementReport> for WebhookAck {
    fn from(report: SettlementReport) -> Self {
        Self {
            received: true,
            outcome: report.outcome.as_str(),
            enrollment_id: report.enrollment_id,
            kind: report.kind,
        }
    }
}

/// POST /webhook/payment - Gateway payment notification
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookError> {
    let signature = header(&headers, SIGNATURE_HEADER)?;
    let timestamp = header(&headers, TIMESTAMP_HEADER)?;

    state
        .signature_verifier
        .verify(timestamp, &body, signature)
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected webhook with bad signature");
            e
        })?;

    let notification = PaymentNotification::from_body(&body)?;
    let report = state
        .settle_payment_handler()
        .handle(SettlePaymentCommand { notification })
        .await?;

    Ok(Json(WebhookAck::from(report)))
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(WebhookError::MissingHeader(name))
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::OK {
            let body = serde_json::json!({ "received": true, "outcome": "failed" });
            return (status, Json(body)).into_response();
        }

        let code = match &self {
            WebhookError::InvalidSignature => ErrorCode::SignatureInvalid,
            WebhookError::InvalidKey(_) => ErrorCode::InternalError,
            _ => ErrorCode::ValidationFailed,
        };
        let message = match &self {
            WebhookError::InvalidKey(e) => {
                tracing::error!(error = %e, "Webhook verification key is unusable");
                "Webhook verification is misconfigured".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(code.to_string(), message))).into_response()
    }
}
