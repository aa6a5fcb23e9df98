//! Payment notifications delivered by the gateway.

use serde::Deserialize;

use super::{PaymentReference, WebhookError};

/// Gateway payment status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    Failed,
    Canceled,
    Pending,
    Unknown(String),
}

impl PaymentStatus {
    /// Parses the gateway's status string. Both spellings of "canceled"
    /// are accepted.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" | "successful" => PaymentStatus::Success,
            "failed" => PaymentStatus::Failed,
            "canceled" | "cancelled" => PaymentStatus::Canceled,
            "pending" => PaymentStatus::Pending,
            other => PaymentStatus::Unknown(other.to_string()),
        }
    }

    /// Key used for idempotent event logging.
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Unknown(raw) => raw,
        }
    }

    /// True for terminal negative outcomes.
    pub fn is_failure(&self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Canceled)
    }
}

#[derive(Debug, Deserialize)]
struct RawNotification {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "externalId")]
    reference: Option<String>,
    #[serde(default)]
    amount: Option<serde_json::Value>,
}

/// Parsed gateway notification: `{id, status, reference, amount}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentNotification {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub amount: Option<i64>,
    /// Full payload, kept for the audit log.
    pub raw: serde_json::Value,
}

impl PaymentNotification {
    /// Parses a verified request body.
    ///
    /// # Errors
    ///
    /// - `ParseError` if the body is not a JSON object
    /// - `MissingField("id")` if the payment id is absent or blank
    pub fn from_body(body: &[u8]) -> Result<Self, WebhookError> {
        let raw: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let fields: RawNotification = serde_json::from_value(raw.clone())
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let payment_id = fields
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(WebhookError::MissingField("id"))?;

        let amount = fields.amount.and_then(|value| match value {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });

        Ok(Self {
            payment_id,
            status: PaymentStatus::parse(fields.status.as_deref().unwrap_or_default()),
            reference: fields.reference.filter(|r| !r.is_empty()),
            amount,
            raw,
        })
    }

    /// Decoded reference, if present and recognized.
    pub fn parsed_reference(&self) -> Option<PaymentReference> {
        self.reference.as_deref().and_then(PaymentReference::parse)
    }
}
