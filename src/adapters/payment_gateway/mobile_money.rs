//! Mobile-money collection client.
//!
//! Implements `PaymentGateway` against the gateway's REST API. A collection
//! request pushes a PIN prompt to the payer's phone; the outcome arrives
//! later through the signed webhook.
//!
//! # Configuration
//!
//! ```ignore
//! let config = GatewayConfig::new(api_key).with_base_url("https://api.pay.example");
//! let gateway = MobileMoneyGateway::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::ports::{PaymentError, PaymentErrorCode, PaymentGateway, PaymentRequest, PaymentSession};

const DEFAULT_BASE_URL: &str = "https://api.pay.mynkwa.com";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Gateway API configuration.
#[derive(Clone)]
pub struct GatewayConfig {
    api_key: SecretString,
    base_url: String,
    timeout: Duration,
}

impl GatewayConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectBody<'a> {
    amount: i64,
    phone_number: &'a str,
    description: &'a str,
    reference: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectResponse {
    id: String,
    #[serde(default)]
    payment_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the mobile-money gateway.
pub struct MobileMoneyGateway {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

impl MobileMoneyGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn error_for_status(status: StatusCode, body: &str) -> PaymentError {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or_else(|| body.to_string());

        let code = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PaymentErrorCode::AuthenticationError,
            StatusCode::TOO_MANY_REQUESTS => PaymentErrorCode::RateLimitExceeded,
            s if s.is_client_error() => PaymentErrorCode::InvalidRequest,
            s if s.is_server_error() => PaymentErrorCode::ProviderError,
            _ => PaymentErrorCode::Unknown,
        };

        PaymentError::new(code, format!("Payment provider error: {}", message))
            .with_upstream_status(status.as_u16())
    }
}

#[async_trait]
impl PaymentGateway for MobileMoneyGateway {
    async fn request_payment(&self, request: PaymentRequest) -> Result<PaymentSession, PaymentError> {
        let Some(phone_number) = request.phone_number.as_deref() else {
            return Err(PaymentError::invalid_request(
                "A mobile-money phone number is required",
            ));
        };

        let url = format!("{}/collect", self.config.base_url);
        let body = CollectBody {
            amount: request.amount,
            phone_number,
            description: &request.description,
            reference: &request.reference,
        };

        let response = self
            .http_client
            .post(&url)
            .header("X-API-Key", self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                reference = %request.reference,
                error = %error_text,
                "Gateway collect request failed"
            );
            return Err(Self::error_for_status(status, &error_text));
        }

        let collected: CollectResponse = response.json().await.map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::Unknown,
                format!("Unreadable gateway response: {}", e),
            )
        })?;

        tracing::info!(
            payment_id = %collected.id,
            reference = %request.reference,
            amount = request.amount,
            "Collection requested"
        );

        Ok(PaymentSession {
            payment_id: collected.id,
            payment_link: collected.payment_link,
        })
    }
}
