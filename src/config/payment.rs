//! Payment gateway configuration

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::adapters::payment_gateway::GatewayConfig;

use super::error::ValidationError;
use super::server::Environment;

/// Mobile-money gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    #[serde(default = "default_gateway_base_url")]
    pub gateway_base_url: String,

    /// Gateway API key
    pub api_key: SecretString,

    /// RSA public key the gateway signs webhooks with, as a full PEM or
    /// the bare base64 body
    pub webhook_public_key: String,

    /// Exact webhook URL registered with the gateway; part of the signed
    /// message
    pub callback_url: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl PaymentConfig {
    /// Client configuration for the gateway adapter.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(self.api_key.clone())
            .with_base_url(&self.gateway_base_url)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    pub fn validate(&self, environment: Environment) -> Result<(), ValidationError> {
        if !self.gateway_base_url.starts_with("https://")
            && !self.gateway_base_url.starts_with("http://")
        {
            return Err(ValidationError::InvalidGatewayUrl);
        }
        if self.webhook_public_key.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__WEBHOOK_PUBLIC_KEY"));
        }
        if self.callback_url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__CALLBACK_URL"));
        }
        if environment == Environment::Production && !self.callback_url.starts_with("https://") {
            return Err(ValidationError::CallbackMustBeHttps);
        }
        Ok(())
    }
}

fn default_gateway_base_url() -> String {
    "https://api.pay.mynkwa.com".to_string()
}

fn default_currency() -> String {
    "XAF".to_string()
}

fn default_timeout() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(callback_url: &str) -> PaymentConfig {
        PaymentConfig {
            gateway_base_url: default_gateway_base_url(),
            api_key: SecretString::new("key_test_123".to_string()),
            webhook_public_key: "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA".to_string(),
            callback_url: callback_url.to_string(),
            currency: default_currency(),
            timeout_secs: default_timeout(),
        }
    }

    #[test]
    fn test_http_callback_allowed_outside_production() {
        let config = config("http://localhost:8080/webhook/payment");
        assert!(config.validate(Environment::Development).is_ok());
    }

    #[test]
    fn test_production_requires_https_callback() {
        let insecure = config("http://lms.example.com/webhook/payment");
        assert_eq!(
            insecure.validate(Environment::Production),
            Err(ValidationError::CallbackMustBeHttps)
        );
        let secure = config("https://lms.example.com/webhook/payment");
        assert!(secure.validate(Environment::Production).is_ok());
    }

    #[test]
    fn test_public_key_required() {
        let mut config = config("https://lms.example.com/webhook/payment");
        config.webhook_public_key = "  ".to_string();
        assert!(matches!(
            config.validate(Environment::Development),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = config("https://lms.example.com/webhook/payment");
        assert!(!format!("{:?}", config).contains("key_test_123"));
    }
}
