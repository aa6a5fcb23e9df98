//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `CENTER_ENROLLMENT`
//! prefix and `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use center_enrollment::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod billing;
mod database;
mod error;
mod payment;
mod rate_limit;
mod redis;
mod server;

pub use billing::{BillingConfig, MIN_CRON_SECRET_LEN};
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use rate_limit::RateLimitSettings;
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

const ENV_PREFIX: &str = "CENTER_ENROLLMENT";

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Optional; rate limiting falls back to in-process windows without it
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    pub payment: PaymentConfig,

    pub billing: BillingConfig,

    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `CENTER_ENROLLMENT__*` variables:
    ///
    /// - `CENTER_ENROLLMENT__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CENTER_ENROLLMENT__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        if let Some(redis) = &self.redis {
            redis.validate()?;
        }
        self.payment.validate(self.server.environment)?;
        self.billing.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const REQUIRED: &[(&str, &str)] = &[
        ("CENTER_ENROLLMENT__DATABASE__URL", "postgresql://test@localhost/test"),
        ("CENTER_ENROLLMENT__PAYMENT__API_KEY", "key_test_xxx"),
        ("CENTER_ENROLLMENT__PAYMENT__WEBHOOK_PUBLIC_KEY", "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8A"),
        (
            "CENTER_ENROLLMENT__PAYMENT__CALLBACK_URL",
            "https://lms.example.com/webhook/payment",
        ),
        ("CENTER_ENROLLMENT__BILLING__CRON_SECRET", "0123456789abcdef0123"),
    ];

    const OPTIONAL: &[&str] = &[
        "CENTER_ENROLLMENT__SERVER__PORT",
        "CENTER_ENROLLMENT__SERVER__ENVIRONMENT",
        "CENTER_ENROLLMENT__REDIS__URL",
        "CENTER_ENROLLMENT__BILLING__WARNING_DAYS",
    ];

    fn set_minimal_env() {
        for (key, value) in REQUIRED {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in REQUIRED {
            env::remove_var(key);
        }
        for key in OPTIONAL {
            env::remove_var(key);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.payment.currency, "XAF");
        assert!(config.redis.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.billing.period_days, 30);
        assert_eq!(config.billing.warning_days, 3);
        assert_eq!(config.billing.trial_days, 7);
        assert_eq!(config.billing.subscription_price, 1000);
        assert_eq!(config.rate_limit.claim_per_minute, 10);
    }

    #[test]
    fn test_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("CENTER_ENROLLMENT__SERVER__PORT", "3000"),
            ("CENTER_ENROLLMENT__SERVER__ENVIRONMENT", "production"),
            ("CENTER_ENROLLMENT__REDIS__URL", "redis://localhost:6379"),
            ("CENTER_ENROLLMENT__BILLING__WARNING_DAYS", "5"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        assert_eq!(
            config.redis.as_ref().map(|r| r.url.as_str()),
            Some("redis://localhost:6379")
        );
        assert_eq!(config.billing.warning_days, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_database_fails() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::remove_var("CENTER_ENROLLMENT__DATABASE__URL");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }
}
