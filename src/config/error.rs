//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid listen address: {0}")]
    InvalidListenAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool max_connections must be between 1 and {0}")]
    PoolSizeOutOfRange(u32),

    #[error("Invalid payment gateway URL")]
    InvalidGatewayUrl,

    #[error("Webhook callback URL must use HTTPS in production")]
    CallbackMustBeHttps,

    #[error("Cron secret must be at least {0} characters")]
    CronSecretTooShort(usize),

    #[error("Invalid billing setting '{field}': {reason}")]
    InvalidBilling { field: &'static str, reason: String },

    #[error("Rate limit '{0}' must be greater than zero")]
    InvalidRateLimit(&'static str),
}
