//! Database configuration

use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use super::error::ValidationError;

/// Upper bound for `max_connections`; the billing sweep and webhook traffic
/// never need more and Postgres defaults to 100 slots in total.
const POOL_CEILING: u32 = 50;

/// PostgreSQL connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` or `postgresql://` URL
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds a request waits for a free connection
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Apply `migrations/` on startup
    #[serde(default)]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    /// Pool options built from these settings.
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.url.split_once("://") {
            None if self.url.is_empty() => Err(ValidationError::MissingRequired("DATABASE__URL")),
            Some(("postgres" | "postgresql", rest)) if !rest.is_empty() => {
                if self.max_connections == 0 || self.max_connections > POOL_CEILING {
                    Err(ValidationError::PoolSizeOutOfRange(POOL_CEILING))
                } else {
                    Ok(())
                }
            }
            _ => Err(ValidationError::InvalidDatabaseUrl),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_url(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            run_migrations: false,
        }
    }

    #[test]
    fn both_postgres_schemes_are_accepted() {
        assert!(with_url("postgres://lms@localhost/lms").validate().is_ok());
        assert!(with_url("postgresql://lms:secret@db:5432/lms").validate().is_ok());
    }

    #[test]
    fn empty_url_is_reported_as_missing() {
        assert_eq!(
            with_url("").validate(),
            Err(ValidationError::MissingRequired("DATABASE__URL"))
        );
    }

    #[test]
    fn other_databases_are_rejected() {
        for url in ["mysql://localhost/lms", "postgres://", "localhost:5432"] {
            assert_eq!(with_url(url).validate(), Err(ValidationError::InvalidDatabaseUrl));
        }
    }

    #[test]
    fn pool_size_must_be_within_ceiling() {
        let mut config = with_url("postgres://localhost/lms");
        config.max_connections = 0;
        assert_eq!(config.validate(), Err(ValidationError::PoolSizeOutOfRange(50)));
        config.max_connections = 51;
        assert!(config.validate().is_err());
        config.max_connections = 50;
        assert!(config.validate().is_ok());
    }
}
