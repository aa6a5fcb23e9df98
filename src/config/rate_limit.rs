//! Rate limit configuration

use serde::Deserialize;

use crate::adapters::rate_limiter::RateLimitConfig;

use super::error::ValidationError;

/// Fixed-window limits per user
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_claim")]
    pub claim_per_minute: u32,

    #[serde(default = "default_admin")]
    pub admin_actions_per_minute: u32,

    #[serde(default = "default_window")]
    pub window_secs: u32,
}

impl RateLimitSettings {
    /// Limiter configuration for the rate limiter adapters.
    pub fn limiter_config(&self) -> RateLimitConfig {
        RateLimitConfig::new(
            self.claim_per_minute,
            self.admin_actions_per_minute,
            self.window_secs,
        )
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.claim_per_minute == 0 {
            return Err(ValidationError::InvalidRateLimit("claim_per_minute"));
        }
        if self.admin_actions_per_minute == 0 {
            return Err(ValidationError::InvalidRateLimit("admin_actions_per_minute"));
        }
        if self.window_secs == 0 {
            return Err(ValidationError::InvalidRateLimit("window_secs"));
        }
        Ok(())
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            claim_per_minute: default_claim(),
            admin_actions_per_minute: default_admin(),
            window_secs: default_window(),
        }
    }
}

fn default_claim() -> u32 {
    10
}

fn default_admin() -> u32 {
    20
}

fn default_window() -> u32 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RateLimitedAction;

    #[test]
    fn test_defaults_map_to_limiter_config() {
        let config = RateLimitSettings::default().limiter_config();
        assert_eq!(config.limits_for(RateLimitedAction::ClaimSeat), (10, 60));
        assert_eq!(config.limits_for(RateLimitedAction::AdminAction), (20, 60));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let settings = RateLimitSettings {
            claim_per_minute: 0,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(ValidationError::InvalidRateLimit("claim_per_minute"))
        );
    }
}
