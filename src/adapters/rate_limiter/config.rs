//! Rate limit configuration types.
//!
//! One fixed window per throttled action.

use crate::ports::RateLimitedAction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete rate limit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Per-action limits.
    pub actions: HashMap<RateLimitedAction, ActionLimits>,
    /// Used for actions without an entry.
    pub fallback: ActionLimits,
}

/// Rate limits for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLimits {
    /// Maximum requests per window.
    pub requests_per_window: u32,
    /// Window duration in seconds.
    pub window_secs: u32,
}

impl RateLimitConfig {
    /// Builds the configuration from the per-window numbers in app config.
    pub fn new(claim_per_window: u32, admin_actions_per_window: u32, window_secs: u32) -> Self {
        let mut actions = HashMap::new();
        actions.insert(
            RateLimitedAction::ClaimSeat,
            ActionLimits {
                requests_per_window: claim_per_window,
                window_secs,
            },
        );
        actions.insert(
            RateLimitedAction::AdminAction,
            ActionLimits {
                requests_per_window: admin_actions_per_window,
                window_secs,
            },
        );
        Self {
            actions,
            fallback: ActionLimits {
                requests_per_window: 60,
                window_secs,
            },
        }
    }

    /// Returns `(limit, window_secs)` for an action.
    pub fn limits_for(&self, action: RateLimitedAction) -> (u32, u32) {
        let limits = self.actions.get(&action).unwrap_or(&self.fallback);
        (limits.requests_per_window, limits.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(10, 20, 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let config = RateLimitConfig::default();
        assert_eq!(config.limits_for(RateLimitedAction::ClaimSeat), (10, 60));
        assert_eq!(config.limits_for(RateLimitedAction::AdminAction), (20, 60));
    }

    #[test]
    fn missing_action_uses_fallback() {
        let mut config = RateLimitConfig::new(1, 2, 30);
        config.actions.remove(&RateLimitedAction::AdminAction);
        assert_eq!(config.limits_for(RateLimitedAction::AdminAction), (60, 30));
    }
}
