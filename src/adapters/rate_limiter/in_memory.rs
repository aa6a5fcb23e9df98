//! Process-local fixed windows.
//!
//! Counters live in this process only, so several replicas each enforce
//! the full limit. Used when no Redis is configured, and in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

use super::config::RateLimitConfig;

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: u64,
    hits: u32,
}

impl Window {
    fn closes_at(&self, window_secs: u32) -> u64 {
        self.opened_at + u64::from(window_secs)
    }
}

#[derive(Debug)]
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<RateLimitKey, Window>>,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    async fn check_at(&self, key: RateLimitKey, now: u64) -> RateLimitResult {
        let (limit, window_secs) = self.config.limits_for(key.action);
        let action = key.action;

        let mut windows = self.windows.lock().await;
        let window = windows.entry(key).or_insert(Window {
            opened_at: now,
            hits: 0,
        });
        if now >= window.closes_at(window_secs) {
            *window = Window {
                opened_at: now,
                hits: 0,
            };
        }

        let closes_at = window.closes_at(window_secs);
        if window.hits >= limit {
            let wait = closes_at.saturating_sub(now);
            return RateLimitResult::Denied(RateLimitDenied::new(
                action,
                limit,
                u32::try_from(wait).unwrap_or(u32::MAX),
            ));
        }

        window.hits += 1;
        RateLimitResult::Allowed(RateLimitStatus {
            limit,
            remaining: limit - window.hits,
            reset_at: Timestamp::from_unix_secs(closes_at).unwrap_or_else(Timestamp::now),
            window_secs,
        })
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError> {
        Ok(self.check_at(key, Timestamp::now().as_unix_secs()).await)
    }
}
