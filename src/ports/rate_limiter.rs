//! Throttling for seat claims and admin mutations.
//!
//! One fixed window per (user, action). The HTTP layer asks before running
//! the handler and fails open when the backend is down.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, UserId};

/// Fixed-window counter per [`RateLimitKey`].
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Counts one attempt and says whether it may proceed.
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError>;
}

/// Throttled action.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitedAction {
    /// Student seat claims.
    ClaimSeat,
    /// Administrative mutations (lock, unlock, eject, override, ...).
    AdminAction,
}

impl RateLimitedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitedAction::ClaimSeat => "claim_seat",
            RateLimitedAction::AdminAction => "admin_action",
        }
    }
}

impl fmt::Display for RateLimitedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One caller performing one action.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RateLimitKey {
    pub identifier: String,
    pub action: RateLimitedAction,
}

impl RateLimitKey {
    /// Creates a per-user key for an action.
    pub fn user_action(user_id: &UserId, action: RateLimitedAction) -> Self {
        Self {
            identifier: user_id.to_string(),
            action,
        }
    }

    /// Key under which a shared backend keeps the counter.
    pub fn storage_key(&self) -> String {
        format!("center-enrollment:ratelimit:{}:{}", self.action.as_str(), self.identifier)
    }
}

#[derive(Debug, Clone)]
pub enum RateLimitResult {
    Allowed(RateLimitStatus),
    Denied(RateLimitDenied),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }
}

/// Quota left after an allowed attempt.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: Timestamp,
    pub window_secs: u32,
}

/// Why an attempt was refused.
#[derive(Debug, Clone)]
pub struct RateLimitDenied {
    pub limit: u32,
    /// Always at least one second.
    pub retry_after_secs: u32,
    pub action: RateLimitedAction,
    pub message: String,
}

impl RateLimitDenied {
    pub fn new(action: RateLimitedAction, limit: u32, retry_after_secs: u32) -> Self {
        let retry_after_secs = retry_after_secs.max(1);
        Self {
            limit,
            retry_after_secs,
            action,
            message: format!(
                "Too many {} requests, try again in {} seconds",
                action, retry_after_secs
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),
}
