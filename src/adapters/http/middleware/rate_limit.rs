//! Per-user throttling of seat claims and admin mutations.
//!
//! Handlers call [`RateLimitCheck::check_action`] after extracting the
//! caller. A denial becomes a 429 with `Retry-After`; an unreachable limiter
//! fails open so an outage of Redis never blocks enrollment.

use std::sync::Arc;

use crate::domain::foundation::{ErrorCode, UserId};
use crate::ports::{RateLimitKey, RateLimitResult, RateLimitStatus, RateLimitedAction, RateLimiter};

use super::super::error::ApiError;

/// Handler-side rate limit check.
#[derive(Clone)]
pub struct RateLimitCheck {
    limiter: Arc<dyn RateLimiter>,
}

impl RateLimitCheck {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self { limiter }
    }

    /// Counts one `action` against `user_id`.
    ///
    /// Returns the window status when the limiter answered, `None` when it
    /// was unavailable.
    pub async fn check_action(
        &self,
        user_id: &UserId,
        action: RateLimitedAction,
    ) -> Result<Option<RateLimitStatus>, RateLimitRejection> {
        let key = RateLimitKey::user_action(user_id, action);
        match self.limiter.check(key).await {
            Ok(RateLimitResult::Allowed(status)) => Ok(Some(status)),
            Ok(RateLimitResult::Denied(denied)) => {
                tracing::info!(
                    user_id = %user_id,
                    action = %denied.action,
                    retry_after_secs = denied.retry_after_secs,
                    "rate limit exceeded"
                );
                Err(RateLimitRejection {
                    limit: denied.limit,
                    retry_after_secs: denied.retry_after_secs,
                    message: denied.message,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, action = %action, "rate limiter unavailable, allowing request");
                Ok(None)
            }
        }
    }
}

/// A denied rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRejection {
    pub limit: u32,
    pub retry_after_secs: u32,
    pub message: String,
}

impl From<RateLimitRejection> for ApiError {
    fn from(rejection: RateLimitRejection) -> Self {
        let mut err = ApiError::new(ErrorCode::RateLimited, rejection.message).with_details(
            serde_json::json!({
                "limit": rejection.limit,
                "retry_after_secs": rejection.retry_after_secs,
            }),
        );
        err.retry_after_secs = Some(u64::from(rejection.retry_after_secs));
        err
    }
}
