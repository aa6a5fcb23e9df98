//! Redis fixed windows shared by every replica.
//!
//! `INCR` and `TTL` run in one atomic pipeline; the expiry is set whenever
//! the key has none, which also heals a key left without TTL by a crash
//! between the two calls.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

use super::config::RateLimitConfig;

#[derive(Clone)]
pub struct RedisRateLimiter {
    conn: MultiplexedConnection,
    config: RateLimitConfig,
}

impl std::fmt::Debug for RedisRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisRateLimiter {
    pub fn new(conn: MultiplexedConnection, config: RateLimitConfig) -> Self {
        Self { conn, config }
    }
}

fn unavailable(e: redis::RedisError) -> RateLimitError {
    RateLimitError::Unavailable(e.to_string())
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError> {
        let (limit, window_secs) = self.config.limits_for(key.action);
        let storage_key = key.storage_key();
        let mut conn = self.conn.clone();

        let (hits, ttl): (u64, i64) = redis::pipe()
            .atomic()
            .incr(&storage_key, 1_u64)
            .ttl(&storage_key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        let seconds_left = if ttl > 0 {
            ttl
        } else {
            conn.expire::<_, ()>(&storage_key, i64::from(window_secs))
                .await
                .map_err(unavailable)?;
            i64::from(window_secs)
        };
        let seconds_left = u32::try_from(seconds_left).unwrap_or(window_secs);

        if hits > u64::from(limit) {
            return Ok(RateLimitResult::Denied(RateLimitDenied::new(
                key.action,
                limit,
                seconds_left,
            )));
        }

        Ok(RateLimitResult::Allowed(RateLimitStatus {
            limit,
            remaining: limit.saturating_sub(hits as u32),
            reset_at: Timestamp::now().plus_secs(i64::from(seconds_left)),
            window_secs,
        }))
    }
}
