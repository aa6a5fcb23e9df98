//! Rate limiter adapters.
//!
//! `RedisRateLimiter` when `CENTER_ENROLLMENT__REDIS__URL` is set, otherwise
//! `InMemoryRateLimiter` (per process).

mod config;
mod in_memory;
mod redis;

pub use config::{ActionLimits, RateLimitConfig};
pub use in_memory::InMemoryRateLimiter;
pub use redis::RedisRateLimiter;
