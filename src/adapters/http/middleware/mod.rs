//! HTTP middleware for axum.
//!
//! - `auth` - Caller identity extractors
//! - `rate_limit` - Per-user action throttling

pub mod auth;
pub mod rate_limit;

pub use auth::{AuthRejection, CallerIdentity, RequireAdmin, RequireAuth};
pub use rate_limit::{RateLimitCheck, RateLimitRejection};
