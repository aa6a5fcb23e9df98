//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Repository implementations over sqlx
//! - `memory` - In-process store for tests and local development
//! - `payment_gateway` - Mobile-money collection API client
//! - `notifications` - Notification delivery
//! - `rate_limiter` - In-memory and Redis rate limiters
//! - `http` - Axum routes, DTOs and error mapping

pub mod http;
pub mod memory;
pub mod notifications;
pub mod payment_gateway;
pub mod postgres;
pub mod rate_limiter;

pub use memory::InMemoryStore;
pub use notifications::{RecordingNotifier, TracingNotifier};
pub use payment_gateway::{GatewayConfig, MobileMoneyGateway, MockPaymentGateway};
