//! Payment gateway adapters.
//!
//! - `MobileMoneyGateway` - HTTP client for the mobile-money collection API
//! - `MockPaymentGateway` - Configurable mock for tests

mod mobile_money;
mod mock;

pub use mobile_money::{GatewayConfig, MobileMoneyGateway};
pub use mock::MockPaymentGateway;
