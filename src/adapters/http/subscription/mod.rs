//! HTTP adapter for the site-wide trial and subscription gate.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::subscription_routes;
