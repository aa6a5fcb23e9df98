//! HTTP adapter for the capacity ledger: center listing and administration.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::capacity_routes;
