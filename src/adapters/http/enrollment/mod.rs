//! HTTP adapter for seat claims, course purchases and admin enrollment actions.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::{admin_enrollment_routes, enrollment_routes};
