//! Capacity ledger handlers.
//!
//! ## Commands
//! - Creating centers for a center-backed course
//! - Locking and unlocking a center by hand
//! - Deleting centers that no longer hold seats
//!
//! ## Queries
//! - Listing a course's centers with their availability

mod create_center;
mod delete_center;
mod list_centers;
mod set_center_lock;

// Commands
pub use create_center::{CreateCenterCommand, CreateCenterHandler};
pub use delete_center::{DeleteCenterCommand, DeleteCenterHandler};
pub use set_center_lock::{SetCenterLockCommand, SetCenterLockHandler};

// Queries
pub use list_centers::{CenterAvailability, ListCentersHandler, ListCentersQuery, ListCentersResult};
