//! Axum router configuration for center endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::super::state::AppState;
use super::handlers::{create_center, delete_center, list_centers, set_center_lock};

/// Center routes.
///
/// # Routes
/// - `GET /courses/:id/centers` - Availability per center (any user)
/// - `POST /admin/centers` - Create a center (admin)
/// - `POST /admin/centers/:id/lock` - Set the manual lock (admin)
/// - `DELETE /admin/centers/:id` - Delete an unused center (admin)
pub fn capacity_routes() -> Router<AppState> {
    Router::new()
        .route("/courses/:id/centers", get(list_centers))
        .route("/admin/centers", post(create_center))
        .route("/admin/centers/:id/lock", post(set_center_lock))
        .route("/admin/centers/:id", delete(delete_center))
}
