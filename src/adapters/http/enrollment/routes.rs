//! Axum router configuration for enrollment endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::super::state::AppState;
use super::handlers::{
    claim_seat, eject_enrollment, enroll_in_course, get_enrollment, initiate_payment,
    override_center, payment_status, record_manual_payment, unlock_enrollment,
};

/// Student enrollment routes.
///
/// # Routes
/// - `POST /enrollments/claim` - Reserve a seat (rate limited)
/// - `POST /enrollments/course` - Buy a course without centers
/// - `POST /enrollment/pay` - Start or restart payment
/// - `GET /enrollment/status?paymentId=` - Poll a payment
/// - `GET /enrollments/:id` - Enrollment details
pub fn enrollment_routes() -> Router<AppState> {
    Router::new()
        .route("/enrollments/claim", post(claim_seat))
        .route("/enrollments/course", post(enroll_in_course))
        .route("/enrollments/:id", get(get_enrollment))
        .route("/enrollment/pay", post(initiate_payment))
        .route("/enrollment/status", get(payment_status))
}

/// Admin enrollment routes, all requiring the admin role.
///
/// # Routes
/// - `POST /admin/enrollments/:id/unlock`
/// - `POST /admin/enrollments/:id/eject`
/// - `POST /admin/enrollments/:id/override`
/// - `POST /admin/enrollments/:id/manual-payment`
pub fn admin_enrollment_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/enrollments/:id/unlock", post(unlock_enrollment))
        .route("/admin/enrollments/:id/eject", post(eject_enrollment))
        .route("/admin/enrollments/:id/override", post(override_center))
        .route("/admin/enrollments/:id/manual-payment", post(record_manual_payment))
}
