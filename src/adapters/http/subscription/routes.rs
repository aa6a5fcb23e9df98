//! Axum router configuration for the subscription gate.

use axum::{
    routing::{get, post},
    Router,
};

use super::super::state::AppState;
use super::handlers::{check_subscription, init_trial, initiate_subscription_payment};

/// Subscription routes.
///
/// # Routes
/// - `POST /auth/init-trial` - Start the trial once
/// - `GET /subscription/check` - Access status
/// - `POST /subscription/payments` - Pay the monthly fee
pub fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/init-trial", post(init_trial))
        .route("/subscription/check", get(check_subscription))
        .route("/subscription/payments", post(initiate_subscription_payment))
}
