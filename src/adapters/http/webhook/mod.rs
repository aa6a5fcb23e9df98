//! HTTP adapter for gateway payment notifications.

pub mod handlers;

use axum::{routing::post, Router};

use super::state::AppState;

/// `POST /webhook/payment`. No caller identity; authenticated by signature.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook/payment", post(handlers::payment_webhook))
}
