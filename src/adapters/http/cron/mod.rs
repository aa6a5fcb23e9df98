//! HTTP adapter for the scheduled billing sweep.
//!
//! An external scheduler calls `POST /cron/billing-check` with the shared
//! secret in `X-Cron-Secret`.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use secrecy::ExposeSecret;
use subtle::ConstantTimeEq;

use crate::application::handlers::{BillingSweepResult, RunBillingSweepCommand};

use super::error::ApiError;
use super::state::AppState;

pub const CRON_SECRET_HEADER: &str = "X-Cron-Secret";

/// `POST /cron/billing-check`.
pub fn cron_routes() -> Router<AppState> {
    Router::new().route("/cron/billing-check", post(billing_check))
}

/// POST /cron/billing-check - Warn and eject overdue seat holders, warn
/// expiring subscribers
pub async fn billing_check(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BillingSweepResult>, ApiError> {
    let provided = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !secret_matches(provided, state.cron_secret.expose_secret()) {
        tracing::warn!("Billing check called without a valid cron secret");
        return Err(ApiError::unauthorized("Invalid cron secret"));
    }

    let result = state
        .billing_sweep_handler()
        .handle(RunBillingSweepCommand::default())
        .await?;

    Ok(Json(result))
}

fn secret_matches(provided: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}
