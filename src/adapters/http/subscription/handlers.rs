//! HTTP handlers for the subscription gate.

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::{
    CheckSubscriptionQuery, InitiateSubscriptionPaymentCommand, StartTrialCommand,
};

use super::super::error::ApiError;
use super::super::middleware::RequireAuth;
use super::super::state::AppState;
use super::dto::{
    AccessStatusResponse, StartTrialResponse, SubscriptionPaymentRequest,
    SubscriptionPaymentResponse,
};

/// POST /auth/init-trial - Start the one-time trial after sign-in
pub async fn init_trial(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = StartTrialCommand {
        user_id: caller.user_id,
        role: caller.role,
        email: caller.email,
    };
    let result = state.start_trial_handler().handle(cmd).await?;

    Ok(Json(StartTrialResponse::from(result)))
}

/// GET /subscription/check - Whether the caller must pay to continue
pub async fn check_subscription(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .check_subscription_handler()
        .handle(CheckSubscriptionQuery {
            user_id: caller.user_id,
        })
        .await?;

    Ok(Json(AccessStatusResponse::from(status)))
}

/// POST /subscription/payments - Start a monthly subscription payment
pub async fn initiate_subscription_payment(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    request: Option<Json<SubscriptionPaymentRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let cmd = InitiateSubscriptionPaymentCommand {
        user_id: caller.user_id,
        phone_number: request.phone_number,
    };
    let result = state.subscription_payment_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(SubscriptionPaymentResponse::from(result))))
}
