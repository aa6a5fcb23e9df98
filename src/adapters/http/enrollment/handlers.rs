//! HTTP handlers for enrollment endpoints.

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::{
    ClaimSeatCommand, EjectEnrollmentCommand, EnrollInCourseCommand, GetEnrollmentQuery,
    GetPaymentStatusQuery, InitiatePaymentCommand, OverrideCenterCommand,
    RecordManualPaymentCommand, UnlockEnrollmentCommand,
};
use crate::domain::foundation::EnrollmentId;
use crate::ports::RateLimitedAction;

use super::super::error::ApiError;
use super::super::middleware::{RequireAdmin, RequireAuth};
use super::super::state::AppState;
use super::dto::{
    ClaimSeatRequest, ClaimSeatResponse, EnrollInCourseRequest, EnrollmentDetailResponse,
    EnrollmentResponse, InitiatePaymentRequest, ManualPaymentRequest, ManualPaymentResponse,
    OverrideCenterRequest, PaymentStartedResponse, PaymentStatusParams, PaymentStatusResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Student endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /enrollments/claim - Reserve a seat at a center
pub async fn claim_seat(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<ClaimSeatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .rate_limit()
        .check_action(&caller.user_id, RateLimitedAction::ClaimSeat)
        .await?;

    let cmd = ClaimSeatCommand {
        user_id: caller.user_id,
        course_id: request.course_id,
        center_id: request.center_id,
    };
    let result = state.claim_seat_handler().handle(cmd).await?;

    let status = if result.already_claimed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(ClaimSeatResponse::from(result))))
}

/// POST /enrollments/course - Buy a course that has no centers
pub async fn enroll_in_course(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<EnrollInCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = EnrollInCourseCommand {
        user_id: caller.user_id,
        course_id: request.course_id,
        phone_number: request.phone_number,
    };
    let result = state.enroll_in_course_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(PaymentStartedResponse::from(result))))
}

/// POST /enrollment/pay - Start or restart payment for an enrollment
pub async fn initiate_payment(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = InitiatePaymentCommand {
        enrollment_id: request.enrollment_id,
        user_id: caller.user_id,
        phone_number: request.phone_number,
    };
    let result = state.initiate_payment_handler().handle(cmd).await?;

    Ok(Json(PaymentStartedResponse::from(result)))
}

/// GET /enrollment/status?paymentId= - Poll the outcome of a payment
pub async fn payment_status(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Query(params): Query<PaymentStatusParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = GetPaymentStatusQuery {
        payment_id: params.payment_id,
        user_id: caller.user_id,
    };
    let view = state.payment_status_handler().handle(query).await?;

    Ok(Json(PaymentStatusResponse::from(view)))
}

/// GET /enrollments/:id - Enrollment details for its owner
pub async fn get_enrollment(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(enrollment_id): Path<EnrollmentId>,
) -> Result<impl IntoResponse, ApiError> {
    let query = GetEnrollmentQuery {
        enrollment_id,
        user_id: caller.user_id,
    };
    let view = state.get_enrollment_handler().handle(query).await?;

    Ok(Json(EnrollmentDetailResponse::from(view)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /admin/enrollments/:id/unlock - Reinstate an ejected enrollment
pub async fn unlock_enrollment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(enrollment_id): Path<EnrollmentId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .rate_limit()
        .check_action(&admin.user_id, RateLimitedAction::AdminAction)
        .await?;

    let enrollment = state
        .unlock_enrollment_handler()
        .handle(UnlockEnrollmentCommand { enrollment_id })
        .await?;

    tracing::info!(admin = %admin.user_id, enrollment_id = %enrollment_id, "enrollment unlocked");
    Ok(Json(EnrollmentResponse::from(enrollment)))
}

/// POST /admin/enrollments/:id/eject - Free an Active seat immediately
pub async fn eject_enrollment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(enrollment_id): Path<EnrollmentId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .rate_limit()
        .check_action(&admin.user_id, RateLimitedAction::AdminAction)
        .await?;

    let enrollment = state
        .eject_enrollment_handler()
        .handle(EjectEnrollmentCommand { enrollment_id })
        .await?;

    tracing::info!(admin = %admin.user_id, enrollment_id = %enrollment_id, "enrollment ejected by admin");
    Ok(Json(EnrollmentResponse::from(enrollment)))
}

/// POST /admin/enrollments/:id/override - Move an enrollment to another center
pub async fn override_center(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(enrollment_id): Path<EnrollmentId>,
    Json(request): Json<OverrideCenterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .rate_limit()
        .check_action(&admin.user_id, RateLimitedAction::AdminAction)
        .await?;

    let cmd = OverrideCenterCommand {
        enrollment_id,
        target_center_id: request.center_id,
    };
    let enrollment = state.override_center_handler().handle(cmd).await?;

    tracing::info!(
        admin = %admin.user_id,
        enrollment_id = %enrollment_id,
        center_id = %request.center_id,
        "enrollment moved"
    );
    Ok(Json(EnrollmentResponse::from(enrollment)))
}

/// POST /admin/enrollments/:id/manual-payment - Record a cash or bank payment
pub async fn record_manual_payment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(enrollment_id): Path<EnrollmentId>,
    Json(request): Json<ManualPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .rate_limit()
        .check_action(&admin.user_id, RateLimitedAction::AdminAction)
        .await?;

    let cmd = RecordManualPaymentCommand {
        enrollment_id,
        amount: request.amount,
    };
    let result = state.record_manual_payment_handler().handle(cmd).await?;

    tracing::info!(
        admin = %admin.user_id,
        enrollment_id = %enrollment_id,
        payment_id = %result.payment_id,
        "manual payment recorded"
    );
    Ok(Json(ManualPaymentResponse::from(result)))
}
