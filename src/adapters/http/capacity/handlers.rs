//! HTTP handlers for center endpoints.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::{
    CreateCenterCommand, DeleteCenterCommand, ListCentersQuery, SetCenterLockCommand,
};
use crate::domain::foundation::{CenterId, CourseId};
use crate::ports::RateLimitedAction;

use super::super::error::ApiError;
use super::super::middleware::{RequireAdmin, RequireAuth};
use super::super::state::AppState;
use super::dto::{CenterResponse, CourseCentersResponse, CreateCenterRequest, SetLockRequest};

/// GET /courses/:id/centers - Centers of a course with remaining spots
pub async fn list_centers(
    State(state): State<AppState>,
    RequireAuth(_caller): RequireAuth,
    Path(course_id): Path<CourseId>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .list_centers_handler()
        .handle(ListCentersQuery { course_id })
        .await?;

    Ok(Json(CourseCentersResponse::from(result)))
}

/// POST /admin/centers - Add a center to a course
pub async fn create_center(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<CreateCenterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .rate_limit()
        .check_action(&admin.user_id, RateLimitedAction::AdminAction)
        .await?;

    let cmd = CreateCenterCommand {
        course_id: request.course_id,
        name: request.name,
        capacity: request.capacity,
        owner_contact: request.owner_contact,
        enrollment_deadline: request.enrollment_deadline,
    };
    let center = state.create_center_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(CenterResponse::from(center))))
}

/// POST /admin/centers/:id/lock - Lock or unlock a center by hand
pub async fn set_center_lock(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(center_id): Path<CenterId>,
    Json(request): Json<SetLockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .rate_limit()
        .check_action(&admin.user_id, RateLimitedAction::AdminAction)
        .await?;

    let cmd = SetCenterLockCommand {
        center_id,
        locked: request.locked,
    };
    let center = state.set_center_lock_handler().handle(cmd).await?;

    Ok(Json(CenterResponse::from(center)))
}

/// DELETE /admin/centers/:id - Remove a center that holds no seats
pub async fn delete_center(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(center_id): Path<CenterId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .rate_limit()
        .check_action(&admin.user_id, RateLimitedAction::AdminAction)
        .await?;

    state
        .delete_center_handler()
        .handle(DeleteCenterCommand { center_id })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
