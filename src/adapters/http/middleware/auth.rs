//! Caller identity extractors for axum.
//!
//! Authentication happens upstream; the gateway in front of this service
//! forwards the verified identity in headers:
//!
//! ```text
//! X-User-Id:    <opaque user id>     (required)
//! X-User-Role:  <role name>          (optional)
//! X-User-Email: <address>            (optional)
//! ```
//!
//! - `RequireAuth` - rejects with 401 when no user id is present
//! - `RequireAdmin` - additionally requires the `admin` role, else 403
//!
//! # Example
//!
//! ```ignore
//! async fn my_handler(RequireAuth(caller): RequireAuth) -> impl IntoResponse {
//!     format!("Hello, {}!", caller.user_id)
//! }
//! ```

use axum::{
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::UserId;

use super::super::error::ErrorResponse;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";
pub const USER_EMAIL_HEADER: &str = "X-User-Email";

const ADMIN_ROLE: &str = "admin";

/// Identity forwarded by the upstream authenticator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: UserId,
    pub role: Option<String>,
    pub email: Option<String>,
}

impl CallerIdentity {
    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .map(|r| r.trim().eq_ignore_ascii_case(ADMIN_ROLE))
            .unwrap_or(false)
    }

    fn from_parts(parts: &Parts) -> Result<Self, AuthRejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let user_id = header(USER_ID_HEADER)
            .and_then(|id| UserId::new(id).ok())
            .ok_or(AuthRejection::Unauthenticated)?;

        Ok(Self {
            user_id,
            role: header(USER_ROLE_HEADER),
            email: header(USER_EMAIL_HEADER),
        })
    }
}

/// Extractor that requires an authenticated caller.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub CallerIdentity);

impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move { CallerIdentity::from_parts(parts).map(RequireAuth) })
    }
}

/// Extractor that requires an authenticated caller with the admin role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CallerIdentity);

impl<S> axum::extract::FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let caller = CallerIdentity::from_parts(parts)?;
            if !caller.is_admin() {
                tracing::warn!(user_id = %caller.user_id, "admin route denied");
                return Err(AuthRejection::Forbidden);
            }
            Ok(RequireAdmin(caller))
        })
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No caller identity was forwarded.
    Unauthenticated,
    /// The caller lacks the required role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthRejection::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required",
            ),
            AuthRejection::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Administrator role required",
            ),
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
