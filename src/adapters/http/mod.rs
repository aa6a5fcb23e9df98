//! HTTP adapters - REST API implementations.
//!
//! Each area has its own module with `dto`, `handlers` and `routes`:
//!
//! - `capacity` - Center listing and administration
//! - `enrollment` - Seat claims, course purchases, admin enrollment actions
//! - `subscription` - Trial and monthly platform fee
//! - `webhook` - Signed gateway notifications
//! - `cron` - Scheduled billing sweep

pub mod capacity;
pub mod cron;
pub mod enrollment;
pub mod error;
pub mod middleware;
pub mod state;
pub mod subscription;
pub mod webhook;

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Cross-cutting HTTP settings applied as tower layers.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    /// Allowed browser origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
        }
    }
}

/// All routes, without cross-cutting layers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(capacity::capacity_routes())
        .merge(enrollment::enrollment_routes())
        .merge(enrollment::admin_enrollment_routes())
        .merge(subscription::subscription_routes())
        .merge(webhook::webhook_routes())
        .merge(cron::cron_routes())
}

/// The complete application with tracing, request ids, CORS, compression
/// and timeouts.
pub fn router(state: AppState, settings: &HttpSettings) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    routes()
        .with_state(state)
        .layer(TimeoutLayer::new(settings.request_timeout))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&settings.cors_origins))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(tower_http::cors::Any);

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        layer.allow_origin(AllowOrigin::any())
    } else {
        layer.allow_origin(parsed)
    }
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
