//! Integration tests for the HTTP API.
//!
//! Drives the complete router with `tower::ServiceExt::oneshot` against the
//! in-memory store, the mock gateway and real RSA-signed webhooks.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::{crypto, Algorithm, EncodingKey};
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use center_enrollment::adapters::http::{router, AppState, HttpSettings};
use center_enrollment::adapters::rate_limiter::{InMemoryRateLimiter, RateLimitConfig};
use center_enrollment::adapters::{InMemoryStore, MockPaymentGateway, RecordingNotifier};
use center_enrollment::domain::billing::BillingPolicy;
use center_enrollment::domain::capacity::Center;
use center_enrollment::domain::foundation::{CenterId, CourseId, Timestamp};
use center_enrollment::domain::payment::WebhookSignatureVerifier;
use center_enrollment::domain::subscription::SubscriptionPolicy;
use center_enrollment::ports::{CenterRepository, CourseSummary, NotificationKind};

// =============================================================================
// Test Infrastructure
// =============================================================================

const PRIVATE_KEY: &str = include_str!("fixtures/gateway_test_private.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/gateway_test_public.pem");
const CALLBACK: &str = "https://lms.example.com/webhook/payment";
const CRON_SECRET: &str = "cron-secret-for-tests-0123";

struct TestApp {
    app: Router,
    store: InMemoryStore,
    gateway: MockPaymentGateway,
    notifier: RecordingNotifier,
    course: CourseSummary,
    center: Center,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_limits(RateLimitConfig::new(10, 20, 60)).await
    }

    async fn with_limits(limits: RateLimitConfig) -> Self {
        let store = InMemoryStore::new();
        let course = CourseSummary {
            id: CourseId::new(),
            title: "Phone Repair".to_string(),
            slug: "phone-repair".to_string(),
            price: 5000,
            center_based: true,
        };
        store.insert_course(course.clone()).await;
        let center = Center::create(
            CenterId::new(),
            course.id,
            "Mvog-Mbi",
            2,
            "237690000000",
            None,
            Timestamp::now(),
        )
        .unwrap();
        CenterRepository::insert(&store, &center).await.unwrap();

        let gateway = MockPaymentGateway::new();
        let notifier = RecordingNotifier::new();
        let shared = Arc::new(store.clone());

        let state = AppState {
            centers: shared.clone(),
            enrollments: shared.clone(),
            courses: shared.clone(),
            subscriptions: shared.clone(),
            payment_events: shared,
            gateway: Arc::new(gateway.clone()),
            notifier: Arc::new(notifier.clone()),
            rate_limiter: Arc::new(InMemoryRateLimiter::new(limits)),
            signature_verifier: Arc::new(WebhookSignatureVerifier::new(PUBLIC_KEY, CALLBACK).unwrap()),
            cron_secret: Arc::new(SecretString::new(CRON_SECRET.to_string())),
            billing: BillingPolicy::default(),
            subscription: SubscriptionPolicy::default(),
        };

        Self {
            app: router(state, &HttpSettings::default()),
            store,
            gateway,
            notifier,
            course,
            center,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn claim(&self, user: &str) -> (StatusCode, Value) {
        let body = json!({ "courseId": self.course.id, "centerId": self.center.id });
        self.send(as_user(post("/enrollments/claim", &body), user, "student")).await
    }
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn as_user(mut request: Request<Body>, user: &str, role: &str) -> Request<Body> {
    let headers = request.headers_mut();
    headers.insert("X-User-Id", user.parse().unwrap());
    headers.insert("X-User-Role", role.parse().unwrap());
    request
}

fn sign(timestamp: &str, body: &[u8]) -> String {
    let mut message = Vec::new();
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(CALLBACK.as_bytes());
    message.extend_from_slice(body);
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap();
    let url_safe = crypto::sign(&message, &key, Algorithm::RS256).unwrap();
    STANDARD.encode(URL_SAFE_NO_PAD.decode(url_safe).unwrap())
}

fn webhook(body: &Value, signature: Option<String>) -> Request<Body> {
    let raw = body.to_string();
    let timestamp = "1760000000";
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook/payment")
        .header("content-type", "application/json")
        .header("X-Timestamp", timestamp);
    let signature = signature.unwrap_or_else(|| sign(timestamp, raw.as_bytes()));
    builder = builder.header("X-Signature", signature);
    builder.body(Body::from(raw)).unwrap()
}

// =============================================================================
// Health and identity
// =============================================================================

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn claim_without_identity_is_unauthorized() {
    let app = TestApp::new().await;
    let body = json!({ "courseId": app.course.id, "centerId": app.center.id });

    let (status, body) = app.send(post("/enrollments/claim", &body)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn admin_routes_reject_students() {
    let app = TestApp::new().await;
    let body = json!({ "locked": true });
    let uri = format!("/admin/centers/{}/lock", app.center.id);

    let (status, _) = app.send(as_user(post(&uri, &body), "sam", "student")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

// =============================================================================
// Capacity
// =============================================================================

#[tokio::test]
async fn claim_is_created_once_and_shows_in_availability() {
    let app = TestApp::new().await;

    let (first, body) = app.claim("alice").await;
    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(body["alreadyClaimed"], false);
    assert_eq!(body["enrollment"]["status"], "pending");

    let (second, body) = app.claim("alice").await;
    assert_eq!(second, StatusCode::OK);
    assert_eq!(body["alreadyClaimed"], true);

    let uri = format!("/courses/{}/centers", app.course.id);
    let (status, body) = app.send(as_user(get(&uri), "bob", "student")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["centers"][0]["spotsRemaining"], 1);
    assert_eq!(body["courseLocked"], false);
}

#[tokio::test]
async fn locked_center_answers_conflict() {
    let app = TestApp::new().await;
    let uri = format!("/admin/centers/{}/lock", app.center.id);
    let (status, _) = app
        .send(as_user(post(&uri, &json!({ "locked": true })), "root", "admin"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.claim("carl").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "CENTER_LOCKED");
}

#[tokio::test]
async fn claims_are_rate_limited_per_user() {
    let app = TestApp::with_limits(RateLimitConfig::new(1, 20, 60)).await;

    let (first, _) = app.claim("dina").await;
    let (second, body) = app.claim("dina").await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error_code"], "RATE_LIMITED");
}

// =============================================================================
// Payment webhook
// =============================================================================

#[tokio::test]
async fn signed_success_activates_the_enrollment() {
    let app = TestApp::new().await;
    let (_, claimed) = app.claim("erin").await;
    let enrollment_id = claimed["enrollment"]["id"].clone();

    app.gateway.queue_payment_id("pay_http_1");
    let (status, started) = app
        .send(as_user(
            post(
                "/enrollment/pay",
                &json!({ "enrollmentId": enrollment_id, "phoneNumber": "237670000001" }),
            ),
            "erin",
            "student",
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let reference = started["reference"].as_str().unwrap().to_string();

    let notification = json!({
        "id": "pay_http_1",
        "status": "success",
        "reference": reference,
        "amount": 5000,
    });
    let (status, ack) = app.send(webhook(&notification, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "applied");
    assert_eq!(ack["kind"], "activated");

    let (status, replay) = app.send(webhook(&notification, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["outcome"], "already_processed");

    let (status, body) = app
        .send(as_user(get("/enrollment/status?paymentId=pay_http_1"), "erin", "student"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(app.notifier.count_of(NotificationKind::Receipt), 1);
}

#[tokio::test]
async fn tampered_webhook_is_forbidden() {
    let app = TestApp::new().await;
    let notification = json!({ "id": "pay_x", "status": "success" });
    let forged = sign("1760000000", br#"{"id":"pay_x","status":"failed"}"#);

    let (status, body) = app.send(webhook(&notification, Some(forged))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "SIGNATURE_INVALID");
    assert!(app.store.payment_events().await.is_empty());
}

#[tokio::test]
async fn unsigned_webhook_is_bad_request() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method("POST")
        .uri("/webhook/payment")
        .body(Body::from(r#"{"id":"pay_y","status":"success"}"#))
        .unwrap();

    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_payment_is_acknowledged_and_logged() {
    let app = TestApp::new().await;
    let notification = json!({ "id": "pay_nobody", "status": "success" });

    let (status, ack) = app.send(webhook(&notification, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "ignored");
    assert_eq!(app.store.payment_events().await.len(), 1);
}

// =============================================================================
// Cron and subscription
// =============================================================================

#[tokio::test]
async fn billing_check_requires_the_cron_secret() {
    let app = TestApp::new().await;

    let (status, _) = app.send(post("/cron/billing-check", &json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = post("/cron/billing-check", &json!({}));
    request
        .headers_mut()
        .insert("X-Cron-Secret", CRON_SECRET.parse().unwrap());
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seat"]["ejected"], 0);
}

#[tokio::test]
async fn trial_starts_once_and_grants_access() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(as_user(post("/auth/init-trial", &json!({})), "gina", "student"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "trial_started");
    assert_eq!(body["access"]["trialActive"], true);
    assert_eq!(body["access"]["needsToPay"], false);

    let (_, again) = app
        .send(as_user(post("/auth/init-trial", &json!({})), "gina", "student"))
        .await;
    assert_eq!(again["outcome"], "trial_already_started");

    let (status, check) = app.send(as_user(get("/subscription/check"), "gina", "student")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["trialDaysRemaining"], 7);
}

#[tokio::test]
async fn admins_skip_the_trial() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(as_user(post("/auth/init-trial", &json!({})), "hal", "admin"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "skipped_admin");
    assert_eq!(body["access"]["isExcluded"], true);
}
