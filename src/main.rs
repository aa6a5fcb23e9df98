//! Center Enrollment server entry point.
//!
//! Loads configuration, connects PostgreSQL (and Redis when configured),
//! wires the adapters into `AppState` and serves the HTTP API.

use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use center_enrollment::adapters::http::{self, AppState, HttpSettings};
use center_enrollment::adapters::postgres::{
    PostgresCenterRepository, PostgresCourseReader, PostgresEnrollmentRepository,
    PostgresPaymentEventLog, PostgresSubscriptionRepository,
};
use center_enrollment::adapters::rate_limiter::{InMemoryRateLimiter, RedisRateLimiter};
use center_enrollment::adapters::{MobileMoneyGateway, TracingNotifier};
use center_enrollment::config::AppConfig;
use center_enrollment::domain::payment::WebhookSignatureVerifier;
use center_enrollment::ports::RateLimiter;

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let addr = config.server.socket_addr()?;
    tracing::info!(
        environment = ?config.server.environment,
        currency = %config.payment.currency,
        "Starting center-enrollment"
    );

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations applied");
    }

    let limiter_config = config.rate_limit.limiter_config();
    let rate_limiter: Arc<dyn RateLimiter> = match &config.redis {
        Some(redis_config) => {
            let client = redis::Client::open(redis_config.url.as_str())?;
            let conn = client.get_multiplexed_async_connection().await?;
            tracing::info!("Rate limiting backed by Redis");
            Arc::new(RedisRateLimiter::new(conn, limiter_config))
        }
        None => {
            tracing::warn!("No Redis configured; rate limits are per process");
            Arc::new(InMemoryRateLimiter::new(limiter_config))
        }
    };

    let verifier = WebhookSignatureVerifier::new(
        &config.payment.webhook_public_key,
        config.payment.callback_url.clone(),
    )?;
    let gateway = MobileMoneyGateway::new(config.payment.gateway_config())?;

    let state = AppState {
        centers: Arc::new(PostgresCenterRepository::new(pool.clone())),
        enrollments: Arc::new(PostgresEnrollmentRepository::new(pool.clone())),
        courses: Arc::new(PostgresCourseReader::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        payment_events: Arc::new(PostgresPaymentEventLog::new(pool)),
        gateway: Arc::new(gateway),
        notifier: Arc::new(TracingNotifier::new()),
        rate_limiter,
        signature_verifier: Arc::new(verifier),
        cron_secret: Arc::new(config.billing.cron_secret.clone()),
        billing: config.billing.billing_policy()?,
        subscription: config.billing.subscription_policy()?,
    };

    let settings = HttpSettings {
        request_timeout: config.server.request_timeout(),
        cors_origins: config.server.cors_origins_list(),
    };
    let app = http::router(state, &settings);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
