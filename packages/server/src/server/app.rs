//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::get,
    Router,
};
use sqlx::PgPool;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::domains::auth::JwtService;
use crate::domains::notifications::register_notification_jobs;
use crate::domains::{auth, bookings, listings, messages, payments, reviews, users};
use crate::kernel::jobs::{JobQueue, JobRegistry, JobRunner, PostgresJobQueue, SharedJobRegistry};
use crate::kernel::{create_email_service, ChapaClient, ServerDeps};
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{docs_handler, health_handler, schema_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub server_deps: Arc<ServerDeps>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(server_deps: Arc<ServerDeps>, jwt_service: Arc<JwtService>) -> Self {
        Self {
            db_pool: server_deps.db_pool.clone(),
            server_deps,
            jwt_service,
        }
    }
}

/// Router-level switches.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub rate_limit_enabled: bool,
}

impl From<&Config> for AppOptions {
    fn from(config: &Config) -> Self {
        Self {
            allowed_origins: config.allowed_origins.clone(),
            rate_limit_enabled: config.rate_limit_enabled,
        }
    }
}

/// Wire the production email transport, payment gateway and job queue.
pub fn build_server_deps(config: &Config, pool: PgPool) -> Result<ServerDeps> {
    let email = create_email_service(&config.email).context("Failed to create email service")?;
    let payments = Arc::new(
        ChapaClient::new(&config.chapa_base_url, &config.chapa_secret_key)
            .context("Failed to create Chapa client")?,
    );
    let job_queue: Arc<dyn JobQueue> = Arc::new(PostgresJobQueue::new(pool.clone()));

    Ok(ServerDeps::new(
        pool,
        email,
        payments,
        job_queue,
        config.public_base_url.clone(),
        config.payment_currency.clone(),
        config.chapa_webhook_secret.clone(),
    ))
}

/// Every background job this crate knows how to run.
pub fn build_job_registry() -> SharedJobRegistry {
    let mut registry = JobRegistry::new();
    register_notification_jobs(&mut registry);
    Arc::new(registry)
}

pub fn build_job_runner(server_deps: Arc<ServerDeps>) -> JobRunner {
    JobRunner::new(
        server_deps.job_queue.clone(),
        build_job_registry(),
        server_deps,
    )
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Build the Axum application router
pub fn build_app(state: AppState, options: &AppOptions) -> Router {
    let jwt_service_for_middleware = state.jwt_service.clone();
    let pool_for_middleware = state.db_pool.clone();

    let mut app = Router::new()
        .merge(auth::edges::router())
        .merge(users::edges::router())
        .merge(listings::edges::router())
        .merge(bookings::edges::router())
        .merge(reviews::edges::router())
        .merge(payments::edges::router())
        .merge(messages::edges::router())
        .route("/api/schema/", get(schema_handler))
        .route("/api/docs/", get(docs_handler))
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(
                jwt_service_for_middleware.clone(),
                pool_for_middleware.clone(),
                req,
                next,
            )
        }));

    // One token every 100 ms (10 requests per second) per client IP, bursts of 20
    if options.rate_limit_enabled {
        match GovernorConfigBuilder::default()
            .per_millisecond(100)
            .burst_size(20)
            .use_headers()
            .finish()
        {
            Some(config) => {
                app = app.layer(GovernorLayer {
                    config: Arc::new(config),
                });
            }
            None => warn!("invalid rate limit configuration, rate limiting disabled"),
        }
    }

    app
        // Health check (no rate limit, no auth)
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(cors_layer(&options.allowed_origins))
        .layer(TraceLayer::new_for_http())
}
