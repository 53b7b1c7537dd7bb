// Main entry point for API server

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use travel_core::domains::auth::JwtService;
use travel_core::server::{build_app, build_job_runner, build_server_deps, AppOptions, AppState};
use travel_core::Config;

async fn shutdown_signal(runner_shutdown: Option<Arc<AtomicBool>>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("received shutdown signal");
    if let Some(flag) = runner_shutdown {
        flag.store(true, Ordering::SeqCst);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,travel_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Travel Booking API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let server_deps = Arc::new(build_server_deps(&config, pool)?);
    let jwt_service = Arc::new(JwtService::new(
        &config.jwt_secret,
        config.jwt_issuer.clone(),
        config.jwt_ttl_hours,
    ));

    // Notification emails run in-process unless a standalone worker is deployed
    let runner_shutdown = if config.embedded_worker {
        let runner = build_job_runner(server_deps.clone());
        let handle = runner.shutdown_handle();
        tokio::spawn(async move {
            if let Err(e) = runner.run().await {
                tracing::error!(error = %e, "Job runner exited with error");
            }
        });
        Some(handle)
    } else {
        tracing::info!("Embedded job runner disabled, start the worker binary to send emails");
        None
    };

    let app = build_app(
        AppState::new(server_deps, jwt_service),
        &AppOptions::from(&config),
    );

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("API docs: http://localhost:{}/api/docs/", config.port);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(runner_shutdown))
    .await
    .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}
