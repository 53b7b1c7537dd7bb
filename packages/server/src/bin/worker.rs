//! Standalone job runner.
//!
//! Processes the notification email queue without serving HTTP. Run it when
//! the API server is started with `EMBEDDED_WORKER=false`, or to add
//! capacity; several workers can share one queue.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use travel_core::kernel::jobs::{JobRunner, JobRunnerConfig};
use travel_core::server::{build_job_registry, build_server_deps};
use travel_core::Config;

#[derive(Parser)]
#[command(name = "worker")]
#[command(about = "Run background jobs (notification emails)")]
struct Cli {
    /// Identifier recorded on claimed jobs
    #[arg(long)]
    worker_id: Option<String>,

    /// Jobs claimed per poll
    #[arg(long, default_value_t = 10)]
    batch_size: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,travel_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let server_deps = Arc::new(build_server_deps(&config, pool)?);

    let mut runner_config = match cli.worker_id {
        Some(id) => JobRunnerConfig::with_worker_id(id),
        None => JobRunnerConfig::default(),
    };
    runner_config.batch_size = cli.batch_size;

    let runner = JobRunner::with_config(
        server_deps.job_queue.clone(),
        build_job_registry(),
        server_deps,
        runner_config,
    );

    runner.run_until_shutdown().await
}
