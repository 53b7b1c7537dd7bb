//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container is shared by every test in the binary. It starts
//! and migrates on first use; each test then gets its own pool and its own
//! mock email, payment and job queue services.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use travel_core::common::UserId;
use travel_core::domains::auth::JwtService;
use travel_core::kernel::jobs::JobRunner;
use travel_core::kernel::{ServerDeps, TestDependencies};
use travel_core::server::{build_app, build_job_registry, AppOptions, AppState};

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_JWT_ISSUER: &str = "travel-api-test";

struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --ignored --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=200"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// ```ignore
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &mut TestHarness) {
///     let guest = create_test_user(&ctx.db_pool, "Guest").await.unwrap();
///     let response = ctx.request(Method::GET, "/api/bookings/", Some(guest.user_id), None).await;
/// }
/// ```
pub struct TestHarness {
    pub db_pool: PgPool,
    /// Mocks behind `server_deps`; inspect them after a request.
    pub deps: TestDependencies,
    pub server_deps: Arc<ServerDeps>,
    pub jwt_service: Arc<JwtService>,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        Self::with_dependencies(TestDependencies::new()).await
    }

    pub async fn with_dependencies(deps: TestDependencies) -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        Ok(Self::assemble(db_pool, deps))
    }

    /// Swap the mocks, e.g. to make the gateway fail.
    pub fn replace_dependencies(&mut self, deps: TestDependencies) {
        *self = Self::assemble(self.db_pool.clone(), deps);
    }

    fn assemble(db_pool: PgPool, deps: TestDependencies) -> Self {
        let server_deps = deps.clone().into_server_deps(db_pool.clone());
        let jwt_service = Arc::new(JwtService::new(
            TEST_JWT_SECRET,
            TEST_JWT_ISSUER.to_string(),
            1,
        ));

        Self {
            db_pool,
            deps,
            server_deps,
            jwt_service,
        }
    }

    pub fn app(&self) -> Router {
        build_app(
            AppState::new(self.server_deps.clone(), self.jwt_service.clone()),
            &AppOptions::default(),
        )
    }

    pub fn token_for(&self, user_id: UserId) -> String {
        self.jwt_service
            .create_token(user_id, format!("{}@example.com", user_id))
            .expect("token")
    }

    /// A runner over the in-memory queue, for draining enqueued emails.
    pub fn job_runner(&self) -> JobRunner {
        JobRunner::new(
            self.deps.job_queue.clone(),
            build_job_registry(),
            self.server_deps.clone(),
        )
    }
}
