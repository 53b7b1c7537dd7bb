//! Server dependencies for actions and background jobs (using traits for testability)
//!
//! All external services use trait abstractions so tests can swap in mocks.

use sqlx::PgPool;
use std::sync::Arc;

use crate::kernel::jobs::JobQueue;
use crate::kernel::{BaseEmailService, BasePaymentGateway};

/// Server dependencies accessible to actions and job handlers
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub email: Arc<dyn BaseEmailService>,
    pub payments: Arc<dyn BasePaymentGateway>,
    pub job_queue: Arc<dyn JobQueue>,
    /// Absolute base URL used for gateway callback and return links
    pub public_base_url: String,
    /// ISO currency sent to the payment gateway
    pub currency: String,
    /// When set, webhook deliveries must carry a valid HMAC signature
    pub webhook_secret: Option<String>,
}

impl ServerDeps {
    pub fn new(
        db_pool: PgPool,
        email: Arc<dyn BaseEmailService>,
        payments: Arc<dyn BasePaymentGateway>,
        job_queue: Arc<dyn JobQueue>,
        public_base_url: String,
        currency: String,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            db_pool,
            email,
            payments,
            job_queue,
            public_base_url,
            currency,
            webhook_secret,
        }
    }

    /// Join a path onto the public base URL.
    pub fn absolute_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
