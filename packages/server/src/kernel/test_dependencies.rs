// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};

use super::jobs::testing::InMemoryJobQueue;
use super::{
    BaseEmailService, BasePaymentGateway, OutgoingEmail, PaymentInitRequest, PaymentInitResponse,
    PaymentVerification, ServerDeps,
};

// =============================================================================
// Mock Email Service
// =============================================================================

pub struct MockEmailService {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    fail: bool,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// A mock whose every send fails (simulates an SMTP outage)
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Get all emails that were sent
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Get all emails sent to an address
    pub fn sent_to(&self, address: &str) -> Vec<OutgoingEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.to == address)
            .collect()
    }
}

impl Default for MockEmailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEmailService for MockEmailService {
    async fn send_email(&self, email: OutgoingEmail) -> Result<()> {
        if self.fail {
            return Err(anyhow!("SMTP connection refused"));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

// =============================================================================
// Mock Payment Gateway
// =============================================================================

pub struct MockPaymentGateway {
    init_calls: Arc<Mutex<Vec<PaymentInitRequest>>>,
    verify_calls: Arc<Mutex<Vec<String>>>,
    verify_status: Arc<Mutex<Option<String>>>,
    fail_init: bool,
    fail_verify: bool,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            init_calls: Arc::new(Mutex::new(Vec::new())),
            verify_calls: Arc::new(Mutex::new(Vec::new())),
            verify_status: Arc::new(Mutex::new(Some("pending".to_string()))),
            fail_init: false,
            fail_verify: false,
        }
    }

    /// Status the gateway reports on verification
    pub fn with_verify_status(self, status: &str) -> Self {
        *self.verify_status.lock().unwrap() = Some(status.to_string());
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_verify(mut self) -> Self {
        self.fail_verify = true;
        self
    }

    pub fn init_calls(&self) -> Vec<PaymentInitRequest> {
        self.init_calls.lock().unwrap().clone()
    }

    pub fn verify_calls(&self) -> Vec<String> {
        self.verify_calls.lock().unwrap().clone()
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePaymentGateway for MockPaymentGateway {
    async fn initialize_payment(&self, request: &PaymentInitRequest) -> Result<PaymentInitResponse> {
        self.init_calls.lock().unwrap().push(request.clone());

        if self.fail_init {
            return Err(anyhow!("Chapa initialize failed with status 401: invalid API key"));
        }

        let checkout_url = format!("https://checkout.chapa.test/{}", request.tx_ref);
        Ok(PaymentInitResponse {
            checkout_url: Some(checkout_url.clone()),
            message: "Hosted Link".to_string(),
            data: serde_json::json!({ "checkout_url": checkout_url }),
        })
    }

    async fn verify_payment(&self, tx_ref: &str) -> Result<PaymentVerification> {
        self.verify_calls.lock().unwrap().push(tx_ref.to_string());

        if self.fail_verify {
            return Err(anyhow!("Chapa verify failed with status 404: transaction not found"));
        }

        let status = self.verify_status.lock().unwrap().clone();
        let reference = format!("CHK-{}", tx_ref);
        Ok(PaymentVerification {
            status: status.clone(),
            reference: Some(reference.clone()),
            message: "Payment details".to_string(),
            data: serde_json::json!({
                "tx_ref": tx_ref,
                "status": status,
                "reference": reference,
            }),
        })
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub email: Arc<MockEmailService>,
    pub payments: Arc<MockPaymentGateway>,
    pub job_queue: Arc<InMemoryJobQueue>,
    pub webhook_secret: Option<String>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            email: Arc::new(MockEmailService::new()),
            payments: Arc::new(MockPaymentGateway::new()),
            job_queue: Arc::new(InMemoryJobQueue::new()),
            webhook_secret: None,
        }
    }

    pub fn mock_email(mut self, email: MockEmailService) -> Self {
        self.email = Arc::new(email);
        self
    }

    pub fn mock_payments(mut self, payments: MockPaymentGateway) -> Self {
        self.payments = Arc::new(payments);
        self
    }

    pub fn job_queue(mut self, queue: InMemoryJobQueue) -> Self {
        self.job_queue = Arc::new(queue);
        self
    }

    pub fn webhook_secret(mut self, secret: &str) -> Self {
        self.webhook_secret = Some(secret.to_string());
        self
    }

    /// Convert into ServerDeps for testing
    pub fn into_server_deps(self, db_pool: PgPool) -> Arc<ServerDeps> {
        Arc::new(ServerDeps::new(
            db_pool,
            self.email,
            self.payments,
            self.job_queue,
            "http://testserver".to_string(),
            "NGN".to_string(),
            self.webhook_secret,
        ))
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
