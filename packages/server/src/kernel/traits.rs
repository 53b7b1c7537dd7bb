// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "which email goes out when a booking is confirmed")
// lives in domain functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseEmailService)

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Email Service Trait (Infrastructure)
// =============================================================================

/// A rendered email ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[async_trait]
pub trait BaseEmailService: Send + Sync {
    async fn send_email(&self, email: OutgoingEmail) -> Result<()>;
}

// =============================================================================
// Payment Gateway Trait (Infrastructure)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCustomization {
    pub title: String,
    pub description: String,
}

/// Payload for `POST /transaction/initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInitRequest {
    /// Serialized as a decimal string.
    pub amount: Decimal,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub tx_ref: String,
    pub callback_url: String,
    pub return_url: String,
    pub customization: PaymentCustomization,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInitResponse {
    pub checkout_url: Option<String>,
    pub message: String,
    /// Raw `data` object returned by the gateway.
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentVerification {
    /// Gateway-side transaction status (`success`, `failed`, `pending`, ...).
    pub status: Option<String>,
    /// Gateway-side transaction reference.
    pub reference: Option<String>,
    pub message: String,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait BasePaymentGateway: Send + Sync {
    async fn initialize_payment(&self, request: &PaymentInitRequest) -> Result<PaymentInitResponse>;

    async fn verify_payment(&self, tx_ref: &str) -> Result<PaymentVerification>;
}
