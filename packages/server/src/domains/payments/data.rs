use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::{BookingId, PaymentId, PaymentMethodId};
use crate::domains::payments::models::{Payment, PaymentMethod, PaymentStatus};
use crate::domains::users::data::UserData;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentMethodData {
    #[schema(value_type = Uuid)]
    pub method_id: PaymentMethodId,
    pub method_name: String,
}

impl From<&PaymentMethod> for PaymentMethodData {
    fn from(method: &PaymentMethod) -> Self {
        Self {
            method_id: method.method_id,
            method_name: method.method_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentData {
    #[schema(value_type = Uuid)]
    pub payment_id: PaymentId,
    #[schema(value_type = Uuid)]
    pub booking_id: BookingId,
    pub user: UserData,
    #[schema(value_type = String, example = "360.00")]
    pub amount: Decimal,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub is_successful: bool,
    pub transaction_id: Option<String>,
    pub chapa_reference: Option<String>,
    pub payment_method: PaymentMethodData,
    pub payment_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentData {
    pub fn new(payment: Payment, user: UserData, payment_method: PaymentMethodData) -> Self {
        Self {
            is_successful: payment.is_successful(),
            payment_id: payment.payment_id,
            booking_id: payment.booking_id,
            user,
            amount: payment.amount,
            currency: payment.currency,
            payment_status: payment.payment_status,
            transaction_id: payment.transaction_id,
            chapa_reference: payment.chapa_reference,
            payment_method,
            payment_date: payment.payment_date,
            updated_at: payment.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PaymentMethodInput {
    #[schema(example = "chapa")]
    pub method_name: Option<String>,
}

/// Body of `POST /api/payments/{booking_id}/initiate/`. May be empty.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct InitiatePaymentInput {
    pub payment_method: Option<PaymentMethodInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InitiatePaymentResponse {
    #[schema(example = "success")]
    pub status: String,
    pub checkout_url: Option<String>,
    /// Raw gateway `data` object
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub tx_ref: String,
    pub message: String,
    #[schema(value_type = Uuid)]
    pub payment_id: PaymentId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatusResponse {
    #[schema(example = "success")]
    pub status: String,
    pub payment_status: PaymentStatus,
    #[schema(value_type = Object)]
    pub payment_data: serde_json::Value,
    pub message: String,
}

/// Gateway notification. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct WebhookPayload {
    #[serde(alias = "trx_ref")]
    pub tx_ref: Option<String>,
    pub status: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    #[schema(example = "success")]
    pub status: String,
    pub tx_ref: String,
    pub payment_status: PaymentStatus,
    /// Gateway verification `data`
    #[schema(value_type = Object)]
    pub verification: serde_json::Value,
}
