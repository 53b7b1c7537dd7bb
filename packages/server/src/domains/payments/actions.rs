//! Chapa checkout flow: initiation, verification and webhook reconciliation.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::common::validation::{require_max_length, REQUIRED};
use crate::common::{ApiError, BookingId, PaymentId, PaymentMethodId, UserId, ValidationErrors};
use crate::domains::bookings::models::Booking;
use crate::domains::listings::models::Listing;
use crate::domains::notifications::{enqueue_email, SendPaymentConfirmationEmail, SendPaymentFailedEmail};
use crate::domains::payments::data::{
    InitiatePaymentInput, InitiatePaymentResponse, PaymentData, PaymentStatusResponse,
    WebhookPayload, WebhookResponse,
};
use crate::domains::payments::models::{
    generate_tx_ref, NewPayment, Payment, PaymentMethod, PaymentStatus, DEFAULT_PAYMENT_METHOD,
};
use crate::domains::users::models::User;
use crate::kernel::{PaymentCustomization, PaymentInitRequest, ServerDeps};

type HmacSha256 = Hmac<Sha256>;

pub const PAYMENT_NOT_FOUND: &str = "Payment record not found";

/// Check a hex HMAC-SHA256 of the raw request body.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

pub fn sign_payload(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

pub async fn hydrate_payments(payments: Vec<Payment>, pool: &PgPool) -> Result<Vec<PaymentData>, ApiError> {
    let user_ids: Vec<UserId> = payments.iter().map(|p| p.user_id).collect();
    let method_ids: Vec<PaymentMethodId> = payments.iter().map(|p| p.payment_method_id).collect();

    let users = User::find_by_ids(&user_ids, pool).await?;
    let methods: HashMap<PaymentMethodId, PaymentMethod> = PaymentMethod::find_by_ids(&method_ids, pool)
        .await?
        .into_iter()
        .map(|m| (m.method_id, m))
        .collect();

    Ok(payments
        .into_iter()
        .filter_map(|payment| {
            let user = users.get(&payment.user_id)?.into();
            let method = methods.get(&payment.payment_method_id)?.into();
            Some(PaymentData::new(payment, user, method))
        })
        .collect())
}

pub async fn list_payments(actor_id: UserId, pool: &PgPool) -> Result<Vec<PaymentData>, ApiError> {
    let payments = Payment::find_by_user(actor_id, pool).await?;
    hydrate_payments(payments, pool).await
}

pub async fn get_payment(actor_id: UserId, payment_id: PaymentId, pool: &PgPool) -> Result<PaymentData, ApiError> {
    let payment = Payment::find_by_id(payment_id, pool)
        .await?
        .ok_or_else(ApiError::not_found)?;
    if payment.user_id != actor_id {
        return Err(ApiError::PermissionDenied(
            "You do not have permission to access this payment.".to_string(),
        ));
    }

    hydrate_payments(vec![payment], pool)
        .await?
        .pop()
        .ok_or_else(ApiError::not_found)
}

fn method_name(input: &InitiatePaymentInput) -> Result<String, ApiError> {
    let name = input
        .payment_method
        .as_ref()
        .and_then(|m| m.method_name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_PAYMENT_METHOD);

    let mut errors = ValidationErrors::new();
    require_max_length(&mut errors, "method_name", name, 50);
    errors.into_result()?;
    Ok(name.to_string())
}

pub async fn initiate_payment(
    actor_id: UserId,
    booking_id: BookingId,
    input: InitiatePaymentInput,
    deps: &ServerDeps,
) -> Result<InitiatePaymentResponse, ApiError> {
    let pool = &deps.db_pool;

    let booking = Booking::find_by_id(booking_id, pool)
        .await?
        .ok_or_else(ApiError::not_found)?;
    if booking.user_id != actor_id {
        return Err(ApiError::forbidden());
    }
    if !booking.status.blocks_availability() {
        return Err(ApiError::BadRequest(format!(
            "Cannot pay for a {} booking",
            booking.status
        )));
    }

    let method_name = method_name(&input)?;
    let listing = Listing::find_by_id(booking.listing_id, pool)
        .await?
        .ok_or_else(ApiError::not_found)?;
    let guest = User::find_by_id(actor_id, pool)
        .await?
        .ok_or_else(ApiError::not_found)?;
    let method = PaymentMethod::get_or_create(&method_name, pool).await?;

    let tx_ref = generate_tx_ref(booking_id);
    let payment = Payment::insert(
        NewPayment::builder()
            .booking_id(booking_id)
            .user_id(actor_id)
            .amount(booking.total_price)
            .currency(deps.currency.clone())
            .chapa_reference(Some(tx_ref.clone()))
            .payment_method_id(method.method_id)
            .build(),
        pool,
    )
    .await?;

    let request = PaymentInitRequest {
        amount: payment.amount,
        currency: payment.currency.clone(),
        email: guest.email.clone(),
        first_name: guest.first_name.clone(),
        last_name: guest.last_name.clone(),
        phone_number: guest.phone_number.clone().unwrap_or_default(),
        tx_ref: tx_ref.clone(),
        callback_url: deps.absolute_url("/api/payments/webhook/"),
        return_url: deps.absolute_url(&format!("/api/payments/status/{}/", tx_ref)),
        customization: PaymentCustomization {
            title: format!("Booking Payment - {}", listing.name),
            description: format!(
                "Payment for booking from {} to {}",
                booking.start_date, booking.end_date
            ),
        },
    };

    match deps.payments.initialize_payment(&request).await {
        Ok(response) => {
            info!(
                payment_id = %payment.payment_id,
                booking_id = %booking_id,
                tx_ref = %tx_ref,
                "payment initiated"
            );
            Ok(InitiatePaymentResponse {
                status: "success".to_string(),
                checkout_url: response.checkout_url,
                data: response.data,
                tx_ref,
                message: response.message,
                payment_id: payment.payment_id,
            })
        }
        Err(e) => {
            warn!(payment_id = %payment.payment_id, error = %e, "payment initialization failed");
            Payment::transition(payment.payment_id, PaymentStatus::Failed, pool).await?;
            Err(ApiError::Gateway {
                error: "Failed to initialize payment with Chapa".to_string(),
                details: e.to_string(),
            })
        }
    }
}

/// Apply a gateway status to the local record. Each transition into
/// `completed` or `failed` enqueues exactly one email.
pub async fn reconcile_payment(
    payment: Payment,
    gateway_status: Option<&str>,
    reference: Option<&str>,
    deps: &ServerDeps,
) -> Result<Payment, ApiError> {
    let pool = &deps.db_pool;
    let mut payment = payment;

    if let Some(reference) = reference.filter(|r| !r.is_empty()) {
        if payment.transaction_id.as_deref() != Some(reference) {
            payment = Payment::record_transaction_id(payment.payment_id, reference, pool).await?;
        }
    }

    let Some(new_status) = gateway_status.map(PaymentStatus::from_gateway) else {
        return Ok(payment);
    };

    // An unrecognised status never un-settles a payment
    if new_status == PaymentStatus::Pending && payment.payment_status != PaymentStatus::Pending {
        return Ok(payment);
    }

    let Some(updated) = Payment::transition(payment.payment_id, new_status, pool).await? else {
        return Ok(payment);
    };

    info!(
        payment_id = %updated.payment_id,
        from = %payment.payment_status,
        to = %updated.payment_status,
        "payment status changed"
    );

    let queue = deps.job_queue.as_ref();
    match updated.payment_status {
        PaymentStatus::Completed => {
            enqueue_email(queue, SendPaymentConfirmationEmail { payment_id: updated.payment_id }).await
        }
        PaymentStatus::Failed => {
            enqueue_email(queue, SendPaymentFailedEmail { payment_id: updated.payment_id }).await
        }
        _ => {}
    }

    Ok(updated)
}

async fn find_by_reference(tx_ref: &str, pool: &PgPool) -> Result<Payment, ApiError> {
    Payment::find_by_reference(tx_ref, pool)
        .await?
        .ok_or_else(|| ApiError::RecordNotFound(PAYMENT_NOT_FOUND.to_string()))
}

fn verification_failed(e: anyhow::Error) -> ApiError {
    ApiError::Gateway {
        error: "Failed to verify payment".to_string(),
        details: e.to_string(),
    }
}

pub async fn payment_status(tx_ref: &str, deps: &ServerDeps) -> Result<PaymentStatusResponse, ApiError> {
    let payment = find_by_reference(tx_ref, &deps.db_pool).await?;

    let verification = deps
        .payments
        .verify_payment(tx_ref)
        .await
        .map_err(verification_failed)?;

    let payment = reconcile_payment(
        payment,
        verification.status.as_deref(),
        verification.reference.as_deref(),
        deps,
    )
    .await?;

    Ok(PaymentStatusResponse {
        status: "success".to_string(),
        payment_status: payment.payment_status,
        payment_data: verification.data,
        message: "Payment verified successfully".to_string(),
    })
}

/// Handle a gateway notification. The reported status is re-checked with
/// the gateway before anything is changed.
pub async fn handle_webhook(
    body: &[u8],
    signature: Option<&str>,
    deps: &ServerDeps,
) -> Result<WebhookResponse, ApiError> {
    if let Some(secret) = deps.webhook_secret.as_deref() {
        let valid = signature.is_some_and(|sig| verify_signature(secret, body, sig));
        if !valid {
            warn!("rejected webhook with missing or invalid signature");
            return Err(ApiError::PermissionDenied(
                "Invalid webhook signature".to_string(),
            ));
        }
    }

    let payload: WebhookPayload = serde_json::from_slice(body)
        .map_err(|e| ApiError::MalformedBody(format!("JSON parse error - {}", e)))?;
    let Some(tx_ref) = payload.tx_ref.filter(|t| !t.is_empty()) else {
        return Err(ValidationErrors::single("tx_ref", REQUIRED).into());
    };

    let payment = find_by_reference(&tx_ref, &deps.db_pool).await?;

    let verification = deps
        .payments
        .verify_payment(&tx_ref)
        .await
        .map_err(verification_failed)?;

    let status = verification.status.as_deref().or(payload.status.as_deref());
    let reference = verification
        .reference
        .as_deref()
        .or(payload.reference.as_deref());

    let payment = reconcile_payment(payment, status, reference, deps).await?;
    info!(tx_ref = %tx_ref, payment_status = %payment.payment_status, "webhook processed");

    Ok(WebhookResponse {
        status: "success".to_string(),
        tx_ref,
        payment_status: payment.payment_status,
        verification: verification.data,
    })
}
