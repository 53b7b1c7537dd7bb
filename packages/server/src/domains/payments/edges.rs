use axum::body::Bytes;
use axum::extract::Extension;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::common::{ApiError, BookingId, PaymentId};
use crate::domains::payments::actions;
use crate::domains::payments::data::{
    InitiatePaymentInput, InitiatePaymentResponse, PaymentData, PaymentStatusResponse,
    WebhookPayload, WebhookResponse,
};
use crate::server::app::AppState;
use crate::server::extract::ApiPath;
use crate::server::middleware::AuthUser;

const SIGNATURE_HEADERS: [&str; 2] = ["x-chapa-signature", "chapa-signature"];

fn signature_header(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
}

/// The caller's payments.
#[utoipa::path(
    get,
    path = "/api/payments/",
    tag = "payments",
    responses((status = 200, body = [PaymentData]), (status = 401)),
    security(("bearer" = []))
)]
pub async fn list_payments(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<PaymentData>>, ApiError> {
    Ok(Json(actions::list_payments(user.user_id, &state.db_pool).await?))
}

#[utoipa::path(
    get,
    path = "/api/payments/{payment_id}/",
    tag = "payments",
    params(("payment_id" = Uuid, Path)),
    responses((status = 200, body = PaymentData), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn get_payment(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(payment_id): ApiPath<PaymentId>,
) -> Result<Json<PaymentData>, ApiError> {
    Ok(Json(
        actions::get_payment(user.user_id, payment_id, &state.db_pool).await?,
    ))
}

/// Start a Chapa checkout for a booking. The body is optional.
#[utoipa::path(
    post,
    path = "/api/payments/{booking_id}/initiate/",
    tag = "payments",
    params(("booking_id" = Uuid, Path)),
    request_body(content = Option<InitiatePaymentInput>),
    responses(
        (status = 201, body = InitiatePaymentResponse),
        (status = 400),
        (status = 403),
        (status = 404),
        (status = 502, description = "Gateway rejected the transaction"),
    ),
    security(("bearer" = []))
)]
pub async fn initiate_payment(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(booking_id): ApiPath<BookingId>,
    body: Bytes,
) -> Result<(StatusCode, Json<InitiatePaymentResponse>), ApiError> {
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        InitiatePaymentInput::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::MalformedBody(e.to_string()))?
    };

    let response =
        actions::initiate_payment(user.user_id, booking_id, input, &state.server_deps).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Gateway return URL. Verifies the transaction and syncs the local record.
#[utoipa::path(
    get,
    path = "/api/payments/status/{tx_ref}/",
    tag = "payments",
    params(("tx_ref" = String, Path)),
    responses(
        (status = 200, body = PaymentStatusResponse),
        (status = 404, description = "Payment record not found"),
        (status = 502),
    )
)]
pub async fn payment_status(
    Extension(state): Extension<AppState>,
    ApiPath(tx_ref): ApiPath<String>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    Ok(Json(actions::payment_status(&tx_ref, &state.server_deps).await?))
}

/// Chapa webhook. Signed with HMAC-SHA256 when a webhook secret is configured.
#[utoipa::path(
    post,
    path = "/api/payments/webhook/",
    tag = "payments",
    request_body = WebhookPayload,
    responses(
        (status = 200, body = WebhookResponse),
        (status = 400),
        (status = 403, description = "Invalid webhook signature"),
        (status = 404),
    )
)]
pub async fn webhook(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let response =
        actions::handle_webhook(&body, signature_header(&headers), &state.server_deps).await?;
    Ok(Json(response))
}

pub fn router() -> Router {
    // `:id` is a payment id on the detail route and a booking id on initiate
    Router::new()
        .route("/api/payments/", get(list_payments))
        .route("/api/payments/webhook/", post(webhook))
        .route("/api/payments/status/:tx_ref/", get(payment_status))
        .route("/api/payments/:id/", get(get_payment))
        .route("/api/payments/:id/initiate/", post(initiate_payment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_signature_header_lookup() {
        let mut headers = HeaderMap::new();
        assert_eq!(signature_header(&headers), None);

        headers.insert("chapa-signature", HeaderValue::from_static("abc"));
        assert_eq!(signature_header(&headers), Some("abc"));

        headers.insert("x-chapa-signature", HeaderValue::from_static("def"));
        assert_eq!(signature_header(&headers), Some("def"));
    }
}
