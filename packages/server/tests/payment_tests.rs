//! Chapa checkout: initiation, status polling and webhook reconciliation.
//!
//! Run with: cargo test --test payment_tests -- --ignored

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use test_context::test_context;
use travel_core::common::{BookingId, UserId};
use travel_core::domains::bookings::models::BookingStatus;
use travel_core::domains::notifications::{SendPaymentConfirmationEmail, SendPaymentFailedEmail};
use travel_core::domains::payments::actions::sign_payload;
use travel_core::domains::payments::models::{Payment, PaymentStatus};
use travel_core::kernel::{MockPaymentGateway, TestDependencies};

use crate::common::*;

/// Guest with a pending booking, plus the booking id.
async fn guest_with_booking(ctx: &TestHarness) -> (UserId, BookingId) {
    let host = create_test_user(&ctx.db_pool, "Host").await.unwrap();
    let guest = create_test_user(&ctx.db_pool, "Guest").await.unwrap();
    let listing = create_test_listing(&ctx.db_pool, &host, 150).await.unwrap();
    let booking =
        create_test_booking(&ctx.db_pool, &listing, &guest, day(7), day(9), BookingStatus::Pending)
            .await
            .unwrap();
    (guest.user_id, booking.booking_id)
}

async fn initiate(ctx: &TestHarness, guest_id: UserId, booking_id: BookingId) -> TestResponse {
    ctx.request(
        Method::POST,
        &format!("/api/payments/{}/initiate/", booking_id),
        Some(guest_id),
        None,
    )
    .await
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker (testcontainers)"]
async fn initiate_creates_pending_payment_and_calls_gateway(ctx: &mut TestHarness) {
    let (guest_id, booking_id) = guest_with_booking(ctx).await;

    let response = initiate(ctx, guest_id, booking_id).await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["status"], "success");
    let tx_ref = response.body["tx_ref"].as_str().unwrap().to_string();
    assert!(tx_ref.starts_with("booking-"));
    assert_eq!(
        response.body["checkout_url"],
        format!("https://checkout.chapa.test/{}", tx_ref)
    );

    let calls = ctx.deps.payments.init_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tx_ref, tx_ref);
    assert_eq!(calls[0].currency, "NGN");
    assert_eq!(calls[0].callback_url, "http://testserver/api/payments/webhook/");

    let payment = Payment::find_by_reference(&tx_ref, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.payment_status, PaymentStatus::Pending);
    assert_eq!(payment.booking_id, booking_id);
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker (testcontainers)"]
async fn gateway_failure_marks_payment_failed(ctx: &mut TestHarness) {
    ctx.replace_dependencies(
        TestDependencies::new().mock_payments(MockPaymentGateway::new().failing_init()),
    );
    let (guest_id, booking_id) = guest_with_booking(ctx).await;

    let response = initiate(ctx, guest_id, booking_id).await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["error"], "Failed to initialize payment with Chapa");

    let tx_ref = ctx.deps.payments.init_calls()[0].tx_ref.clone();
    let payment = Payment::find_by_reference(&tx_ref, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.payment_status, PaymentStatus::Failed);
    assert_eq!(
        ctx.deps
            .job_queue
            .jobs_of_type(SendPaymentFailedEmail::JOB_TYPE)
            .len(),
        0
    );
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker (testcontainers)"]
async fn only_the_guest_can_pay(ctx: &mut TestHarness) {
    let (_, booking_id) = guest_with_booking(ctx).await;
    let stranger = create_test_user(&ctx.db_pool, "Stranger").await.unwrap();

    let response = initiate(ctx, stranger.user_id, booking_id).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(ctx.deps.payments.init_calls().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker (testcontainers)"]
async fn webhook_success_completes_payment_once(ctx: &mut TestHarness) {
    ctx.replace_dependencies(
        TestDependencies::new().mock_payments(MockPaymentGateway::new().with_verify_status("success")),
    );
    let (guest_id, booking_id) = guest_with_booking(ctx).await;
    let tx_ref = initiate(ctx, guest_id, booking_id).await.body["tx_ref"]
        .as_str()
        .unwrap()
        .to_string();

    for _ in 0..2 {
        let response = ctx
            .request(
                Method::POST,
                "/api/payments/webhook/",
                None,
                Some(json!({ "tx_ref": tx_ref, "status": "success" })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        assert_eq!(response.body["payment_status"], "completed");
    }

    let payment = Payment::find_by_reference(&tx_ref, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.payment_status, PaymentStatus::Completed);
    assert_eq!(payment.transaction_id, Some(format!("CHK-{}", tx_ref)));
    assert_eq!(
        ctx.deps
            .job_queue
            .jobs_of_type(SendPaymentConfirmationEmail::JOB_TYPE)
            .len(),
        1
    );
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker (testcontainers)"]
async fn webhook_for_unknown_reference_is_404(ctx: &mut TestHarness) {
    let response = ctx
        .request(
            Method::POST,
            "/api/payments/webhook/",
            None,
            Some(json!({ "tx_ref": "booking-missing", "status": "success" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Payment record not found");
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker (testcontainers)"]
async fn webhook_signature_is_checked_when_secret_is_set(ctx: &mut TestHarness) {
    ctx.replace_dependencies(
        TestDependencies::new()
            .mock_payments(MockPaymentGateway::new().with_verify_status("failed"))
            .webhook_secret("whsec"),
    );
    let (guest_id, booking_id) = guest_with_booking(ctx).await;
    let tx_ref = initiate(ctx, guest_id, booking_id).await.body["tx_ref"]
        .as_str()
        .unwrap()
        .to_string();
    let body = json!({ "tx_ref": tx_ref, "status": "failed" }).to_string();

    let unsigned = send(
        ctx.app(),
        build_request(
            Method::POST,
            "/api/payments/webhook/",
            None,
            Some(serde_json::from_str(&body).unwrap()),
        ),
    )
    .await;
    assert_eq!(unsigned.status, StatusCode::FORBIDDEN);
    assert!(ctx.deps.payments.verify_calls().is_empty());

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/payments/webhook/")
        .header("content-type", "application/json")
        .header("x-chapa-signature", sign_payload("whsec", body.as_bytes()).unwrap())
        .body(axum::body::Body::from(body))
        .unwrap();
    let signed = send(ctx.app(), request).await;

    assert_eq!(signed.status, StatusCode::OK, "{:?}", signed.body);
    assert_eq!(signed.body["payment_status"], "failed");
    assert_eq!(
        ctx.deps
            .job_queue
            .jobs_of_type(SendPaymentFailedEmail::JOB_TYPE)
            .len(),
        1
    );
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker (testcontainers)"]
async fn status_endpoint_reconciles_with_gateway(ctx: &mut TestHarness) {
    ctx.replace_dependencies(
        TestDependencies::new().mock_payments(MockPaymentGateway::new().with_verify_status("success")),
    );
    let (guest_id, booking_id) = guest_with_booking(ctx).await;
    let tx_ref = initiate(ctx, guest_id, booking_id).await.body["tx_ref"]
        .as_str()
        .unwrap()
        .to_string();

    let response = ctx
        .request(Method::GET, &format!("/api/payments/status/{}/", tx_ref), None, None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["payment_status"], "completed");
    assert_eq!(ctx.deps.payments.verify_calls(), vec![tx_ref]);

    // The guest now sees it in their payment list
    let listed = ctx
        .request(Method::GET, "/api/payments/", Some(guest_id), None)
        .await;
    assert_eq!(listed.body[0]["is_successful"], true);
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker (testcontainers)"]
async fn payments_are_visible_only_to_the_payer(ctx: &mut TestHarness) {
    let (guest_id, booking_id) = guest_with_booking(ctx).await;
    let stranger = create_test_user(&ctx.db_pool, "Stranger").await.unwrap();

    let response = initiate(ctx, guest_id, booking_id).await;
    let tx_ref = response.body["tx_ref"].as_str().unwrap().to_string();
    let payment = Payment::find_by_reference(&tx_ref, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    let uri = format!("/api/payments/{}/", payment.payment_id);

    let response = ctx.request(Method::GET, &uri, Some(guest_id), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["payment_id"], json!(payment.payment_id));

    let response = ctx.request(Method::GET, &uri, Some(stranger.user_id), None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.body["error"],
        "You do not have permission to access this payment."
    );

    let listed = ctx
        .request(Method::GET, "/api/payments/", Some(stranger.user_id), None)
        .await;
    assert_eq!(listed.body.as_array().map(Vec::len), Some(0));
}
