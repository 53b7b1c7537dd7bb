//! OpenAPI document and Swagger UI.

use axum::response::Html;
use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domains::{auth, bookings, listings, messages, payments, reviews, users};

#[derive(OpenApi)]
#[openapi(
    info(title = "Travel Booking API", description = "Listings, bookings, reviews and payments"),
    paths(
        auth::edges::obtain_token,
        users::edges::register,
        users::edges::list_users,
        users::edges::me,
        users::edges::get_user,
        users::edges::update_user,
        users::edges::partial_update_user,
        users::edges::delete_user,
        users::edges::user_listings,
        users::edges::user_bookings,
        listings::edges::list_listings,
        listings::edges::create_listing,
        listings::edges::my_listings,
        listings::edges::get_listing,
        listings::edges::update_listing,
        listings::edges::partial_update_listing,
        listings::edges::delete_listing,
        listings::edges::listing_reviews,
        listings::edges::add_review,
        listings::edges::listing_bookings,
        bookings::edges::list_bookings,
        bookings::edges::create_booking,
        bookings::edges::my_bookings,
        bookings::edges::hosting_bookings,
        bookings::edges::get_booking,
        bookings::edges::update_booking,
        bookings::edges::partial_update_booking,
        bookings::edges::delete_booking,
        bookings::edges::confirm_booking,
        bookings::edges::cancel_booking,
        reviews::edges::list_reviews,
        reviews::edges::create_review,
        reviews::edges::get_review,
        reviews::edges::update_review,
        reviews::edges::partial_update_review,
        reviews::edges::delete_review,
        payments::edges::list_payments,
        payments::edges::get_payment,
        payments::edges::initiate_payment,
        payments::edges::payment_status,
        payments::edges::webhook,
        messages::edges::list_messages,
        messages::edges::send_message,
        messages::edges::get_message,
        messages::edges::delete_message,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth"),
        (name = "users"),
        (name = "listings"),
        (name = "bookings"),
        (name = "reviews"),
        (name = "payments"),
        (name = "messages"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Travel Booking API</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({ url: "/api/schema/", dom_id: "#swagger-ui" });
  </script>
</body>
</html>
"##;

pub async fn schema_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub async fn docs_handler() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/api/auth/token/",
            "/api/users/",
            "/api/users/me/",
            "/api/users/{user_id}/",
            "/api/users/{user_id}/listings/",
            "/api/users/{user_id}/bookings/",
            "/api/listings/",
            "/api/listings/my_listings/",
            "/api/listings/{property_id}/",
            "/api/listings/{property_id}/reviews/",
            "/api/listings/{property_id}/add_review/",
            "/api/listings/{property_id}/bookings/",
            "/api/bookings/",
            "/api/bookings/my_bookings/",
            "/api/bookings/hosting_bookings/",
            "/api/bookings/{booking_id}/",
            "/api/bookings/{booking_id}/confirm/",
            "/api/bookings/{booking_id}/cancel/",
            "/api/reviews/",
            "/api/reviews/{review_id}/",
            "/api/payments/",
            "/api/payments/{payment_id}/",
            "/api/payments/{booking_id}/initiate/",
            "/api/payments/status/{tx_ref}/",
            "/api/payments/webhook/",
            "/api/messages/",
            "/api/messages/{message_id}/",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn test_docs_page_points_at_schema() {
        let Html(page) = docs_handler().await;
        assert!(page.contains(r##"dom_id: "#swagger-ui""##));
        assert!(page.contains(r#"url: "/api/schema/""#));
        assert!(page.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
