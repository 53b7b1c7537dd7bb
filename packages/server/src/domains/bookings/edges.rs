use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::common::{ApiError, BookingId};
use crate::domains::bookings::actions;
use crate::domains::bookings::data::{BookingData, BookingInput, BookingQuery};
use crate::server::app::AppState;
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::middleware::AuthUser;

/// Bookings where the caller is the guest or the host.
#[utoipa::path(
    get,
    path = "/api/bookings/",
    tag = "bookings",
    params(BookingQuery),
    responses((status = 200, body = [BookingData]), (status = 401)),
    security(("bearer" = []))
)]
pub async fn list_bookings(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<BookingQuery>,
) -> Result<Json<Vec<BookingData>>, ApiError> {
    Ok(Json(
        actions::list_bookings(user.user_id, &query, &state.db_pool).await?,
    ))
}

/// Book a listing. The booking starts out `pending`.
#[utoipa::path(
    post,
    path = "/api/bookings/",
    tag = "bookings",
    request_body = BookingInput,
    responses(
        (status = 201, body = BookingData),
        (status = 400, description = "Invalid dates or listing not available"),
        (status = 401),
    ),
    security(("bearer" = []))
)]
pub async fn create_booking(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<BookingInput>,
) -> Result<(StatusCode, Json<BookingData>), ApiError> {
    let booking = actions::create_booking(user.user_id, input, &state.server_deps).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[utoipa::path(
    get,
    path = "/api/bookings/my_bookings/",
    tag = "bookings",
    responses((status = 200, body = [BookingData]), (status = 401)),
    security(("bearer" = []))
)]
pub async fn my_bookings(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<BookingData>>, ApiError> {
    Ok(Json(actions::my_bookings(user.user_id, &state.db_pool).await?))
}

#[utoipa::path(
    get,
    path = "/api/bookings/hosting_bookings/",
    tag = "bookings",
    responses((status = 200, body = [BookingData]), (status = 401)),
    security(("bearer" = []))
)]
pub async fn hosting_bookings(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<BookingData>>, ApiError> {
    Ok(Json(
        actions::hosting_bookings(user.user_id, &state.db_pool).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/bookings/{booking_id}/",
    tag = "bookings",
    params(("booking_id" = Uuid, Path)),
    responses((status = 200, body = BookingData), (status = 401), (status = 404)),
    security(("bearer" = []))
)]
pub async fn get_booking(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(booking_id): ApiPath<BookingId>,
) -> Result<Json<BookingData>, ApiError> {
    Ok(Json(
        actions::get_booking(user.user_id, booking_id, &state.db_pool).await?,
    ))
}

/// Change the dates of a booking. Guest only.
#[utoipa::path(
    put,
    path = "/api/bookings/{booking_id}/",
    tag = "bookings",
    params(("booking_id" = Uuid, Path)),
    request_body = BookingInput,
    responses((status = 200, body = BookingData), (status = 400), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn update_booking(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(booking_id): ApiPath<BookingId>,
    ApiJson(input): ApiJson<BookingInput>,
) -> Result<Json<BookingData>, ApiError> {
    let booking =
        actions::update_booking(user.user_id, booking_id, input, false, &state.db_pool).await?;
    Ok(Json(booking))
}

#[utoipa::path(
    patch,
    path = "/api/bookings/{booking_id}/",
    tag = "bookings",
    params(("booking_id" = Uuid, Path)),
    request_body = BookingInput,
    responses((status = 200, body = BookingData), (status = 400), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn partial_update_booking(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(booking_id): ApiPath<BookingId>,
    ApiJson(input): ApiJson<BookingInput>,
) -> Result<Json<BookingData>, ApiError> {
    let booking =
        actions::update_booking(user.user_id, booking_id, input, true, &state.db_pool).await?;
    Ok(Json(booking))
}

#[utoipa::path(
    delete,
    path = "/api/bookings/{booking_id}/",
    tag = "bookings",
    params(("booking_id" = Uuid, Path)),
    responses((status = 204), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn delete_booking(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(booking_id): ApiPath<BookingId>,
) -> Result<StatusCode, ApiError> {
    actions::delete_booking(user.user_id, booking_id, &state.db_pool).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Host accepts a booking; the guest gets a confirmation email.
#[utoipa::path(
    post,
    path = "/api/bookings/{booking_id}/confirm/",
    tag = "bookings",
    params(("booking_id" = Uuid, Path)),
    responses((status = 200, body = BookingData), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn confirm_booking(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(booking_id): ApiPath<BookingId>,
) -> Result<Json<BookingData>, ApiError> {
    Ok(Json(
        actions::confirm_booking(user.user_id, booking_id, &state.server_deps).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{booking_id}/cancel/",
    tag = "bookings",
    params(("booking_id" = Uuid, Path)),
    responses((status = 200, body = BookingData), (status = 404)),
    security(("bearer" = []))
)]
pub async fn cancel_booking(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(booking_id): ApiPath<BookingId>,
) -> Result<Json<BookingData>, ApiError> {
    Ok(Json(
        actions::cancel_booking(user.user_id, booking_id, &state.db_pool).await?,
    ))
}

pub fn router() -> Router {
    Router::new()
        .route("/api/bookings/", get(list_bookings).post(create_booking))
        .route("/api/bookings/my_bookings/", get(my_bookings))
        .route("/api/bookings/hosting_bookings/", get(hosting_bookings))
        .route(
            "/api/bookings/:booking_id/",
            get(get_booking)
                .put(update_booking)
                .patch(partial_update_booking)
                .delete(delete_booking),
        )
        .route("/api/bookings/:booking_id/confirm/", post(confirm_booking))
        .route("/api/bookings/:booking_id/cancel/", post(cancel_booking))
}
