use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::common::{ApiError, ListingId};
use crate::domains::bookings::data::BookingData;
use crate::domains::listings::actions;
use crate::domains::listings::data::{ListingData, ListingInput, ListingQuery};
use crate::domains::reviews::data::{AddReviewInput, ReviewData};
use crate::server::app::AppState;
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::middleware::AuthUser;

#[utoipa::path(
    get,
    path = "/api/listings/",
    tag = "listings",
    params(ListingQuery),
    responses((status = 200, body = [ListingData]), (status = 400, description = "Bad filter value"))
)]
pub async fn list_listings(
    Extension(state): Extension<AppState>,
    ApiQuery(query): ApiQuery<ListingQuery>,
) -> Result<Json<Vec<ListingData>>, ApiError> {
    Ok(Json(actions::list_listings(&query, &state.db_pool).await?))
}

/// Create a listing hosted by the caller.
#[utoipa::path(
    post,
    path = "/api/listings/",
    tag = "listings",
    request_body = ListingInput,
    responses((status = 201, body = ListingData), (status = 400), (status = 401)),
    security(("bearer" = []))
)]
pub async fn create_listing(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<ListingInput>,
) -> Result<(StatusCode, Json<ListingData>), ApiError> {
    let listing = actions::create_listing(user.user_id, input, &state.db_pool).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// Listings hosted by the caller.
#[utoipa::path(
    get,
    path = "/api/listings/my_listings/",
    tag = "listings",
    responses((status = 200, body = [ListingData]), (status = 401)),
    security(("bearer" = []))
)]
pub async fn my_listings(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ListingData>>, ApiError> {
    Ok(Json(actions::listings_for_host(user.user_id, &state.db_pool).await?))
}

#[utoipa::path(
    get,
    path = "/api/listings/{property_id}/",
    tag = "listings",
    params(("property_id" = Uuid, Path)),
    responses((status = 200, body = ListingData), (status = 404))
)]
pub async fn get_listing(
    Extension(state): Extension<AppState>,
    ApiPath(property_id): ApiPath<ListingId>,
) -> Result<Json<ListingData>, ApiError> {
    Ok(Json(actions::get_listing(property_id, &state.db_pool).await?))
}

#[utoipa::path(
    put,
    path = "/api/listings/{property_id}/",
    tag = "listings",
    params(("property_id" = Uuid, Path)),
    request_body = ListingInput,
    responses((status = 200, body = ListingData), (status = 400), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn update_listing(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(property_id): ApiPath<ListingId>,
    ApiJson(input): ApiJson<ListingInput>,
) -> Result<Json<ListingData>, ApiError> {
    let listing =
        actions::update_listing(user.user_id, property_id, input, false, &state.db_pool).await?;
    Ok(Json(listing))
}

#[utoipa::path(
    patch,
    path = "/api/listings/{property_id}/",
    tag = "listings",
    params(("property_id" = Uuid, Path)),
    request_body = ListingInput,
    responses((status = 200, body = ListingData), (status = 400), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn partial_update_listing(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(property_id): ApiPath<ListingId>,
    ApiJson(input): ApiJson<ListingInput>,
) -> Result<Json<ListingData>, ApiError> {
    let listing =
        actions::update_listing(user.user_id, property_id, input, true, &state.db_pool).await?;
    Ok(Json(listing))
}

#[utoipa::path(
    delete,
    path = "/api/listings/{property_id}/",
    tag = "listings",
    params(("property_id" = Uuid, Path)),
    responses((status = 204), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn delete_listing(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(property_id): ApiPath<ListingId>,
) -> Result<StatusCode, ApiError> {
    actions::delete_listing(user.user_id, property_id, &state.db_pool).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/listings/{property_id}/reviews/",
    tag = "listings",
    params(("property_id" = Uuid, Path)),
    responses((status = 200, body = [ReviewData]), (status = 404))
)]
pub async fn listing_reviews(
    Extension(state): Extension<AppState>,
    ApiPath(property_id): ApiPath<ListingId>,
) -> Result<Json<Vec<ReviewData>>, ApiError> {
    Ok(Json(actions::listing_reviews(property_id, &state.db_pool).await?))
}

/// Review a listing. Each user may review a listing once.
#[utoipa::path(
    post,
    path = "/api/listings/{property_id}/add_review/",
    tag = "listings",
    params(("property_id" = Uuid, Path)),
    request_body = AddReviewInput,
    responses(
        (status = 201, body = ReviewData),
        (status = 400, description = "Invalid rating or already reviewed"),
        (status = 401),
        (status = 404),
    ),
    security(("bearer" = []))
)]
pub async fn add_review(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(property_id): ApiPath<ListingId>,
    ApiJson(input): ApiJson<AddReviewInput>,
) -> Result<(StatusCode, Json<ReviewData>), ApiError> {
    let review = actions::add_review(user.user_id, property_id, input, &state.db_pool).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Every booking of a listing. Host only.
#[utoipa::path(
    get,
    path = "/api/listings/{property_id}/bookings/",
    tag = "listings",
    params(("property_id" = Uuid, Path)),
    responses((status = 200, body = [BookingData]), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn listing_bookings(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(property_id): ApiPath<ListingId>,
) -> Result<Json<Vec<BookingData>>, ApiError> {
    Ok(Json(
        actions::listing_bookings(user.user_id, property_id, &state.db_pool).await?,
    ))
}

pub fn router() -> Router {
    Router::new()
        .route("/api/listings/", get(list_listings).post(create_listing))
        .route("/api/listings/my_listings/", get(my_listings))
        .route(
            "/api/listings/:property_id/",
            get(get_listing)
                .put(update_listing)
                .patch(partial_update_listing)
                .delete(delete_listing),
        )
        .route("/api/listings/:property_id/reviews/", get(listing_reviews))
        .route("/api/listings/:property_id/add_review/", post(add_review))
        .route("/api/listings/:property_id/bookings/", get(listing_bookings))
}
