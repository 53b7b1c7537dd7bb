use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::common::{ApiError, UserId};
use crate::domains::bookings::actions as booking_actions;
use crate::domains::bookings::data::BookingData;
use crate::domains::listings::actions as listing_actions;
use crate::domains::listings::data::ListingData;
use crate::domains::users::actions;
use crate::domains::users::data::{RegisterUserInput, UpdateUserInput, UserData};
use crate::server::app::AppState;
use crate::server::extract::{ApiJson, ApiPath};
use crate::server::middleware::AuthUser;

/// Register a new account.
#[utoipa::path(
    post,
    path = "/api/users/",
    tag = "users",
    request_body = RegisterUserInput,
    responses(
        (status = 201, description = "Account created", body = UserData),
        (status = 400, description = "Validation failed"),
    )
)]
pub async fn register(
    Extension(state): Extension<AppState>,
    ApiJson(input): ApiJson<RegisterUserInput>,
) -> Result<(StatusCode, Json<UserData>), ApiError> {
    let user = actions::register_user(input, &state.db_pool).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    get,
    path = "/api/users/",
    tag = "users",
    responses((status = 200, body = [UserData]), (status = 401)),
    security(("bearer" = []))
)]
pub async fn list_users(
    Extension(state): Extension<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<UserData>>, ApiError> {
    let users = actions::list_users(&state.db_pool).await?;
    Ok(Json(users.into_iter().map(UserData::from).collect()))
}

/// The signed-in account.
#[utoipa::path(
    get,
    path = "/api/users/me/",
    tag = "users",
    responses((status = 200, body = UserData), (status = 401)),
    security(("bearer" = []))
)]
pub async fn me(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> Result<Json<UserData>, ApiError> {
    let user = actions::get_user(user.user_id, &state.db_pool).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/",
    tag = "users",
    params(("user_id" = Uuid, Path)),
    responses((status = 200, body = UserData), (status = 401), (status = 404)),
    security(("bearer" = []))
)]
pub async fn get_user(
    Extension(state): Extension<AppState>,
    _user: AuthUser,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<UserData>, ApiError> {
    let user = actions::get_user(user_id, &state.db_pool).await?;
    Ok(Json(user.into()))
}

/// Replace the caller's profile.
#[utoipa::path(
    put,
    path = "/api/users/{user_id}/",
    tag = "users",
    params(("user_id" = Uuid, Path)),
    request_body = UpdateUserInput,
    responses((status = 200, body = UserData), (status = 400), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn update_user(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<UserId>,
    ApiJson(input): ApiJson<UpdateUserInput>,
) -> Result<Json<UserData>, ApiError> {
    let updated = actions::update_user(user.user_id, user_id, input, false, &state.db_pool).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    patch,
    path = "/api/users/{user_id}/",
    tag = "users",
    params(("user_id" = Uuid, Path)),
    request_body = UpdateUserInput,
    responses((status = 200, body = UserData), (status = 400), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn partial_update_user(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<UserId>,
    ApiJson(input): ApiJson<UpdateUserInput>,
) -> Result<Json<UserData>, ApiError> {
    let updated = actions::update_user(user.user_id, user_id, input, true, &state.db_pool).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/users/{user_id}/",
    tag = "users",
    params(("user_id" = Uuid, Path)),
    responses((status = 204), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn delete_user(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<StatusCode, ApiError> {
    actions::delete_user(user.user_id, user_id, &state.db_pool).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Listings hosted by the user.
#[utoipa::path(
    get,
    path = "/api/users/{user_id}/listings/",
    tag = "users",
    params(("user_id" = Uuid, Path)),
    responses((status = 200, body = [ListingData]), (status = 401), (status = 404)),
    security(("bearer" = []))
)]
pub async fn user_listings(
    Extension(state): Extension<AppState>,
    _user: AuthUser,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<Vec<ListingData>>, ApiError> {
    actions::get_user(user_id, &state.db_pool).await?;
    let listings = listing_actions::listings_for_host(user_id, &state.db_pool).await?;
    Ok(Json(listings))
}

/// Bookings made by the user. Only the user may see them.
#[utoipa::path(
    get,
    path = "/api/users/{user_id}/bookings/",
    tag = "users",
    params(("user_id" = Uuid, Path)),
    responses((status = 200, body = [BookingData]), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn user_bookings(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<Vec<BookingData>>, ApiError> {
    let bookings = booking_actions::bookings_for_guest(user.user_id, user_id, &state.db_pool).await?;
    Ok(Json(bookings))
}

pub fn router() -> Router {
    Router::new()
        .route("/api/users/", get(list_users).post(register))
        .route("/api/users/me/", get(me))
        .route(
            "/api/users/:user_id/",
            get(get_user)
                .put(update_user)
                .patch(partial_update_user)
                .delete(delete_user),
        )
        .route("/api/users/:user_id/listings/", get(user_listings))
        .route("/api/users/:user_id/bookings/", get(user_bookings))
}
