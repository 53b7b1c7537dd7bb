use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::common::{ApiError, ReviewId};
use crate::domains::reviews::actions;
use crate::domains::reviews::data::{ReviewData, ReviewInput, ReviewQuery};
use crate::server::app::AppState;
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::middleware::AuthUser;

#[utoipa::path(
    get,
    path = "/api/reviews/",
    tag = "reviews",
    params(ReviewQuery),
    responses((status = 200, body = [ReviewData]))
)]
pub async fn list_reviews(
    Extension(state): Extension<AppState>,
    ApiQuery(query): ApiQuery<ReviewQuery>,
) -> Result<Json<Vec<ReviewData>>, ApiError> {
    Ok(Json(actions::list_reviews(query.listing, &state.db_pool).await?))
}

#[utoipa::path(
    post,
    path = "/api/reviews/",
    tag = "reviews",
    request_body = ReviewInput,
    responses((status = 201, body = ReviewData), (status = 400), (status = 401)),
    security(("bearer" = []))
)]
pub async fn create_review(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<ReviewInput>,
) -> Result<(StatusCode, Json<ReviewData>), ApiError> {
    let review = actions::create_review(user.user_id, input, &state.db_pool).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[utoipa::path(
    get,
    path = "/api/reviews/{review_id}/",
    tag = "reviews",
    params(("review_id" = Uuid, Path)),
    responses((status = 200, body = ReviewData), (status = 404))
)]
pub async fn get_review(
    Extension(state): Extension<AppState>,
    ApiPath(review_id): ApiPath<ReviewId>,
) -> Result<Json<ReviewData>, ApiError> {
    Ok(Json(actions::get_review(review_id, &state.db_pool).await?))
}

#[utoipa::path(
    put,
    path = "/api/reviews/{review_id}/",
    tag = "reviews",
    params(("review_id" = Uuid, Path)),
    request_body = ReviewInput,
    responses((status = 200, body = ReviewData), (status = 400), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn update_review(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(review_id): ApiPath<ReviewId>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> Result<Json<ReviewData>, ApiError> {
    let review = actions::update_review(user.user_id, review_id, input, false, &state.db_pool).await?;
    Ok(Json(review))
}

#[utoipa::path(
    patch,
    path = "/api/reviews/{review_id}/",
    tag = "reviews",
    params(("review_id" = Uuid, Path)),
    request_body = ReviewInput,
    responses((status = 200, body = ReviewData), (status = 400), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn partial_update_review(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(review_id): ApiPath<ReviewId>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> Result<Json<ReviewData>, ApiError> {
    let review = actions::update_review(user.user_id, review_id, input, true, &state.db_pool).await?;
    Ok(Json(review))
}

#[utoipa::path(
    delete,
    path = "/api/reviews/{review_id}/",
    tag = "reviews",
    params(("review_id" = Uuid, Path)),
    responses((status = 204), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn delete_review(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(review_id): ApiPath<ReviewId>,
) -> Result<StatusCode, ApiError> {
    actions::delete_review(user.user_id, review_id, &state.db_pool).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router {
    Router::new()
        .route("/api/reviews/", get(list_reviews).post(create_review))
        .route(
            "/api/reviews/:review_id/",
            get(get_review)
                .put(update_review)
                .patch(partial_update_review)
                .delete(delete_review),
        )
}
