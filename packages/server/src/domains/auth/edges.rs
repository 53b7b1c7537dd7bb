use axum::extract::Extension;
use axum::routing::post;
use axum::{Json, Router};

use crate::common::ApiError;
use crate::domains::auth::actions;
use crate::domains::auth::data::{TokenRequest, TokenResponse};
use crate::server::app::AppState;
use crate::server::extract::ApiJson;

/// Exchange email and password for a bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/token/",
    tag = "auth",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Wrong credentials or inactive account"),
    )
)]
pub async fn obtain_token(
    Extension(state): Extension<AppState>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = actions::obtain_token(request, &state.jwt_service, &state.db_pool).await?;
    Ok(Json(token))
}

pub fn router() -> Router {
    Router::new().route("/api/auth/token/", post(obtain_token))
}
