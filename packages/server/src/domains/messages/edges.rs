use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::common::{ApiError, MessageId};
use crate::domains::messages::actions;
use crate::domains::messages::data::{MessageData, MessageInput, MessageQuery};
use crate::server::app::AppState;
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::middleware::AuthUser;

#[utoipa::path(
    get,
    path = "/api/messages/",
    tag = "messages",
    params(MessageQuery),
    responses((status = 200, body = [MessageData]), (status = 401)),
    security(("bearer" = []))
)]
pub async fn list_messages(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<MessageQuery>,
) -> Result<Json<Vec<MessageData>>, ApiError> {
    Ok(Json(
        actions::list_messages(user.user_id, query.mailbox, &state.db_pool).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/messages/",
    tag = "messages",
    request_body = MessageInput,
    responses((status = 201, body = MessageData), (status = 400), (status = 401)),
    security(("bearer" = []))
)]
pub async fn send_message(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<MessageInput>,
) -> Result<(StatusCode, Json<MessageData>), ApiError> {
    let message = actions::send_message(user.user_id, input, &state.db_pool).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[utoipa::path(
    get,
    path = "/api/messages/{message_id}/",
    tag = "messages",
    params(("message_id" = Uuid, Path)),
    responses((status = 200, body = MessageData), (status = 404)),
    security(("bearer" = []))
)]
pub async fn get_message(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(message_id): ApiPath<MessageId>,
) -> Result<Json<MessageData>, ApiError> {
    Ok(Json(
        actions::get_message(user.user_id, message_id, &state.db_pool).await?,
    ))
}

/// Only the sender may delete a message.
#[utoipa::path(
    delete,
    path = "/api/messages/{message_id}/",
    tag = "messages",
    params(("message_id" = Uuid, Path)),
    responses((status = 204), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
pub async fn delete_message(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiPath(message_id): ApiPath<MessageId>,
) -> Result<StatusCode, ApiError> {
    actions::delete_message(user.user_id, message_id, &state.db_pool).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router {
    Router::new()
        .route("/api/messages/", get(list_messages).post(send_message))
        .route(
            "/api/messages/:message_id/",
            get(get_message).delete(delete_message),
        )
}
