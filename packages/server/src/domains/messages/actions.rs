use sqlx::PgPool;
use tracing::info;

use crate::common::validation::{require_non_blank, require_present};
use crate::common::{ApiError, MessageId, UserId, ValidationErrors};
use crate::domains::messages::data::{MessageData, MessageInput};
use crate::domains::messages::models::{Mailbox, Message};
use crate::domains::users::models::User;

pub async fn hydrate_messages(messages: Vec<Message>, pool: &PgPool) -> Result<Vec<MessageData>, ApiError> {
    let user_ids: Vec<UserId> = messages
        .iter()
        .flat_map(|m| [m.sender_id, m.recipient_id])
        .collect();
    let users = User::find_by_ids(&user_ids, pool).await?;

    Ok(messages
        .into_iter()
        .filter_map(|message| {
            let sender = users.get(&message.sender_id)?.into();
            let recipient = users.get(&message.recipient_id)?.into();
            Some(MessageData::new(message, sender, recipient))
        })
        .collect())
}

async fn hydrate_message(message: Message, pool: &PgPool) -> Result<MessageData, ApiError> {
    hydrate_messages(vec![message], pool)
        .await?
        .pop()
        .ok_or_else(ApiError::not_found)
}

pub async fn list_messages(actor_id: UserId, mailbox: Mailbox, pool: &PgPool) -> Result<Vec<MessageData>, ApiError> {
    let messages = Message::find_for_user(actor_id, mailbox, pool).await?;
    hydrate_messages(messages, pool).await
}

pub async fn send_message(sender_id: UserId, input: MessageInput, pool: &PgPool) -> Result<MessageData, ApiError> {
    let mut errors = ValidationErrors::new();
    require_present(&mut errors, "recipient_id", &input.recipient_id);
    require_present(&mut errors, "message_body", &input.message_body);
    if let Some(body) = &input.message_body {
        require_non_blank(&mut errors, "message_body", body);
    }
    if let Some(recipient_id) = input.recipient_id {
        if User::find_by_id(recipient_id, pool).await?.is_none() {
            errors.add("recipient_id", "Recipient not found");
        }
    }
    errors.into_result()?;

    let (Some(recipient_id), Some(body)) = (input.recipient_id, input.message_body) else {
        return Err(ApiError::not_found());
    };

    let message = Message::insert(sender_id, recipient_id, &body, pool).await?;
    info!(message_id = %message.message_id, sender_id = %sender_id, recipient_id = %recipient_id, "message sent");
    hydrate_message(message, pool).await
}

/// Messages outside the caller's conversations are reported as missing.
async fn find_own_message(actor_id: UserId, message_id: MessageId, pool: &PgPool) -> Result<Message, ApiError> {
    Message::find_by_id(message_id, pool)
        .await?
        .filter(|m| m.involves(actor_id))
        .ok_or_else(ApiError::not_found)
}

pub async fn get_message(actor_id: UserId, message_id: MessageId, pool: &PgPool) -> Result<MessageData, ApiError> {
    let message = find_own_message(actor_id, message_id, pool).await?;
    hydrate_message(message, pool).await
}

pub async fn delete_message(actor_id: UserId, message_id: MessageId, pool: &PgPool) -> Result<(), ApiError> {
    let message = find_own_message(actor_id, message_id, pool).await?;
    if message.sender_id != actor_id {
        return Err(ApiError::forbidden());
    }

    Message::delete(message_id, pool).await?;
    info!(message_id = %message_id, "message deleted");
    Ok(())
}
