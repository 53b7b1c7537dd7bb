use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::common::{MessageId, UserId};
use crate::domains::messages::models::{Mailbox, Message};
use crate::domains::users::data::UserData;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageData {
    #[schema(value_type = Uuid)]
    pub message_id: MessageId,
    pub sender: UserData,
    pub recipient: UserData,
    pub message_body: String,
    pub sent_at: DateTime<Utc>,
}

impl MessageData {
    pub fn new(message: Message, sender: UserData, recipient: UserData) -> Self {
        Self {
            message_id: message.message_id,
            sender,
            recipient,
            message_body: message.message_body,
            sent_at: message.sent_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MessageInput {
    #[schema(value_type = Option<Uuid>)]
    pub recipient_id: Option<UserId>,
    pub message_body: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessageQuery {
    /// `inbox`, `sent` or `all` (default)
    #[serde(rename = "box", default)]
    #[param(inline)]
    pub mailbox: Mailbox,
}
