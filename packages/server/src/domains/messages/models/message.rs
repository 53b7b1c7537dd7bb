use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::common::{MessageId, UserId};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub message_body: String,
    pub sent_at: DateTime<Utc>,
}

/// Which side of the conversation to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Mailbox {
    Inbox,
    Sent,
    #[default]
    All,
}

impl Message {
    pub async fn insert<'e, E>(
        sender_id: UserId,
        recipient_id: UserId,
        message_body: &str,
        executor: E,
    ) -> Result<Self>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (message_id, sender_id, recipient_id, message_body)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(MessageId::new())
        .bind(sender_id)
        .bind(recipient_id)
        .bind(message_body)
        .fetch_one(executor)
        .await?;
        Ok(message)
    }

    pub async fn find_by_id(message_id: MessageId, pool: &PgPool) -> Result<Option<Self>> {
        let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE message_id = $1")
            .bind(message_id)
            .fetch_optional(pool)
            .await?;
        Ok(message)
    }

    /// Newest first.
    pub async fn find_for_user(user_id: UserId, mailbox: Mailbox, pool: &PgPool) -> Result<Vec<Self>> {
        let (inbox, sent) = match mailbox {
            Mailbox::Inbox => (true, false),
            Mailbox::Sent => (false, true),
            Mailbox::All => (true, true),
        };

        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE ($2 AND recipient_id = $1) OR ($3 AND sender_id = $1)
            ORDER BY sent_at DESC, message_id
            "#,
        )
        .bind(user_id)
        .bind(inbox)
        .bind(sent)
        .fetch_all(pool)
        .await?;
        Ok(messages)
    }

    pub fn involves(&self, user_id: UserId) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }

    pub async fn delete(message_id: MessageId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE message_id = $1")
            .bind(message_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
