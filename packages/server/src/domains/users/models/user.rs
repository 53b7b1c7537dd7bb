use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use typed_builder::TypedBuilder;

use crate::common::UserId;

/// Account record. `password_hash` never leaves this module's callers
/// except through the auth actions.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct NewUser {
    #[builder(default = UserId::new())]
    pub user_id: UserId,
    #[builder(setter(into))]
    pub username: String,
    #[builder(setter(into))]
    pub email: String,
    #[builder(setter(into))]
    pub first_name: String,
    #[builder(setter(into))]
    pub last_name: String,
    #[builder(default)]
    pub phone_number: Option<String>,
    pub password_hash: String,
}

/// Profile fields to overwrite; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// `Some(None)` clears the phone number.
    pub phone_number: Option<Option<String>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub async fn insert<'e, E>(new_user: NewUser, executor: E) -> Result<Self>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, username, email, first_name, last_name, phone_number, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new_user.user_id)
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.first_name)
        .bind(new_user.last_name)
        .bind(new_user.phone_number)
        .bind(new_user.password_hash)
        .fetch_one(executor)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(user_id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    /// Whether `user_id` still exists and may sign in.
    pub async fn is_active_account(user_id: UserId, pool: &PgPool) -> Result<bool> {
        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1 AND is_active)",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(active)
    }

    /// Load several users at once, keyed by id. Missing ids are skipped.
    pub async fn find_by_ids(user_ids: &[UserId], pool: &PgPool) -> Result<HashMap<UserId, Self>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ANY($1)")
            .bind(user_ids)
            .fetch_all(pool)
            .await?;
        Ok(users.into_iter().map(|u| (u.user_id, u)).collect())
    }

    /// Case-insensitive lookup.
    pub async fn find_by_email<'e, E>(email: &str, executor: E) -> Result<Option<Self>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim())
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        let users =
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC, user_id")
                .fetch_all(pool)
                .await?;
        Ok(users)
    }

    /// Whether another account (other than `except`) already uses `email`.
    pub async fn email_taken(email: &str, except: Option<UserId>, pool: &PgPool) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR user_id <> $2)
            )
            "#,
        )
        .bind(email.trim())
        .bind(except)
        .fetch_one(pool)
        .await?;
        Ok(taken)
    }

    pub async fn username_taken<'e, E>(username: &str, executor: E) -> Result<bool>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let taken =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(executor)
                .await?;
        Ok(taken)
    }

    pub async fn update(user_id: UserId, changes: UserChanges, pool: &PgPool) -> Result<Self> {
        let clear_phone = matches!(changes.phone_number, Some(None));
        let phone = changes.phone_number.flatten();

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone_number = CASE WHEN $6 THEN NULL ELSE COALESCE($5, phone_number) END
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.email)
        .bind(phone)
        .bind(clear_phone)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }

    pub async fn delete(user_id: UserId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_builder_defaults() {
        let new_user = NewUser::builder()
            .username("jdoe")
            .email("jdoe@example.com")
            .first_name("John")
            .last_name("Doe")
            .password_hash("hash".to_string())
            .build();

        assert!(new_user.phone_number.is_none());
        assert!(!new_user.user_id.is_nil());
    }

    #[test]
    fn test_full_name_trims_missing_parts() {
        let user = User {
            user_id: UserId::new(),
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            first_name: "John".into(),
            last_name: String::new(),
            phone_number: None,
            password_hash: String::new(),
            is_active: true,
            created_at: Utc::now(),
        };
        assert_eq!(user.full_name(), "John");
    }
}
