use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::common::PaymentMethodId;

pub const DEFAULT_PAYMENT_METHOD: &str = "chapa";

/// Lookup row naming how a payment was made.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentMethod {
    pub method_id: PaymentMethodId,
    pub method_name: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentMethod {
    /// Return the method with this name, creating it on first use.
    pub async fn get_or_create<'e, E>(method_name: &str, executor: E) -> Result<Self>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let method = sqlx::query_as::<_, PaymentMethod>(
            r#"
            INSERT INTO payment_methods (method_id, method_name)
            VALUES ($1, $2)
            ON CONFLICT (method_name) DO UPDATE SET method_name = EXCLUDED.method_name
            RETURNING *
            "#,
        )
        .bind(PaymentMethodId::new())
        .bind(method_name)
        .fetch_one(executor)
        .await?;
        Ok(method)
    }

    pub async fn find_by_ids(method_ids: &[PaymentMethodId], pool: &PgPool) -> Result<Vec<Self>> {
        let methods = sqlx::query_as::<_, PaymentMethod>(
            "SELECT * FROM payment_methods WHERE method_id = ANY($1)",
        )
        .bind(method_ids)
        .fetch_all(pool)
        .await?;
        Ok(methods)
    }
}
