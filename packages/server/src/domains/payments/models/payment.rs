use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use typed_builder::TypedBuilder;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::{BookingId, PaymentId, PaymentMethodId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    Reversed,
}

impl PaymentStatus {
    /// Map a gateway transaction status onto ours.
    pub fn from_gateway(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "success" => PaymentStatus::Completed,
            "failed" | "failed/cancelled" | "cancelled" => PaymentStatus::Failed,
            "refunded" => PaymentStatus::Refunded,
            "reversed" => PaymentStatus::Reversed,
            _ => PaymentStatus::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Reversed => "reversed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub payment_status: PaymentStatus,
    /// Gateway-side reference
    pub transaction_id: Option<String>,
    /// Our `tx_ref`
    pub chapa_reference: Option<String>,
    pub payment_method_id: PaymentMethodId,
    pub payment_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct NewPayment {
    #[builder(default = PaymentId::new())]
    pub payment_id: PaymentId,
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub amount: Decimal,
    #[builder(setter(into))]
    pub currency: String,
    #[builder(default = PaymentStatus::Pending)]
    pub payment_status: PaymentStatus,
    #[builder(default)]
    pub transaction_id: Option<String>,
    #[builder(default)]
    pub chapa_reference: Option<String>,
    pub payment_method_id: PaymentMethodId,
}

/// `booking-{booking_id}-{8 hex chars}`
pub fn generate_tx_ref(booking_id: BookingId) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("booking-{}-{}", booking_id, &suffix[..8])
}

impl Payment {
    pub fn is_successful(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }

    pub async fn insert<'e, E>(new_payment: NewPayment, executor: E) -> Result<Self>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                payment_id, booking_id, user_id, amount, currency, payment_status,
                transaction_id, chapa_reference, payment_method_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(new_payment.payment_id)
        .bind(new_payment.booking_id)
        .bind(new_payment.user_id)
        .bind(new_payment.amount)
        .bind(new_payment.currency)
        .bind(new_payment.payment_status)
        .bind(new_payment.transaction_id)
        .bind(new_payment.chapa_reference)
        .bind(new_payment.payment_method_id)
        .fetch_one(executor)
        .await?;
        Ok(payment)
    }

    pub async fn find_by_id(payment_id: PaymentId, pool: &PgPool) -> Result<Option<Self>> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE payment_id = $1")
            .bind(payment_id)
            .fetch_optional(pool)
            .await?;
        Ok(payment)
    }

    pub async fn find_by_reference(tx_ref: &str, pool: &PgPool) -> Result<Option<Self>> {
        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE chapa_reference = $1")
                .bind(tx_ref)
                .fetch_optional(pool)
                .await?;
        Ok(payment)
    }

    pub async fn find_by_user(user_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE user_id = $1 ORDER BY payment_date DESC, payment_id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(payments)
    }

    pub async fn record_transaction_id(
        payment_id: PaymentId,
        transaction_id: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET transaction_id = $2, updated_at = NOW()
            WHERE payment_id = $1
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(transaction_id)
        .fetch_one(pool)
        .await?;
        Ok(payment)
    }

    /// Move to `status`. Returns `None` when the payment already had it, so
    /// concurrent callers observe each transition exactly once.
    pub async fn transition(
        payment_id: PaymentId,
        status: PaymentStatus,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET payment_status = $2, updated_at = NOW()
            WHERE payment_id = $1 AND payment_status <> $2
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(status)
        .fetch_optional(pool)
        .await?;
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_status_mapping() {
        let cases = [
            ("success", PaymentStatus::Completed),
            ("failed", PaymentStatus::Failed),
            ("failed/cancelled", PaymentStatus::Failed),
            ("cancelled", PaymentStatus::Failed),
            ("refunded", PaymentStatus::Refunded),
            ("reversed", PaymentStatus::Reversed),
            ("pending", PaymentStatus::Pending),
            ("something-new", PaymentStatus::Pending),
            ("", PaymentStatus::Pending),
        ];
        for (raw, expected) in cases {
            assert_eq!(PaymentStatus::from_gateway(raw), expected, "{}", raw);
        }
    }

    #[test]
    fn test_mapping_ignores_case() {
        assert_eq!(PaymentStatus::from_gateway("SUCCESS"), PaymentStatus::Completed);
    }

    #[test]
    fn test_tx_ref_format() {
        let booking_id = BookingId::new();
        let tx_ref = generate_tx_ref(booking_id);
        let prefix = format!("booking-{}-", booking_id);

        assert!(tx_ref.starts_with(&prefix));
        let suffix = &tx_ref[prefix.len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(tx_ref, generate_tx_ref(booking_id));
    }
}
