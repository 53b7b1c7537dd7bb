use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use typed_builder::TypedBuilder;
use utoipa::ToSchema;

use crate::common::{BookingId, ListingId, OrderBy, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Rejected,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
        BookingStatus::Rejected,
    ];

    /// Whether a booking in this status holds its dates.
    pub fn blocks_availability(self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Invalid booking status: {}", s))
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Booking {
    pub booking_id: BookingId,
    pub listing_id: ListingId,
    /// Guest
    pub user_id: UserId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct NewBooking {
    #[builder(default = BookingId::new())]
    pub booking_id: BookingId,
    pub listing_id: ListingId,
    pub user_id: UserId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: Decimal,
    #[builder(default = BookingStatus::Pending)]
    pub status: BookingStatus,
}

/// Narrowing applied by `GET /api/bookings/`.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub listing_id: Option<ListingId>,
}

pub const BOOKING_ORDERING: &[(&str, &str)] = &[
    ("start_date", "b.start_date"),
    ("created_at", "b.created_at"),
];

pub const DEFAULT_BOOKING_ORDER: OrderBy = OrderBy::desc("b.created_at");

/// Number of nights between check-in and check-out.
pub fn nights(start_date: NaiveDate, end_date: NaiveDate) -> i64 {
    (end_date - start_date).num_days()
}

/// Largest amount a `NUMERIC(10, 2)` total can hold.
pub const MAX_TOTAL_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// `price_per_night × nights`, rounded to cents.
pub fn quote_total(price_per_night: Decimal, start_date: NaiveDate, end_date: NaiveDate) -> Decimal {
    (price_per_night * Decimal::from(nights(start_date, end_date))).round_dp(2)
}

impl Booking {
    pub fn duration_days(&self) -> i64 {
        nights(self.start_date, self.end_date)
    }

    pub async fn insert<'e, E>(new_booking: NewBooking, executor: E) -> Result<Self>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (booking_id, listing_id, user_id, start_date, end_date, total_price, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new_booking.booking_id)
        .bind(new_booking.listing_id)
        .bind(new_booking.user_id)
        .bind(new_booking.start_date)
        .bind(new_booking.end_date)
        .bind(new_booking.total_price)
        .bind(new_booking.status)
        .fetch_one(executor)
        .await?;
        Ok(booking)
    }

    pub async fn find_by_id(booking_id: BookingId, pool: &PgPool) -> Result<Option<Self>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(pool)
            .await?;
        Ok(booking)
    }

    /// Bookings the user made as guest or received as host of the listing.
    pub async fn find_visible_to(
        user_id: UserId,
        filter: &BookingFilter,
        order: OrderBy,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let sql = format!(
            r#"
            SELECT b.* FROM bookings b
            JOIN listings l ON l.property_id = b.listing_id
            WHERE (b.user_id = $1 OR l.host_id = $1)
              AND ($2::booking_status IS NULL OR b.status = $2)
              AND ($3::uuid IS NULL OR b.listing_id = $3)
            ORDER BY {}
            "#,
            order.to_sql("b.booking_id")
        );

        let bookings = sqlx::query_as::<_, Booking>(&sql)
            .bind(user_id)
            .bind(filter.status)
            .bind(filter.listing_id)
            .fetch_all(pool)
            .await?;
        Ok(bookings)
    }

    pub async fn find_by_guest(user_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at DESC, booking_id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(bookings)
    }

    pub async fn find_by_host(host_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT b.* FROM bookings b
            JOIN listings l ON l.property_id = b.listing_id
            WHERE l.host_id = $1
            ORDER BY b.created_at DESC, b.booking_id
            "#,
        )
        .bind(host_id)
        .fetch_all(pool)
        .await?;
        Ok(bookings)
    }

    pub async fn find_by_listing(listing_id: ListingId, pool: &PgPool) -> Result<Vec<Self>> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE listing_id = $1 ORDER BY start_date, booking_id",
        )
        .bind(listing_id)
        .fetch_all(pool)
        .await?;
        Ok(bookings)
    }

    /// Whether an active booking of the listing overlaps `[start, end)`.
    /// Back-to-back stays (one ends the day the other starts) do not overlap.
    pub async fn has_overlap<'e, E>(
        listing_id: ListingId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        exclude: Option<BookingId>,
        executor: E,
    ) -> Result<bool>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let overlaps = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE listing_id = $1
                  AND status NOT IN ('cancelled', 'rejected')
                  AND start_date < $3
                  AND end_date > $2
                  AND ($4::uuid IS NULL OR booking_id <> $4)
            )
            "#,
        )
        .bind(listing_id)
        .bind(start_date)
        .bind(end_date)
        .bind(exclude)
        .fetch_one(executor)
        .await?;
        Ok(overlaps)
    }

    pub async fn update_dates<'e, E>(
        booking_id: BookingId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        total_price: Decimal,
        executor: E,
    ) -> Result<Self>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET start_date = $2, end_date = $3, total_price = $4
            WHERE booking_id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(start_date)
        .bind(end_date)
        .bind(total_price)
        .fetch_one(executor)
        .await?;
        Ok(booking)
    }

    /// Move to `status`. Returns `None` when the booking already had it.
    pub async fn transition(
        booking_id: BookingId,
        status: BookingStatus,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET status = $2
            WHERE booking_id = $1 AND status <> $2
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(status)
        .fetch_optional(pool)
        .await?;
        Ok(booking)
    }

    /// Move from `from` to `to`. Returns `None` when the booking is no longer in `from`.
    pub async fn transition_from<'e, E>(
        booking_id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        executor: E,
    ) -> Result<Option<Self>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET status = $3
            WHERE booking_id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(from)
        .bind(to)
        .fetch_optional(executor)
        .await?;
        Ok(booking)
    }

    pub async fn delete(booking_id: BookingId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_quote_total() {
        let price = Decimal::from_str("120.50").unwrap();
        assert_eq!(
            quote_total(price, date("2025-03-01"), date("2025-03-04")),
            Decimal::from_str("361.50").unwrap()
        );
    }

    #[test]
    fn test_max_total_matches_column_precision() {
        assert_eq!(MAX_TOTAL_PRICE, Decimal::from_str("99999999.99").unwrap());
    }

    #[test]
    fn test_nights_crosses_month_boundary() {
        assert_eq!(nights(date("2025-01-30"), date("2025-02-02")), 3);
    }

    #[test]
    fn test_cancelled_and_rejected_free_the_dates() {
        assert!(BookingStatus::Pending.blocks_availability());
        assert!(BookingStatus::Confirmed.blocks_availability());
        assert!(BookingStatus::Completed.blocks_availability());
        assert!(!BookingStatus::Cancelled.blocks_availability());
        assert!(!BookingStatus::Rejected.blocks_availability());
    }

    #[test]
    fn test_status_parsing() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(BookingStatus::from_str("archived").is_err());
    }
}
