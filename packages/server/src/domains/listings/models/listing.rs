use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use typed_builder::TypedBuilder;

use crate::common::{ListingId, OrderBy, UserId};

/// A property offered for booking.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Listing {
    pub property_id: ListingId,
    pub host_id: UserId,
    pub name: String,
    pub description: String,
    pub location: String,
    pub price_per_night: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct NewListing {
    #[builder(default = ListingId::new())]
    pub property_id: ListingId,
    pub host_id: UserId,
    #[builder(setter(into))]
    pub name: String,
    #[builder(setter(into))]
    pub description: String,
    #[builder(setter(into))]
    pub location: String,
    pub price_per_night: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct ListingChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price_per_night: Option<Decimal>,
}

/// Narrowing applied by `GET /api/listings/`. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub location: Option<String>,
    pub price_per_night: Option<Decimal>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Case-insensitive substring over name, description and location
    pub search: Option<String>,
    pub host_id: Option<UserId>,
}

/// Public `ordering` names and the columns they sort on.
pub const LISTING_ORDERING: &[(&str, &str)] = &[
    ("price_per_night", "price_per_night"),
    ("created_at", "created_at"),
    ("name", "name"),
];

pub const DEFAULT_LISTING_ORDER: OrderBy = OrderBy::desc("created_at");

/// Escape LIKE metacharacters and wrap in `%...%`.
pub fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl Listing {
    pub async fn insert<'e, E>(new_listing: NewListing, executor: E) -> Result<Self>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let listing = sqlx::query_as::<_, Listing>(
            r#"
            INSERT INTO listings (property_id, host_id, name, description, location, price_per_night)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new_listing.property_id)
        .bind(new_listing.host_id)
        .bind(new_listing.name)
        .bind(new_listing.description)
        .bind(new_listing.location)
        .bind(new_listing.price_per_night)
        .fetch_one(executor)
        .await?;
        Ok(listing)
    }

    pub async fn find_by_id(property_id: ListingId, pool: &PgPool) -> Result<Option<Self>> {
        let listing = sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE property_id = $1")
            .bind(property_id)
            .fetch_optional(pool)
            .await?;
        Ok(listing)
    }

    /// Row-lock the listing until the transaction ends, serializing
    /// availability checks for it.
    pub async fn lock_for_update(
        property_id: ListingId,
        conn: &mut sqlx::PgConnection,
    ) -> Result<Option<Self>> {
        let listing = sqlx::query_as::<_, Listing>(
            "SELECT * FROM listings WHERE property_id = $1 FOR UPDATE",
        )
        .bind(property_id)
        .fetch_optional(conn)
        .await?;
        Ok(listing)
    }

    pub async fn find_by_ids(
        property_ids: &[ListingId],
        pool: &PgPool,
    ) -> Result<HashMap<ListingId, Self>> {
        if property_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let listings =
            sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE property_id = ANY($1)")
                .bind(property_ids)
                .fetch_all(pool)
                .await?;
        Ok(listings.into_iter().map(|l| (l.property_id, l)).collect())
    }

    pub async fn search(filter: &ListingFilter, order: OrderBy, pool: &PgPool) -> Result<Vec<Self>> {
        let sql = format!(
            r#"
            SELECT * FROM listings
            WHERE ($1::text IS NULL OR location = $1)
              AND ($2::numeric IS NULL OR price_per_night = $2)
              AND ($3::numeric IS NULL OR price_per_night >= $3)
              AND ($4::numeric IS NULL OR price_per_night <= $4)
              AND ($5::text IS NULL
                   OR name ILIKE $5
                   OR description ILIKE $5
                   OR location ILIKE $5)
              AND ($6::uuid IS NULL OR host_id = $6)
            ORDER BY {}
            "#,
            order.to_sql("property_id")
        );

        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);

        let listings = sqlx::query_as::<_, Listing>(&sql)
            .bind(filter.location.as_deref())
            .bind(filter.price_per_night)
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(search)
            .bind(filter.host_id)
            .fetch_all(pool)
            .await?;
        Ok(listings)
    }

    pub async fn find_by_host(host_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        let filter = ListingFilter {
            host_id: Some(host_id),
            ..Default::default()
        };
        Self::search(&filter, DEFAULT_LISTING_ORDER, pool).await
    }

    pub async fn update(property_id: ListingId, changes: ListingChanges, pool: &PgPool) -> Result<Self> {
        let listing = sqlx::query_as::<_, Listing>(
            r#"
            UPDATE listings
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                price_per_night = COALESCE($5, price_per_night),
                updated_at = NOW()
            WHERE property_id = $1
            RETURNING *
            "#,
        )
        .bind(property_id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.location)
        .bind(changes.price_per_night)
        .fetch_one(pool)
        .await?;
        Ok(listing)
    }

    pub async fn delete(property_id: ListingId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM listings WHERE property_id = $1")
            .bind(property_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("beach"), "%beach%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_ordering_whitelist() {
        let order = OrderBy::parse(Some("-price_per_night"), LISTING_ORDERING, DEFAULT_LISTING_ORDER);
        assert_eq!(order, OrderBy::desc("price_per_night"));

        let order = OrderBy::parse(Some("host_id"), LISTING_ORDERING, DEFAULT_LISTING_ORDER);
        assert_eq!(order, DEFAULT_LISTING_ORDER);
    }
}
