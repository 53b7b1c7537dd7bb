use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::common::{ListingId, ReviewId, UserId};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Review {
    pub review_id: ReviewId,
    pub listing_id: ListingId,
    pub user_id: UserId,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

impl Review {
    pub async fn insert<'e, E>(
        listing_id: ListingId,
        user_id: UserId,
        rating: i32,
        comment: &str,
        executor: E,
    ) -> Result<Self>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (review_id, listing_id, user_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(ReviewId::new())
        .bind(listing_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(executor)
        .await?;
        Ok(review)
    }

    pub async fn find_by_id(review_id: ReviewId, pool: &PgPool) -> Result<Option<Self>> {
        let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE review_id = $1")
            .bind(review_id)
            .fetch_optional(pool)
            .await?;
        Ok(review)
    }

    /// Newest first, optionally narrowed to one listing.
    pub async fn find_all(listing_id: Option<ListingId>, pool: &PgPool) -> Result<Vec<Self>> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT * FROM reviews
            WHERE ($1::uuid IS NULL OR listing_id = $1)
            ORDER BY created_at DESC, review_id
            "#,
        )
        .bind(listing_id)
        .fetch_all(pool)
        .await?;
        Ok(reviews)
    }

    pub async fn find_by_listing_ids(listing_ids: &[ListingId], pool: &PgPool) -> Result<Vec<Self>> {
        if listing_ids.is_empty() {
            return Ok(Vec::new());
        }

        let reviews = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE listing_id = ANY($1) ORDER BY created_at DESC, review_id",
        )
        .bind(listing_ids)
        .fetch_all(pool)
        .await?;
        Ok(reviews)
    }

    pub async fn exists_for<'e, E>(listing_id: ListingId, user_id: UserId, executor: E) -> Result<bool>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE listing_id = $1 AND user_id = $2)",
        )
        .bind(listing_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn update(
        review_id: ReviewId,
        rating: Option<i32>,
        comment: Option<String>,
        pool: &PgPool,
    ) -> Result<Self> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET rating = COALESCE($2, rating),
                comment = COALESCE($3, comment)
            WHERE review_id = $1
            RETURNING *
            "#,
        )
        .bind(review_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(pool)
        .await?;
        Ok(review)
    }

    pub async fn delete(review_id: ReviewId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE review_id = $1")
            .bind(review_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Mean rating, `0.0` for an unreviewed listing.
pub fn average_rating(ratings: impl IntoIterator<Item = i32>) -> f64 {
    let (sum, count) = ratings
        .into_iter()
        .fold((0i64, 0i64), |(sum, count), r| (sum + r as i64, count + 1));

    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}
