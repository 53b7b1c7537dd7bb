use sqlx::PgPool;
use tracing::info;

use crate::common::validation::{require_non_blank, require_present};
use crate::common::{ApiError, ListingId, ReviewId, UserId, ValidationErrors};
use crate::domains::listings::models::Listing;
use crate::domains::reviews::data::{ReviewData, ReviewInput};
use crate::domains::reviews::models::{Review, MAX_RATING, MIN_RATING};
use crate::domains::users::models::User;

pub const ALREADY_REVIEWED: &str = "You have already reviewed this property";

pub fn validate_review(
    rating: Option<i32>,
    comment: Option<&str>,
    partial: bool,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if !partial {
        require_present(&mut errors, "rating", &rating);
        require_present(&mut errors, "comment", &comment);
    }

    match rating {
        Some(r) if r < MIN_RATING => errors.add(
            "rating",
            format!("Ensure this value is greater than or equal to {}.", MIN_RATING),
        ),
        Some(r) if r > MAX_RATING => errors.add(
            "rating",
            format!("Ensure this value is less than or equal to {}.", MAX_RATING),
        ),
        _ => {}
    }

    if let Some(comment) = comment {
        require_non_blank(&mut errors, "comment", comment);
    }

    errors
}

/// Attach authors to reviews, preserving order.
pub async fn hydrate_reviews(reviews: Vec<Review>, pool: &PgPool) -> Result<Vec<ReviewData>, ApiError> {
    let user_ids: Vec<UserId> = reviews.iter().map(|r| r.user_id).collect();
    let users = User::find_by_ids(&user_ids, pool).await?;

    Ok(reviews
        .into_iter()
        .filter_map(|review| {
            let user = users.get(&review.user_id)?.into();
            Some(ReviewData::new(review, user))
        })
        .collect())
}

async fn hydrate_review(review: Review, pool: &PgPool) -> Result<ReviewData, ApiError> {
    hydrate_reviews(vec![review], pool)
        .await?
        .pop()
        .ok_or_else(ApiError::not_found)
}

pub async fn list_reviews(listing_id: Option<ListingId>, pool: &PgPool) -> Result<Vec<ReviewData>, ApiError> {
    let reviews = Review::find_all(listing_id, pool).await?;
    hydrate_reviews(reviews, pool).await
}

pub async fn get_review(review_id: ReviewId, pool: &PgPool) -> Result<ReviewData, ApiError> {
    let review = find_review(review_id, pool).await?;
    hydrate_review(review, pool).await
}

async fn find_review(review_id: ReviewId, pool: &PgPool) -> Result<Review, ApiError> {
    Review::find_by_id(review_id, pool)
        .await?
        .ok_or_else(ApiError::not_found)
}

/// Insert a review for a listing already known to exist. Returns `None` when
/// the author has reviewed it before.
pub async fn write_review(
    author_id: UserId,
    listing_id: ListingId,
    rating: i32,
    comment: &str,
    pool: &PgPool,
) -> Result<Option<ReviewData>, ApiError> {
    if Review::exists_for(listing_id, author_id, pool).await? {
        return Ok(None);
    }

    let review = Review::insert(listing_id, author_id, rating, comment, pool).await?;
    info!(review_id = %review.review_id, listing_id = %listing_id, rating, "review created");
    hydrate_review(review, pool).await.map(Some)
}

pub async fn create_review(
    author_id: UserId,
    input: ReviewInput,
    pool: &PgPool,
) -> Result<ReviewData, ApiError> {
    let mut errors = validate_review(input.rating, input.comment.as_deref(), false);
    require_present(&mut errors, "property_id", &input.property_id);

    if let Some(property_id) = input.property_id {
        if Listing::find_by_id(property_id, pool).await?.is_none() {
            errors.add(
                "property_id",
                format!("Invalid pk \"{}\" - object does not exist.", property_id),
            );
        }
    }
    errors.into_result()?;

    let (Some(listing_id), Some(rating), Some(comment)) =
        (input.property_id, input.rating, input.comment)
    else {
        return Err(ApiError::not_found());
    };

    write_review(author_id, listing_id, rating, &comment, pool)
        .await?
        .ok_or_else(|| ValidationErrors::non_field(ALREADY_REVIEWED).into())
}

/// Reviews can only be changed by their author.
async fn find_own_review(actor_id: UserId, review_id: ReviewId, pool: &PgPool) -> Result<Review, ApiError> {
    let review = find_review(review_id, pool).await?;
    if review.user_id != actor_id {
        return Err(ApiError::forbidden());
    }
    Ok(review)
}

pub async fn update_review(
    actor_id: UserId,
    review_id: ReviewId,
    input: ReviewInput,
    partial: bool,
    pool: &PgPool,
) -> Result<ReviewData, ApiError> {
    find_own_review(actor_id, review_id, pool).await?;
    validate_review(input.rating, input.comment.as_deref(), partial).into_result()?;

    let review = Review::update(review_id, input.rating, input.comment, pool).await?;
    info!(review_id = %review_id, "review updated");
    hydrate_review(review, pool).await
}

pub async fn delete_review(actor_id: UserId, review_id: ReviewId, pool: &PgPool) -> Result<(), ApiError> {
    find_own_review(actor_id, review_id, pool).await?;
    Review::delete(review_id, pool).await?;
    info!(review_id = %review_id, "review deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(validate_review(Some(1), Some("ok"), false).is_empty());
        assert!(validate_review(Some(5), Some("ok"), false).is_empty());

        let errors = validate_review(Some(0), Some("ok"), false);
        assert_eq!(
            errors.field("rating"),
            Some(&["Ensure this value is greater than or equal to 1.".to_string()][..])
        );

        let errors = validate_review(Some(6), Some("ok"), false);
        assert_eq!(
            errors.field("rating"),
            Some(&["Ensure this value is less than or equal to 5.".to_string()][..])
        );
    }

    #[test]
    fn test_full_write_requires_fields() {
        let errors = validate_review(None, None, false);
        assert!(errors.field("rating").is_some());
        assert!(errors.field("comment").is_some());
    }

    #[test]
    fn test_partial_write_checks_only_given_fields() {
        assert!(validate_review(None, None, true).is_empty());
        assert!(validate_review(None, Some("  "), true).field("comment").is_some());
    }
}
