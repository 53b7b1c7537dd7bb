use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::common::{ListingId, ReviewId};
use crate::domains::reviews::models::Review;
use crate::domains::users::data::UserData;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewData {
    #[schema(value_type = Uuid)]
    pub review_id: ReviewId,
    #[schema(value_type = Uuid)]
    pub property_id: ListingId,
    pub user: UserData,
    #[schema(minimum = 1, maximum = 5)]
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl ReviewData {
    pub fn new(review: Review, user: UserData) -> Self {
        Self {
            review_id: review.review_id,
            property_id: review.listing_id,
            user,
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
        }
    }
}

/// Body of `POST /api/reviews/` and the update verbs.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReviewInput {
    /// Required on create, ignored on update
    #[schema(value_type = Option<Uuid>)]
    pub property_id: Option<ListingId>,
    #[schema(minimum = 1, maximum = 5)]
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

/// Body of `POST /api/listings/{property_id}/add_review/`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AddReviewInput {
    #[schema(minimum = 1, maximum = 5)]
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewQuery {
    /// Only reviews of this listing
    #[param(value_type = Option<Uuid>)]
    pub listing: Option<ListingId>,
}
