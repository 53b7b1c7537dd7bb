use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::common::ListingId;
use crate::domains::reviews::data::ReviewData;
use crate::domains::users::data::UserData;

/// Full listing representation with host, reviews and rating summary.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingData {
    #[schema(value_type = Uuid)]
    pub property_id: ListingId,
    pub host: UserData,
    pub name: String,
    pub description: String,
    pub location: String,
    /// Decimal string, e.g. `"120.00"`
    #[schema(value_type = String, example = "120.00")]
    pub price_per_night: Decimal,
    pub average_rating: f64,
    pub reviews_count: i64,
    pub reviews: Vec<ReviewData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of create (`POST`), replace (`PUT`) and partial update (`PATCH`).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListingInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[schema(value_type = Option<String>, example = "120.00")]
    pub price_per_night: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingQuery {
    /// Exact location match
    pub location: Option<String>,
    /// Exact nightly price
    pub price_per_night: Option<String>,
    /// Minimum nightly price (inclusive)
    pub min_price: Option<String>,
    /// Maximum nightly price (inclusive)
    pub max_price: Option<String>,
    /// Case-insensitive search over name, description and location
    pub search: Option<String>,
    /// One of `price_per_night`, `created_at`, `name`; prefix with `-` for descending
    pub ordering: Option<String>,
}
