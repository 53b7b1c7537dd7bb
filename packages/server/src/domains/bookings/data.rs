use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::common::{BookingId, ListingId, UserId};
use crate::domains::bookings::models::{Booking, BookingStatus};
use crate::domains::listings::models::Listing;
use crate::domains::users::data::UserData;

/// The part of a listing shown inside a booking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingPropertyData {
    #[schema(value_type = Uuid)]
    pub property_id: ListingId,
    pub name: String,
    pub location: String,
    #[schema(value_type = String, example = "120.00")]
    pub price_per_night: Decimal,
    #[schema(value_type = Uuid)]
    pub host_id: UserId,
}

impl From<&Listing> for BookingPropertyData {
    fn from(listing: &Listing) -> Self {
        Self {
            property_id: listing.property_id,
            name: listing.name.clone(),
            location: listing.location.clone(),
            price_per_night: listing.price_per_night,
            host_id: listing.host_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingData {
    #[schema(value_type = Uuid)]
    pub booking_id: BookingId,
    pub property: BookingPropertyData,
    /// Guest
    pub user: UserData,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[schema(value_type = String, example = "360.00")]
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub duration_days: i64,
    pub created_at: DateTime<Utc>,
}

impl BookingData {
    pub fn new(booking: Booking, property: BookingPropertyData, user: UserData) -> Self {
        Self {
            duration_days: booking.duration_days(),
            booking_id: booking.booking_id,
            property,
            user,
            start_date: booking.start_date,
            end_date: booking.end_date,
            total_price: booking.total_price,
            status: booking.status,
            created_at: booking.created_at,
        }
    }
}

/// Body of create and the update verbs. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BookingInput {
    /// Required on create, ignored on update
    #[schema(value_type = Option<Uuid>)]
    pub property_id: Option<ListingId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingQuery {
    pub status: Option<BookingStatus>,
    /// Only bookings of this listing
    #[param(value_type = Option<Uuid>)]
    pub listing: Option<ListingId>,
    /// `start_date` or `created_at`; prefix with `-` for descending
    pub ordering: Option<String>,
}
