//! Test fixtures for creating test data.
//!
//! These fixtures use the model methods directly to create test data.

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use travel_core::domains::auth::password::hash_password;
use travel_core::domains::bookings::models::{quote_total, Booking, BookingStatus, NewBooking};
use travel_core::domains::listings::models::{Listing, NewListing};
use travel_core::domains::users::models::{NewUser, User};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "password123";

/// A user with a unique username/email and password [`TEST_PASSWORD`].
pub async fn create_test_user(pool: &PgPool, first_name: &str) -> Result<User> {
    let suffix = Uuid::new_v4().simple().to_string();
    let username = format!("{}{}", first_name.to_lowercase(), &suffix[..12]);

    let new_user = NewUser::builder()
        .username(username.clone())
        .email(format!("{}@example.com", username))
        .first_name(first_name)
        .last_name("Tester")
        .phone_number(Some("+15550000000".to_string()))
        .password_hash(hash_password(TEST_PASSWORD)?)
        .build();

    User::insert(new_user, pool).await
}

pub async fn create_test_listing(pool: &PgPool, host: &User, price_per_night: i64) -> Result<Listing> {
    let new_listing = NewListing::builder()
        .host_id(host.user_id)
        .name("Beautiful Loft in Denver")
        .description("A wonderful loft located in the heart of Denver, CO.")
        .location("Denver, CO")
        .price_per_night(Decimal::from(price_per_night))
        .build();

    Listing::insert(new_listing, pool).await
}

pub async fn create_test_booking(
    pool: &PgPool,
    listing: &Listing,
    guest: &User,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: BookingStatus,
) -> Result<Booking> {
    let new_booking = NewBooking::builder()
        .listing_id(listing.property_id)
        .user_id(guest.user_id)
        .start_date(start_date)
        .end_date(end_date)
        .total_price(quote_total(listing.price_per_night, start_date, end_date))
        .status(status)
        .build();

    Booking::insert(new_booking, pool).await
}

/// `days` from today.
pub fn day(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}
