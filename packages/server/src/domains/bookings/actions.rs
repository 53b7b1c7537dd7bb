//! Booking lifecycle: availability checks, pricing and guest/host permissions.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use crate::common::validation::require_present;
use crate::common::{ApiError, BookingId, ListingId, OrderBy, UserId, ValidationErrors};
use crate::domains::bookings::data::{BookingData, BookingInput, BookingQuery};
use crate::domains::bookings::models::{
    quote_total, Booking, BookingFilter, BookingStatus, NewBooking, BOOKING_ORDERING,
    DEFAULT_BOOKING_ORDER, MAX_TOTAL_PRICE,
};
use crate::domains::listings::models::Listing;
use crate::domains::notifications::{enqueue_email, SendBookingConfirmationEmail, SendBookingCreationEmail};
use crate::domains::users::models::User;
use crate::kernel::ServerDeps;

pub const END_BEFORE_START: &str = "End date must be after start date";
pub const PROPERTY_NOT_FOUND: &str = "Property not found";
pub const NOT_AVAILABLE: &str = "Property is not available for the selected dates";
pub const TOTAL_TOO_LARGE: &str = "Total price exceeds the maximum amount for a single booking";

pub fn validate_dates(start_date: NaiveDate, end_date: NaiveDate) -> Result<(), ApiError> {
    if end_date <= start_date {
        return Err(ValidationErrors::non_field(END_BEFORE_START).into());
    }
    Ok(())
}

/// Price the stay, refusing totals the ledger cannot store.
pub fn quote_checked(
    price_per_night: Decimal,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Decimal, ApiError> {
    let total = quote_total(price_per_night, start_date, end_date);
    if total > MAX_TOTAL_PRICE {
        return Err(ValidationErrors::non_field(TOTAL_TOO_LARGE).into());
    }
    Ok(total)
}

/// Attach listing summaries and guests to bookings, preserving order.
pub async fn hydrate_bookings(bookings: Vec<Booking>, pool: &PgPool) -> Result<Vec<BookingData>, ApiError> {
    let listing_ids: Vec<ListingId> = bookings.iter().map(|b| b.listing_id).collect();
    let user_ids: Vec<UserId> = bookings.iter().map(|b| b.user_id).collect();

    let listings = Listing::find_by_ids(&listing_ids, pool).await?;
    let users = User::find_by_ids(&user_ids, pool).await?;

    Ok(bookings
        .into_iter()
        .filter_map(|booking| {
            let property = listings.get(&booking.listing_id)?.into();
            let user = users.get(&booking.user_id)?.into();
            Some(BookingData::new(booking, property, user))
        })
        .collect())
}

async fn hydrate_booking(booking: Booking, pool: &PgPool) -> Result<BookingData, ApiError> {
    hydrate_bookings(vec![booking], pool)
        .await?
        .pop()
        .ok_or_else(ApiError::not_found)
}

/// A booking together with its listing's host.
struct VisibleBooking {
    booking: Booking,
    host_id: UserId,
}

impl VisibleBooking {
    fn is_guest(&self, user_id: UserId) -> bool {
        self.booking.user_id == user_id
    }

    fn is_host(&self, user_id: UserId) -> bool {
        self.host_id == user_id
    }
}

/// Bookings outside the caller's guest/host scope are reported as missing.
async fn find_visible(actor_id: UserId, booking_id: BookingId, pool: &PgPool) -> Result<VisibleBooking, ApiError> {
    let booking = Booking::find_by_id(booking_id, pool)
        .await?
        .ok_or_else(ApiError::not_found)?;
    let listing = Listing::find_by_id(booking.listing_id, pool)
        .await?
        .ok_or_else(ApiError::not_found)?;

    let visible = VisibleBooking {
        booking,
        host_id: listing.host_id,
    };
    if !visible.is_guest(actor_id) && !visible.is_host(actor_id) {
        return Err(ApiError::not_found());
    }
    Ok(visible)
}

pub async fn list_bookings(
    actor_id: UserId,
    query: &BookingQuery,
    pool: &PgPool,
) -> Result<Vec<BookingData>, ApiError> {
    let filter = BookingFilter {
        status: query.status,
        listing_id: query.listing,
    };
    let order = OrderBy::parse(query.ordering.as_deref(), BOOKING_ORDERING, DEFAULT_BOOKING_ORDER);

    let bookings = Booking::find_visible_to(actor_id, &filter, order, pool).await?;
    hydrate_bookings(bookings, pool).await
}

pub async fn my_bookings(actor_id: UserId, pool: &PgPool) -> Result<Vec<BookingData>, ApiError> {
    let bookings = Booking::find_by_guest(actor_id, pool).await?;
    hydrate_bookings(bookings, pool).await
}

pub async fn hosting_bookings(actor_id: UserId, pool: &PgPool) -> Result<Vec<BookingData>, ApiError> {
    let bookings = Booking::find_by_host(actor_id, pool).await?;
    hydrate_bookings(bookings, pool).await
}

/// Bookings made by `user_id`; only visible to that user.
pub async fn bookings_for_guest(
    actor_id: UserId,
    user_id: UserId,
    pool: &PgPool,
) -> Result<Vec<BookingData>, ApiError> {
    User::find_by_id(user_id, pool)
        .await?
        .ok_or_else(ApiError::not_found)?;
    if actor_id != user_id {
        return Err(ApiError::forbidden());
    }
    my_bookings(user_id, pool).await
}

pub async fn get_booking(actor_id: UserId, booking_id: BookingId, pool: &PgPool) -> Result<BookingData, ApiError> {
    let visible = find_visible(actor_id, booking_id, pool).await?;
    hydrate_booking(visible.booking, pool).await
}

pub async fn create_booking(
    guest_id: UserId,
    input: BookingInput,
    deps: &ServerDeps,
) -> Result<BookingData, ApiError> {
    let pool = &deps.db_pool;

    let mut errors = ValidationErrors::new();
    require_present(&mut errors, "property_id", &input.property_id);
    require_present(&mut errors, "start_date", &input.start_date);
    require_present(&mut errors, "end_date", &input.end_date);
    errors.into_result()?;

    let (Some(property_id), Some(start_date), Some(end_date)) =
        (input.property_id, input.start_date, input.end_date)
    else {
        return Err(ApiError::not_found());
    };

    validate_dates(start_date, end_date)?;

    let mut tx = pool.begin().await?;

    let listing = Listing::lock_for_update(property_id, &mut tx)
        .await?
        .ok_or_else(|| ValidationErrors::non_field(PROPERTY_NOT_FOUND))?;

    if Booking::has_overlap(property_id, start_date, end_date, None, &mut *tx).await? {
        return Err(ValidationErrors::non_field(NOT_AVAILABLE).into());
    }

    let total_price = quote_checked(listing.price_per_night, start_date, end_date)?;

    let new_booking = NewBooking::builder()
        .listing_id(property_id)
        .user_id(guest_id)
        .start_date(start_date)
        .end_date(end_date)
        .total_price(total_price)
        .build();

    let booking = Booking::insert(new_booking, &mut *tx).await?;
    tx.commit().await?;

    info!(
        booking_id = %booking.booking_id,
        property_id = %property_id,
        guest_id = %guest_id,
        total_price = %booking.total_price,
        "booking created"
    );

    enqueue_email(
        deps.job_queue.as_ref(),
        SendBookingCreationEmail {
            booking_id: booking.booking_id,
        },
    )
    .await;

    hydrate_booking(booking, pool).await
}

/// Guests may move their stay; availability and price are re-evaluated.
pub async fn update_booking(
    actor_id: UserId,
    booking_id: BookingId,
    input: BookingInput,
    partial: bool,
    pool: &PgPool,
) -> Result<BookingData, ApiError> {
    let visible = find_visible(actor_id, booking_id, pool).await?;
    if !visible.is_guest(actor_id) {
        return Err(ApiError::forbidden());
    }

    if !partial {
        let mut errors = ValidationErrors::new();
        require_present(&mut errors, "start_date", &input.start_date);
        require_present(&mut errors, "end_date", &input.end_date);
        errors.into_result()?;
    }

    let current = visible.booking;
    let start_date = input.start_date.unwrap_or(current.start_date);
    let end_date = input.end_date.unwrap_or(current.end_date);
    validate_dates(start_date, end_date)?;

    let mut tx = pool.begin().await?;

    let listing = Listing::lock_for_update(current.listing_id, &mut tx)
        .await?
        .ok_or_else(|| ValidationErrors::non_field(PROPERTY_NOT_FOUND))?;

    if current.status.blocks_availability()
        && Booking::has_overlap(
            current.listing_id,
            start_date,
            end_date,
            Some(booking_id),
            &mut *tx,
        )
        .await?
    {
        return Err(ValidationErrors::non_field(NOT_AVAILABLE).into());
    }

    let total_price = quote_checked(listing.price_per_night, start_date, end_date)?;
    let booking = Booking::update_dates(booking_id, start_date, end_date, total_price, &mut *tx).await?;
    tx.commit().await?;

    info!(booking_id = %booking_id, %start_date, %end_date, "booking dates changed");
    hydrate_booking(booking, pool).await
}

pub async fn delete_booking(actor_id: UserId, booking_id: BookingId, pool: &PgPool) -> Result<(), ApiError> {
    let visible = find_visible(actor_id, booking_id, pool).await?;
    if !visible.is_guest(actor_id) {
        return Err(ApiError::forbidden());
    }

    Booking::delete(booking_id, pool).await?;
    info!(booking_id = %booking_id, "booking deleted");
    Ok(())
}

/// Only pending bookings can be confirmed; the dates are re-checked under
/// the listing lock before they start blocking availability.
pub async fn confirm_booking(
    actor_id: UserId,
    booking_id: BookingId,
    deps: &ServerDeps,
) -> Result<BookingData, ApiError> {
    let pool = &deps.db_pool;
    let visible = find_visible(actor_id, booking_id, pool).await?;
    if !visible.is_host(actor_id) {
        return Err(ApiError::PermissionDenied(
            "Only the host can confirm bookings".to_string(),
        ));
    }

    let current = visible.booking;
    match current.status {
        BookingStatus::Confirmed => return hydrate_booking(current, pool).await,
        BookingStatus::Pending => {}
        status => {
            return Err(ApiError::BadRequest(format!(
                "Cannot confirm a {} booking",
                status
            )))
        }
    }

    let mut tx = pool.begin().await?;

    Listing::lock_for_update(current.listing_id, &mut tx)
        .await?
        .ok_or_else(|| ValidationErrors::non_field(PROPERTY_NOT_FOUND))?;

    if Booking::has_overlap(
        current.listing_id,
        current.start_date,
        current.end_date,
        Some(booking_id),
        &mut *tx,
    )
    .await?
    {
        return Err(ValidationErrors::non_field(NOT_AVAILABLE).into());
    }

    let confirmed = Booking::transition_from(
        booking_id,
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        &mut *tx,
    )
    .await?;
    tx.commit().await?;

    let booking = match confirmed {
        Some(booking) => {
            info!(booking_id = %booking_id, "booking confirmed");
            enqueue_email(
                deps.job_queue.as_ref(),
                SendBookingConfirmationEmail { booking_id },
            )
            .await;
            booking
        }
        // Changed concurrently; report what is stored now
        None => Booking::find_by_id(booking_id, pool)
            .await?
            .ok_or_else(ApiError::not_found)?,
    };

    hydrate_booking(booking, pool).await
}

pub async fn cancel_booking(actor_id: UserId, booking_id: BookingId, pool: &PgPool) -> Result<BookingData, ApiError> {
    // Guest or host; anyone else already got a 404
    let visible = find_visible(actor_id, booking_id, pool).await?;

    let booking = match Booking::transition(booking_id, BookingStatus::Cancelled, pool).await? {
        Some(booking) => {
            info!(booking_id = %booking_id, cancelled_by = %actor_id, "booking cancelled");
            booking
        }
        None => visible.booking,
    };

    hydrate_booking(booking, pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_end_must_follow_start() {
        assert!(validate_dates(date("2025-01-01"), date("2025-01-02")).is_ok());

        for (start, end) in [("2025-01-02", "2025-01-02"), ("2025-01-03", "2025-01-02")] {
            match validate_dates(date(start), date(end)) {
                Err(ApiError::Validation(errors)) => assert_eq!(
                    errors.field(crate::common::NON_FIELD_ERRORS),
                    Some(&[END_BEFORE_START.to_string()][..])
                ),
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_quote_rejects_totals_beyond_column_precision() {
        let top_price = MAX_TOTAL_PRICE;
        assert_eq!(
            quote_checked(top_price, date("2025-01-01"), date("2025-01-02")).unwrap(),
            top_price
        );

        match quote_checked(top_price, date("2025-01-01"), date("2025-01-03")) {
            Err(ApiError::Validation(errors)) => assert_eq!(
                errors.field(crate::common::NON_FIELD_ERRORS),
                Some(&[TOTAL_TOO_LARGE.to_string()][..])
            ),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_guest_and_host_roles() {
        let guest = UserId::new();
        let host = UserId::new();
        let visible = VisibleBooking {
            booking: Booking {
                booking_id: BookingId::new(),
                listing_id: ListingId::new(),
                user_id: guest,
                start_date: date("2025-01-01"),
                end_date: date("2025-01-03"),
                total_price: rust_decimal::Decimal::new(20000, 2),
                status: BookingStatus::Pending,
                created_at: chrono::Utc::now(),
            },
            host_id: host,
        };

        assert!(visible.is_guest(guest));
        assert!(!visible.is_host(guest));
        assert!(visible.is_host(host));
        assert!(!visible.is_guest(UserId::new()));
    }
}
