//! Listing management: filtering, host-only writes and review/booking views.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use crate::common::validation::{require_max_length, require_non_blank, require_present};
use crate::common::{ApiError, ListingId, OrderBy, UserId, ValidationErrors};
use crate::domains::bookings::actions::hydrate_bookings;
use crate::domains::bookings::data::BookingData;
use crate::domains::bookings::models::Booking;
use crate::domains::listings::data::{ListingData, ListingInput, ListingQuery};
use crate::domains::listings::models::{
    Listing, ListingChanges, ListingFilter, NewListing, DEFAULT_LISTING_ORDER, LISTING_ORDERING,
};
use crate::domains::reviews::actions::{hydrate_reviews, validate_review, write_review, ALREADY_REVIEWED};
use crate::domains::reviews::data::{AddReviewInput, ReviewData};
use crate::domains::reviews::models::{average_rating, Review};
use crate::domains::users::data::UserData;
use crate::domains::users::models::User;

const MAX_PRICE_DIGITS: u32 = 10;
const PRICE_DECIMAL_PLACES: u32 = 2;

fn parse_decimal(errors: &mut ValidationErrors, field: &str, raw: Option<&str>) -> Option<Decimal> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match Decimal::from_str(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(field, "Enter a number.");
            None
        }
    }
}

/// Turn query parameters into a filter and a whitelisted ordering.
pub fn parse_listing_query(query: &ListingQuery) -> Result<(ListingFilter, OrderBy), ApiError> {
    let mut errors = ValidationErrors::new();

    let filter = ListingFilter {
        location: query.location.clone().filter(|l| !l.is_empty()),
        price_per_night: parse_decimal(&mut errors, "price_per_night", query.price_per_night.as_deref()),
        min_price: parse_decimal(&mut errors, "min_price", query.min_price.as_deref()),
        max_price: parse_decimal(&mut errors, "max_price", query.max_price.as_deref()),
        search: query.search.clone(),
        host_id: None,
    };
    errors.into_result()?;

    let order = OrderBy::parse(query.ordering.as_deref(), LISTING_ORDERING, DEFAULT_LISTING_ORDER);
    Ok((filter, order))
}

pub fn validate_price(errors: &mut ValidationErrors, price: Decimal) {
    if price <= Decimal::ZERO {
        errors.add("price_per_night", "Price per night must be greater than 0");
        return;
    }

    let normalized = price.normalize();
    if normalized.scale() > PRICE_DECIMAL_PLACES {
        errors.add(
            "price_per_night",
            format!(
                "Ensure that there are no more than {} decimal places.",
                PRICE_DECIMAL_PLACES
            ),
        );
    }

    let max_whole = Decimal::from(10u64.pow(MAX_PRICE_DIGITS - PRICE_DECIMAL_PLACES));
    if normalized.trunc() >= max_whole {
        errors.add(
            "price_per_night",
            format!(
                "Ensure that there are no more than {} digits in total.",
                MAX_PRICE_DIGITS
            ),
        );
    }
}

pub fn validate_listing_input(input: &ListingInput, partial: bool) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if !partial {
        require_present(&mut errors, "name", &input.name);
        require_present(&mut errors, "description", &input.description);
        require_present(&mut errors, "location", &input.location);
        require_present(&mut errors, "price_per_night", &input.price_per_night);
    }

    if let Some(name) = &input.name {
        require_non_blank(&mut errors, "name", name);
        require_max_length(&mut errors, "name", name, 150);
    }
    if let Some(description) = &input.description {
        require_non_blank(&mut errors, "description", description);
    }
    if let Some(location) = &input.location {
        require_non_blank(&mut errors, "location", location);
        require_max_length(&mut errors, "location", location, 255);
    }
    if let Some(price) = input.price_per_night {
        validate_price(&mut errors, price);
    }

    errors
}

/// Attach hosts and reviews to listings, preserving order.
pub async fn hydrate_listings(listings: Vec<Listing>, pool: &PgPool) -> Result<Vec<ListingData>, ApiError> {
    let listing_ids: Vec<ListingId> = listings.iter().map(|l| l.property_id).collect();
    let reviews = Review::find_by_listing_ids(&listing_ids, pool).await?;
    let reviews = hydrate_reviews(reviews, pool).await?;

    let mut reviews_by_listing: HashMap<ListingId, Vec<ReviewData>> = HashMap::new();
    for review in reviews {
        reviews_by_listing
            .entry(review.property_id)
            .or_default()
            .push(review);
    }

    let host_ids: Vec<UserId> = listings.iter().map(|l| l.host_id).collect();
    let hosts = User::find_by_ids(&host_ids, pool).await?;

    Ok(listings
        .into_iter()
        .filter_map(|listing| {
            let host = hosts.get(&listing.host_id)?.into();
            let reviews = reviews_by_listing
                .remove(&listing.property_id)
                .unwrap_or_default();
            Some(to_listing_data(listing, host, reviews))
        })
        .collect())
}

fn to_listing_data(listing: Listing, host: UserData, reviews: Vec<ReviewData>) -> ListingData {
    ListingData {
        property_id: listing.property_id,
        host,
        name: listing.name,
        description: listing.description,
        location: listing.location,
        price_per_night: listing.price_per_night,
        average_rating: average_rating(reviews.iter().map(|r| r.rating)),
        reviews_count: reviews.len() as i64,
        reviews,
        created_at: listing.created_at,
        updated_at: listing.updated_at,
    }
}

async fn hydrate_listing(listing: Listing, pool: &PgPool) -> Result<ListingData, ApiError> {
    hydrate_listings(vec![listing], pool)
        .await?
        .pop()
        .ok_or_else(ApiError::not_found)
}

pub async fn find_listing(property_id: ListingId, pool: &PgPool) -> Result<Listing, ApiError> {
    Listing::find_by_id(property_id, pool)
        .await?
        .ok_or_else(ApiError::not_found)
}

pub async fn list_listings(query: &ListingQuery, pool: &PgPool) -> Result<Vec<ListingData>, ApiError> {
    let (filter, order) = parse_listing_query(query)?;
    let listings = Listing::search(&filter, order, pool).await?;
    hydrate_listings(listings, pool).await
}

pub async fn listings_for_host(host_id: UserId, pool: &PgPool) -> Result<Vec<ListingData>, ApiError> {
    let listings = Listing::find_by_host(host_id, pool).await?;
    hydrate_listings(listings, pool).await
}

pub async fn get_listing(property_id: ListingId, pool: &PgPool) -> Result<ListingData, ApiError> {
    let listing = find_listing(property_id, pool).await?;
    hydrate_listing(listing, pool).await
}

pub async fn create_listing(
    host_id: UserId,
    input: ListingInput,
    pool: &PgPool,
) -> Result<ListingData, ApiError> {
    validate_listing_input(&input, false).into_result()?;

    let (Some(name), Some(description), Some(location), Some(price_per_night)) = (
        input.name,
        input.description,
        input.location,
        input.price_per_night,
    ) else {
        return Err(ValidationErrors::non_field("Incomplete listing").into());
    };

    let new_listing = NewListing::builder()
        .host_id(host_id)
        .name(name)
        .description(description)
        .location(location)
        .price_per_night(price_per_night)
        .build();

    let listing = Listing::insert(new_listing, pool).await?;
    info!(property_id = %listing.property_id, host_id = %host_id, "listing created");
    hydrate_listing(listing, pool).await
}

/// Listings can only be changed by their host.
async fn find_hosted_listing(actor_id: UserId, property_id: ListingId, pool: &PgPool) -> Result<Listing, ApiError> {
    let listing = find_listing(property_id, pool).await?;
    if listing.host_id != actor_id {
        return Err(ApiError::forbidden());
    }
    Ok(listing)
}

pub async fn update_listing(
    actor_id: UserId,
    property_id: ListingId,
    input: ListingInput,
    partial: bool,
    pool: &PgPool,
) -> Result<ListingData, ApiError> {
    find_hosted_listing(actor_id, property_id, pool).await?;
    validate_listing_input(&input, partial).into_result()?;

    let changes = ListingChanges {
        name: input.name,
        description: input.description,
        location: input.location,
        price_per_night: input.price_per_night,
    };

    let listing = Listing::update(property_id, changes, pool).await?;
    info!(property_id = %property_id, "listing updated");
    hydrate_listing(listing, pool).await
}

pub async fn delete_listing(actor_id: UserId, property_id: ListingId, pool: &PgPool) -> Result<(), ApiError> {
    find_hosted_listing(actor_id, property_id, pool).await?;
    Listing::delete(property_id, pool).await?;
    info!(property_id = %property_id, "listing deleted");
    Ok(())
}

pub async fn listing_reviews(property_id: ListingId, pool: &PgPool) -> Result<Vec<ReviewData>, ApiError> {
    find_listing(property_id, pool).await?;
    let reviews = Review::find_all(Some(property_id), pool).await?;
    hydrate_reviews(reviews, pool).await
}

pub async fn add_review(
    author_id: UserId,
    property_id: ListingId,
    input: AddReviewInput,
    pool: &PgPool,
) -> Result<ReviewData, ApiError> {
    find_listing(property_id, pool).await?;
    validate_review(input.rating, input.comment.as_deref(), false).into_result()?;

    let (Some(rating), Some(comment)) = (input.rating, input.comment) else {
        return Err(ValidationErrors::non_field("Incomplete review").into());
    };

    write_review(author_id, property_id, rating, &comment, pool)
        .await?
        .ok_or_else(|| ApiError::BadRequest(ALREADY_REVIEWED.to_string()))
}

pub async fn listing_bookings(
    actor_id: UserId,
    property_id: ListingId,
    pool: &PgPool,
) -> Result<Vec<BookingData>, ApiError> {
    let listing = find_listing(property_id, pool).await?;
    if listing.host_id != actor_id {
        return Err(ApiError::PermissionDenied(
            "Only the host can view all bookings for this property".to_string(),
        ));
    }

    let bookings = Booking::find_by_listing(property_id, pool).await?;
    hydrate_bookings(bookings, pool).await
}
