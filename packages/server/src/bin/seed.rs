//! Fill the database with sample users, listings, bookings, reviews,
//! payments and messages.
//!
//! ```text
//! cargo run --bin seed -- --users 20 --listings 50 --bookings 100 --clear
//! ```

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgConnection;
use travel_core::domains::auth::password::hash_password;
use travel_core::domains::bookings::models::{quote_total, Booking, BookingStatus, NewBooking};
use travel_core::domains::listings::models::{Listing, NewListing};
use travel_core::domains::messages::models::Message;
use travel_core::domains::payments::models::{
    NewPayment, Payment, PaymentMethod, PaymentStatus, DEFAULT_PAYMENT_METHOD,
};
use travel_core::domains::reviews::models::Review;
use travel_core::domains::users::models::{NewUser, User};
use travel_core::Config;

const PAYMENT_METHODS: &[&str] = &["credit_card", "debit_card", "paypal", "bank_transfer", "cash"];

const FIRST_NAMES: &[&str] = &[
    "John", "Jane", "Michael", "Sarah", "David", "Emma", "James", "Emily", "Robert", "Jessica",
    "William", "Ashley", "Christopher", "Amanda", "Matthew", "Jennifer", "Daniel", "Melissa",
    "Anthony", "Lisa",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin",
];

const PROPERTY_TYPES: &[&str] = &["Apartment", "House", "Condo", "Villa", "Studio", "Loft"];

const LOCATIONS: &[&str] = &[
    "New York, NY",
    "Los Angeles, CA",
    "Chicago, IL",
    "Miami, FL",
    "San Francisco, CA",
    "Seattle, WA",
    "Boston, MA",
    "Austin, TX",
    "Denver, CO",
    "Portland, OR",
    "Nashville, TN",
    "Atlanta, GA",
];

const AMENITIES: &[&str] = &[
    "WiFi",
    "Kitchen",
    "Pool",
    "Gym",
    "Parking",
    "Pet-friendly",
    "Air conditioning",
    "Heating",
    "Washer/Dryer",
    "Balcony",
];

const REVIEW_COMMENTS: &[&str] = &[
    "Great place to stay! Very clean and comfortable.",
    "Perfect location and amazing host. Highly recommended!",
    "Beautiful property with all the amenities we needed.",
    "Lovely space, exactly as described. Would stay again!",
    "Fantastic experience! The host was very responsive.",
    "Clean, comfortable, and in a great location.",
    "Everything was perfect. Great value for money!",
    "Amazing property! Felt like home away from home.",
    "Excellent stay! The place exceeded our expectations.",
    "Would definitely recommend to friends and family!",
];

const MESSAGE_TEMPLATES: &[&str] = &[
    "Hi! I'm interested in your property. Is it available for the dates I selected?",
    "Thank you for accepting my booking request!",
    "Could you please provide directions to the property?",
    "Is parking available at your property?",
    "Thank you for the great stay! The place was perfect.",
    "Hi! I have a question about your property amenities.",
    "Are pets allowed in your property?",
    "What's the check-in process?",
    "Thank you for being such a great host!",
    "Is there a grocery store nearby?",
];

const MAX_REVIEWS: usize = 30;
const MESSAGE_ATTEMPTS: usize = 50;

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Seed the database with sample data")]
struct Cli {
    /// Number of users to create
    #[arg(long, default_value_t = 20)]
    users: usize,

    /// Number of listings to create
    #[arg(long, default_value_t = 50)]
    listings: usize,

    /// Number of bookings to attempt (overlapping ones are skipped)
    #[arg(long, default_value_t = 100)]
    bookings: usize,

    /// Delete existing data first
    #[arg(long)]
    clear: bool,

    /// Fixed RNG seed for reproducible data
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    println!("✓ Connected to database");

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut tx = pool.begin().await?;

    if cli.clear {
        println!("Clearing existing data...");
        clear_data(&mut tx).await?;
    }

    println!("Starting database seeding...");

    let methods = create_payment_methods(&mut tx).await?;
    let users = create_users(&mut tx, &mut rng, cli.users).await?;
    let listings = create_listings(&mut tx, &mut rng, &users, cli.listings).await?;
    let bookings = create_bookings(&mut tx, &mut rng, &users, &listings, cli.bookings).await?;
    let reviews = create_reviews(&mut tx, &mut rng, &bookings).await?;
    let payments =
        create_payments(&mut tx, &mut rng, &bookings, &methods, &config.payment_currency).await?;
    let messages = create_messages(&mut tx, &mut rng, &users).await?;

    tx.commit().await.context("Failed to commit seed data")?;

    println!("\n✓ Successfully seeded the database!");
    println!("  users:    {}", users.len());
    println!("  listings: {}", listings.len());
    println!("  bookings: {}", bookings.len());
    println!("  reviews:  {}", reviews);
    println!("  payments: {}", payments);
    println!("  messages: {}", messages);

    Ok(())
}

async fn clear_data(conn: &mut PgConnection) -> Result<()> {
    for table in [
        "messages",
        "payments",
        "reviews",
        "bookings",
        "listings",
        "users",
        "payment_methods",
    ] {
        let result = sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to clear {}", table))?;
        if result.rows_affected() > 0 {
            println!("Cleared {} {} records", result.rows_affected(), table);
        }
    }
    Ok(())
}

async fn create_payment_methods(conn: &mut PgConnection) -> Result<Vec<PaymentMethod>> {
    println!("Creating payment methods...");

    let mut methods = Vec::with_capacity(PAYMENT_METHODS.len() + 1);
    for name in std::iter::once(&DEFAULT_PAYMENT_METHOD).chain(PAYMENT_METHODS) {
        methods.push(PaymentMethod::get_or_create(name, &mut *conn).await?);
    }
    Ok(methods)
}

async fn create_users(conn: &mut PgConnection, rng: &mut StdRng, count: usize) -> Result<Vec<User>> {
    println!("Creating {} users...", count);

    // Every sample account shares one hash
    let password_hash = hash_password("password123")?;
    let mut users = Vec::with_capacity(count);

    for i in 0..count {
        let first_name = *pick(FIRST_NAMES, rng);
        let last_name = *pick(LAST_NAMES, rng);
        let username = format!("{}{}{}", first_name.to_lowercase(), last_name.to_lowercase(), i);

        let mut email = format!("{}@example.com", username);
        if User::find_by_email(&email, &mut *conn).await?.is_some() {
            email = format!("{}.{}@example.com", username, rng.random_range(1000..10000));
        }
        if User::username_taken(&username, &mut *conn).await? {
            continue;
        }

        let new_user = NewUser::builder()
            .username(username)
            .email(email)
            .first_name(first_name)
            .last_name(last_name)
            .phone_number(Some(format!(
                "+1{}",
                rng.random_range(1_000_000_000u64..=9_999_999_999)
            )))
            .password_hash(password_hash.clone())
            .build();
        users.push(User::insert(new_user, &mut *conn).await?);
    }

    if User::find_by_email("admin@example.com", &mut *conn).await?.is_none() {
        let admin = NewUser::builder()
            .username("admin")
            .email("admin@example.com")
            .first_name("Admin")
            .last_name("User")
            .password_hash(hash_password("admin123")?)
            .build();
        User::insert(admin, &mut *conn).await?;
        println!("Created admin@example.com (password: admin123)");
    }

    Ok(users)
}

async fn create_listings(
    conn: &mut PgConnection,
    rng: &mut StdRng,
    users: &[User],
    count: usize,
) -> Result<Vec<Listing>> {
    println!("Creating {} listings...", count);

    if users.is_empty() {
        return Ok(Vec::new());
    }

    let mut listings = Vec::with_capacity(count);
    for _ in 0..count {
        let host = pick(users, rng);
        let property_type = *pick(PROPERTY_TYPES, rng);
        let location = *pick(LOCATIONS, rng);
        let city = location.split(',').next().unwrap_or(location);

        let amenity_count = rng.random_range(3..=6);
        let amenities: Vec<&str> = AMENITIES
            .choose_multiple(rng, amenity_count)
            .copied()
            .collect();

        let new_listing = NewListing::builder()
            .host_id(host.user_id)
            .name(format!("Beautiful {} in {}", property_type, city))
            .description(format!(
                "A wonderful {} located in the heart of {}. Perfect for travelers looking for \
                 comfort and convenience. Features: {}",
                property_type.to_lowercase(),
                location,
                amenities.join(", ")
            ))
            .location(location)
            .price_per_night(Decimal::from(rng.random_range(50i64..=500)))
            .build();
        listings.push(Listing::insert(new_listing, &mut *conn).await?);
    }

    Ok(listings)
}

async fn create_bookings(
    conn: &mut PgConnection,
    rng: &mut StdRng,
    users: &[User],
    listings: &[Listing],
    count: usize,
) -> Result<Vec<Booking>> {
    println!("Creating {} bookings...", count);

    if users.is_empty() || listings.is_empty() {
        return Ok(Vec::new());
    }

    let today = Utc::now().date_naive();
    let mut bookings = Vec::new();

    for _ in 0..count {
        let guest = pick(users, rng);
        let listing = pick(listings, rng);
        if guest.user_id == listing.host_id {
            continue;
        }

        // Somewhere between a year ago and six months ahead
        let start_date = today + Duration::days(rng.random_range(-365..=180));
        let end_date = start_date + Duration::days(rng.random_range(1..=14));

        if Booking::has_overlap(listing.property_id, start_date, end_date, None, &mut *conn).await? {
            continue;
        }

        let new_booking = NewBooking::builder()
            .listing_id(listing.property_id)
            .user_id(guest.user_id)
            .start_date(start_date)
            .end_date(end_date)
            .total_price(quote_total(listing.price_per_night, start_date, end_date))
            .status(*pick(&BookingStatus::ALL, rng))
            .build();
        bookings.push(Booking::insert(new_booking, &mut *conn).await?);
    }

    Ok(bookings)
}

async fn create_reviews(conn: &mut PgConnection, rng: &mut StdRng, bookings: &[Booking]) -> Result<usize> {
    println!("Creating reviews...");

    let completed: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Completed)
        .collect();

    let mut reviewed = HashSet::new();
    for booking in completed.choose_multiple(rng, MAX_REVIEWS.min(completed.len())) {
        if !reviewed.insert((booking.listing_id, booking.user_id)) {
            continue;
        }
        if Review::exists_for(booking.listing_id, booking.user_id, &mut *conn).await? {
            continue;
        }
        Review::insert(
            booking.listing_id,
            booking.user_id,
            rng.random_range(3..=5),
            *pick(REVIEW_COMMENTS, rng),
            &mut *conn,
        )
        .await?;
    }

    Ok(reviewed.len())
}

async fn create_payments(
    conn: &mut PgConnection,
    rng: &mut StdRng,
    bookings: &[Booking],
    methods: &[PaymentMethod],
    currency: &str,
) -> Result<usize> {
    println!("Creating payments...");

    if methods.is_empty() {
        return Ok(0);
    }

    let mut created = 0;
    for booking in bookings.iter().filter(|b| {
        matches!(b.status, BookingStatus::Confirmed | BookingStatus::Completed)
    }) {
        let payment_status = if booking.status == BookingStatus::Completed {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Pending
        };

        let new_payment = NewPayment::builder()
            .booking_id(booking.booking_id)
            .user_id(booking.user_id)
            .amount(booking.total_price)
            .currency(currency)
            .payment_status(payment_status)
            .payment_method_id(pick(methods, rng).method_id)
            .build();
        Payment::insert(new_payment, &mut *conn).await?;
        created += 1;
    }

    Ok(created)
}

async fn create_messages(conn: &mut PgConnection, rng: &mut StdRng, users: &[User]) -> Result<usize> {
    println!("Creating messages...");

    if users.len() < 2 {
        return Ok(0);
    }

    let mut created = 0;
    for _ in 0..MESSAGE_ATTEMPTS {
        let sender = pick(users, rng);
        let recipient = pick(users, rng);
        if sender.user_id == recipient.user_id {
            continue;
        }
        Message::insert(
            sender.user_id,
            recipient.user_id,
            *pick(MESSAGE_TEMPLATES, rng),
            &mut *conn,
        )
        .await?;
        created += 1;
    }

    Ok(created)
}

/// Callers guarantee `items` is non-empty.
fn pick<'a, T>(items: &'a [T], rng: &mut StdRng) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_yields_str_for_text_tables() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let comment: &str = *pick(REVIEW_COMMENTS, &mut rng);
            let body: &str = *pick(MESSAGE_TEMPLATES, &mut rng);
            assert!(REVIEW_COMMENTS.contains(&comment));
            assert!(MESSAGE_TEMPLATES.contains(&body));
        }
    }
}
