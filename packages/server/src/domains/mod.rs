// Business domains
pub mod auth;
pub mod bookings;
pub mod listings;
pub mod messages;
pub mod notifications;
pub mod payments;
pub mod reviews;
pub mod users;
