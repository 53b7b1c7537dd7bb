// Travel booking marketplace - API core
//
// REST API for listings, bookings, reviews, payments and messages.
// Notification emails are delivered by the job runner in kernel/jobs.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
