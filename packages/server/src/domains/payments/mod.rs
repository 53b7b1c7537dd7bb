//! Chapa payments for bookings.

pub mod actions;
pub mod data;
pub mod edges;
pub mod models;

pub use data::PaymentData;
pub use models::{Payment, PaymentMethod, PaymentStatus};
