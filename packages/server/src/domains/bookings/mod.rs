pub mod actions;
pub mod data;
pub mod edges;
pub mod models;

pub use data::BookingData;
pub use models::{Booking, BookingStatus};
