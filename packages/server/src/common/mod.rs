// Common types and utilities shared across the application

pub mod entity_ids;
pub mod error;
pub mod id;
pub mod ordering;
pub mod validation;

pub use entity_ids::{
    BookingId, ListingId, MessageId, PaymentId, PaymentMethodId, ReviewId, UserId,
};
pub use error::ApiError;
pub use id::Id;
pub use ordering::OrderBy;
pub use validation::{ValidationErrors, NON_FIELD_ERRORS};
