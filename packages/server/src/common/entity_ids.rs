//! Typed ids for every stored entity.

pub use super::id::Id;

// Markers; only the aliases below are meant to be named elsewhere.
pub struct User;
pub struct Listing;
pub struct Booking;
pub struct Review;
pub struct Payment;
pub struct PaymentMethod;
pub struct Message;

pub type UserId = Id<User>;
pub type ListingId = Id<Listing>;
pub type BookingId = Id<Booking>;
pub type ReviewId = Id<Review>;
pub type PaymentId = Id<Payment>;
pub type PaymentMethodId = Id<PaymentMethod>;
pub type MessageId = Id<Message>;
