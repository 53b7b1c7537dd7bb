pub mod payment;
pub mod payment_method;

pub use payment::*;
pub use payment_method::*;
