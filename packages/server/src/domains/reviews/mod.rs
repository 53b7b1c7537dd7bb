pub mod actions;
pub mod data;
pub mod edges;
pub mod models;

pub use data::ReviewData;
pub use models::Review;
