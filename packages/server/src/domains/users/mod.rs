pub mod actions;
pub mod data;
pub mod edges;
pub mod models;

pub use data::UserData;
pub use models::User;
