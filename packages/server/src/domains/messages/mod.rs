pub mod actions;
pub mod data;
pub mod edges;
pub mod models;

pub use data::MessageData;
pub use models::{Mailbox, Message};
