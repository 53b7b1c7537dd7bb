// HTTP routes that do not belong to a domain
pub mod health;
pub mod openapi;

pub use health::*;
pub use openapi::{docs_handler, schema_handler, ApiDoc};
