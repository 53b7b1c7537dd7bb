//! Token authentication.
//!
//! Clients post their email and password to `/api/auth/token/` and send the
//! returned JWT as `Authorization: Bearer <token>`. Passwords are stored as
//! Argon2id PHC strings.

pub mod actions;
pub mod data;
pub mod edges;
pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtService};
