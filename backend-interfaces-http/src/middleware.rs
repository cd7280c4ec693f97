pub mod auth;

pub use auth::{authorize, parse_intake};
