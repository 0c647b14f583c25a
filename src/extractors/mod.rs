//! Request extractors.

pub mod auth;
pub mod json;
pub use auth::{require_auth, BearerToken};
pub use json::JsonBody;
