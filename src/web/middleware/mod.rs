//! Middleware for Web API.

pub mod auth;
pub mod cors;

pub use auth::{extract_token, AuthUser};
pub use cors::create_cors_layer;
