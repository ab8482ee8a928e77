//! Web API module for filestore.
//!
//! This module exposes the file and user operations over HTTP with JSON
//! bodies and multipart uploads.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_health_router, create_router};
pub use server::WebServer;
