//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

/// Signup and signin request.
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(length(
        min = 3,
        max = 32,
        message = "Username must be 3-32 characters"
    ))]
    pub username: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be 8-128 characters"
    ))]
    pub password: String,
}

/// Fast-upload check: the client already knows the fingerprint and size.
#[derive(Debug, Deserialize)]
pub struct FastUploadRequest {
    pub fingerprint: String,
    pub size: u64,
}

/// Rename request.
#[derive(Debug, Deserialize, Validate)]
pub struct RenameRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Query parameters for listing files.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}
