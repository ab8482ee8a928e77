//! Authentication module for filestore.
//!
//! This module provides password hashing, token issuance, and the user
//! registration and sign-in flow.

mod password;
mod service;
mod token;

pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use service::{validate_username, AuthService, MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH};
pub use token::{IssuedToken, TokenClaims, TokenIssuer};
