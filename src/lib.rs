//! filestore - content-addressed file storage service.
//!
//! Uploads are identified by the SHA-1 fingerprint of their bytes. Identical
//! content is stored once, deletion is a soft status change, and the blob
//! bytes live behind a pluggable [`file::BlobStore`].

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{AuthService, IssuedToken, PasswordError, TokenClaims};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{FilestoreError, Result};
pub use file::{
    BlobStore, ContentRecord, ContentRepository, FastUploadOutcome, FileService, FileStatus,
    Fingerprint, LocalBlobStore, RegisterOutcome, UploadOutcome,
};
pub use web::{AppState, WebServer};
