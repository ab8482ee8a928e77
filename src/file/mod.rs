//! Content-addressed file storage for filestore.
//!
//! This module provides:
//! - SHA-1 content fingerprints
//! - Content records with an active/removed lifecycle
//! - Pluggable blob storage with a local filesystem backend
//! - The upload service that keeps blobs and records consistent

mod fingerprint;
mod record;
mod repository;
mod service;
mod storage;

pub use fingerprint::{Fingerprint, FingerprintHasher, FINGERPRINT_HEX_LEN, FINGERPRINT_LEN};
pub use record::{ContentRecord, FileStatus, NewContent, RegisterOutcome};
pub use repository::ContentRepository;
pub use service::{FastUploadOutcome, FileService, UploadOutcome, UploadStage};
pub use storage::{abort_quietly, BlobStore, BlobWriter, LocalBlobStore};

use crate::{FilestoreError, Result};

/// Maximum length for a display name (in characters).
pub const MAX_NAME_LENGTH: usize = 255;

/// Largest page a listing returns.
pub const MAX_LIST_LIMIT: u32 = 1000;

/// Default page size for listings.
pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// Validate a display name and return it trimmed.
pub fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(FilestoreError::Validation("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(FilestoreError::Validation(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    if name.chars().any(|c| c.is_control() || c == '/' || c == '\\') {
        return Err(FilestoreError::Validation(
            "name must not contain path separators or control characters".to_string(),
        ));
    }

    Ok(name.to_string())
}
