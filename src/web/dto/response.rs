//! Response DTOs for Web API.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::User;
use crate::file::{ContentRecord, FastUploadOutcome, Fingerprint, UploadOutcome};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Signup result.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    /// False when the username was already taken.
    pub created: bool,
}

/// Signin result.
#[derive(Debug, Serialize)]
pub struct SigninResponse {
    /// Access token (JWT).
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// User information.
#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    pub id: i64,
    pub username: String,
    pub created_at: String,
    pub last_active: Option<String>,
}

impl From<User> for UserInfoResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
            last_active: user.last_active,
        }
    }
}

/// File metadata.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub fingerprint: Fingerprint,
    pub name: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ContentRecord> for FileResponse {
    fn from(record: ContentRecord) -> Self {
        Self {
            fingerprint: record.fingerprint,
            name: record.name,
            size: record.size,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Upload result.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub fingerprint: Fingerprint,
    pub name: String,
    pub size: u64,
    /// True when this upload stored the content; false for a duplicate.
    pub created: bool,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        let created = outcome.is_created();
        Self {
            fingerprint: outcome.record.fingerprint,
            name: outcome.record.name,
            size: outcome.record.size,
            created,
        }
    }
}

/// Fast-upload result.
#[derive(Debug, Serialize)]
pub struct FastUploadResponse {
    /// True when no transfer is needed.
    pub satisfied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileResponse>,
}

impl From<FastUploadOutcome> for FastUploadResponse {
    fn from(outcome: FastUploadOutcome) -> Self {
        Self {
            satisfied: outcome.satisfied,
            file: outcome.record.map(FileResponse::from),
        }
    }
}

/// Delete result.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub removed: bool,
}

/// Health check result.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: &'static str,
}
