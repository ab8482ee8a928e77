//! Content metadata types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use super::fingerprint::Fingerprint;
use crate::{FilestoreError, Result};

/// Lifecycle state of a content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Active = 1,
    Removed = 2,
}

impl FileStatus {
    /// Database representation.
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for FileStatus {
    type Error = FilestoreError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(FileStatus::Active),
            2 => Ok(FileStatus::Removed),
            other => Err(FilestoreError::Database(format!(
                "unknown file status: {other}"
            ))),
        }
    }
}

/// Authoritative metadata for one distinct content.
#[derive(Debug, Clone, Serialize)]
pub struct ContentRecord {
    /// Content identity. Never changes.
    pub fingerprint: Fingerprint,
    /// Display name.
    pub name: String,
    /// Byte length. Never changes.
    pub size: u64,
    /// Blob store address of the bytes.
    #[serde(skip)]
    pub location: String,
    pub status: FileStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRecord {
    pub fn is_active(&self) -> bool {
        self.status == FileStatus::Active
    }
}

/// Data for registering newly uploaded content.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub fingerprint: Fingerprint,
    pub name: String,
    pub size: u64,
    pub location: String,
}

impl NewContent {
    pub fn new(
        fingerprint: Fingerprint,
        name: impl Into<String>,
        size: u64,
        location: impl Into<String>,
    ) -> Self {
        Self {
            fingerprint,
            name: name.into(),
            size,
            location: location.into(),
        }
    }

    /// The active record this content becomes once registered, stamped now.
    pub fn to_record(&self) -> ContentRecord {
        let now = Utc::now();
        ContentRecord {
            fingerprint: self.fingerprint,
            name: self.name.clone(),
            size: self.size,
            location: self.location.clone(),
            status: FileStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of an idempotent registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterOutcome {
    /// No record existed; one was inserted.
    Created,
    /// A removed record was brought back with the new name and location.
    Reactivated,
    /// An active record already held this fingerprint. Nothing changed.
    AlreadyExists,
}

impl RegisterOutcome {
    /// Whether this call is the one that made the content available.
    pub fn is_created(self) -> bool {
        matches!(self, RegisterOutcome::Created | RegisterOutcome::Reactivated)
    }
}

/// Parse a SQLite `datetime('now')` value.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .map_err(|e| FilestoreError::Database(format!("invalid timestamp {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!(FileStatus::try_from(1).unwrap(), FileStatus::Active);
        assert_eq!(FileStatus::try_from(2).unwrap(), FileStatus::Removed);
        assert_eq!(FileStatus::Removed.as_i64(), 2);
        assert!(FileStatus::try_from(0).is_err());
    }

    #[test]
    fn test_register_outcome_is_created() {
        assert!(RegisterOutcome::Created.is_created());
        assert!(RegisterOutcome::Reactivated.is_created());
        assert!(!RegisterOutcome::AlreadyExists.is_created());
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024-03-01 12:34:56").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T12:34:56+00:00");
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_record_json_hides_location() {
        let record = ContentRecord {
            fingerprint: Fingerprint::compute(b"hello"),
            name: "a.txt".to_string(),
            size: 5,
            location: "ab/secret".to_string(),
            status: FileStatus::Active,
            created_at: parse_timestamp("2024-03-01 12:34:56").unwrap(),
            updated_at: parse_timestamp("2024-03-01 12:34:56").unwrap(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fingerprint"], "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
        assert_eq!(json["status"], "active");
        assert!(json.get("location").is_none());
        assert!(record.is_active());
    }
}
