//! Content metadata repository.
//!
//! Every mutation here is a single conditional statement. Concurrent callers
//! are serialized by SQLite on the primary key plus the status predicate, so
//! no check-then-act sequence spans two round trips.

use tracing::debug;

use super::fingerprint::Fingerprint;
use super::record::{parse_timestamp, ContentRecord, FileStatus, NewContent, RegisterOutcome};
use crate::db::DbPool;
use crate::{FilestoreError, Result};

const RECORD_COLUMNS: &str =
    "file_sha1, file_name, file_size, file_addr, status, created_at, updated_at";

/// Internal row type for database mapping.
#[derive(sqlx::FromRow)]
struct ContentRow {
    file_sha1: String,
    file_name: String,
    file_size: i64,
    file_addr: String,
    status: i64,
    created_at: String,
    updated_at: String,
}

impl ContentRow {
    fn into_record(self) -> Result<ContentRecord> {
        Ok(ContentRecord {
            fingerprint: Fingerprint::from_hex(&self.file_sha1)
                .map_err(|e| FilestoreError::Database(format!("corrupt fingerprint: {e}")))?,
            name: self.file_name,
            size: u64::try_from(self.file_size)
                .map_err(|_| FilestoreError::Database("negative file size".to_string()))?,
            location: self.file_addr,
            status: FileStatus::try_from(self.status)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

/// Repository for content records.
pub struct ContentRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ContentRepository<'a> {
    /// Create a new ContentRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a record for `content` unless an active one already exists.
    ///
    /// A removed record with the same fingerprint is reactivated in place with
    /// the new name and location. When several callers race on the same
    /// fingerprint exactly one of them sees a created outcome.
    pub async fn register_if_absent(&self, content: &NewContent) -> Result<RegisterOutcome> {
        let size = i64::try_from(content.size)
            .map_err(|_| FilestoreError::Validation("file size out of range".to_string()))?;

        let revision: Option<i64> = sqlx::query_scalar(
            "INSERT INTO files (file_sha1, file_name, file_size, file_addr, status)
             VALUES (?, ?, ?, ?, 1)
             ON CONFLICT(file_sha1) DO UPDATE SET
                 file_name = excluded.file_name,
                 file_addr = excluded.file_addr,
                 status = 1,
                 revision = files.revision + 1,
                 updated_at = datetime('now')
             WHERE files.status = 2
             RETURNING revision",
        )
        .bind(content.fingerprint.to_hex())
        .bind(&content.name)
        .bind(size)
        .bind(&content.location)
        .fetch_optional(self.pool)
        .await?;

        let outcome = match revision {
            None => RegisterOutcome::AlreadyExists,
            Some(0) => RegisterOutcome::Created,
            Some(_) => RegisterOutcome::Reactivated,
        };
        debug!(fingerprint = %content.fingerprint, ?outcome, "register_if_absent");

        Ok(outcome)
    }

    /// Fetch the active record for a fingerprint.
    pub async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<ContentRecord>> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM files WHERE file_sha1 = ? AND status = 1"
        ))
        .bind(fingerprint.to_hex())
        .fetch_optional(self.pool)
        .await?;

        row.map(ContentRow::into_record).transpose()
    }

    /// Whether an active record exists for a fingerprint.
    pub async fn exists(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM files WHERE file_sha1 = ? AND status = 1)",
        )
        .bind(fingerprint.to_hex())
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Up to `limit` active records, most recently updated first.
    pub async fn list(&self, limit: u32) -> Result<Vec<ContentRecord>> {
        let rows = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM files WHERE status = 1
             ORDER BY updated_at DESC, rowid DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ContentRow::into_record).collect()
    }

    /// Change the display name of an active record.
    ///
    /// Returns `true` when the record is active, even if the name is unchanged.
    pub async fn rename(&self, fingerprint: &Fingerprint, new_name: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET file_name = ?, updated_at = datetime('now')
             WHERE file_sha1 = ? AND status = 1",
        )
        .bind(new_name)
        .bind(fingerprint.to_hex())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Point an active record at a new blob location.
    pub async fn relocate(&self, fingerprint: &Fingerprint, new_location: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET file_addr = ?, updated_at = datetime('now')
             WHERE file_sha1 = ? AND status = 1",
        )
        .bind(new_location)
        .bind(fingerprint.to_hex())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move an active record from `from` to `to`, only if it still points at `from`.
    pub async fn swap_location(
        &self,
        fingerprint: &Fingerprint,
        from: &str,
        to: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET file_addr = ?, updated_at = datetime('now')
             WHERE file_sha1 = ? AND status = 1 AND file_addr = ?",
        )
        .bind(to)
        .bind(fingerprint.to_hex())
        .bind(from)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark an active record removed. The row itself is kept.
    pub async fn soft_delete(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self.remove(fingerprint).await?.is_some())
    }

    /// Mark an active record removed and return the location it pointed at.
    pub async fn remove(&self, fingerprint: &Fingerprint) -> Result<Option<String>> {
        let location: Option<String> = sqlx::query_scalar(
            "UPDATE files SET status = 2, updated_at = datetime('now')
             WHERE file_sha1 = ? AND status = 1
             RETURNING file_addr",
        )
        .bind(fingerprint.to_hex())
        .fetch_optional(self.pool)
        .await?;

        Ok(location)
    }

    /// Fetch a record regardless of status.
    pub async fn get_any(&self, fingerprint: &Fingerprint) -> Result<Option<ContentRecord>> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM files WHERE file_sha1 = ?"
        ))
        .bind(fingerprint.to_hex())
        .fetch_optional(self.pool)
        .await?;

        row.map(ContentRow::into_record).transpose()
    }

    /// Count active records.
    pub async fn count_active(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE status = 1")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
