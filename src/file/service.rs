//! File service for filestore.
//!
//! This module reconciles the blob store with the metadata repository:
//! - Streaming upload with fingerprinting and deduplication
//! - Fast upload (skip the transfer when the content is already stored)
//! - Rename, delete, download and relocation

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::{FilestoreError, Result};

use super::fingerprint::Fingerprint;
use super::record::{ContentRecord, NewContent, RegisterOutcome};
use super::repository::ContentRepository;
use super::storage::{abort_quietly, BlobStore};
use super::{validate_name, MAX_LIST_LIMIT};

/// Where an upload was when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Receiving,
    Hashing,
    PersistingBlob,
    Registering,
    Done,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UploadStage::Receiving => "receiving",
            UploadStage::Hashing => "hashing",
            UploadStage::PersistingBlob => "persisting_blob",
            UploadStage::Registering => "registering",
            UploadStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// The active record for the uploaded content.
    pub record: ContentRecord,
    /// Whether this upload created the record.
    pub outcome: RegisterOutcome,
}

impl UploadOutcome {
    pub fn is_created(&self) -> bool {
        self.outcome.is_created()
    }
}

/// Result of a fast-upload check.
#[derive(Debug, Clone)]
pub struct FastUploadOutcome {
    /// True when the content is stored and no transfer is needed.
    pub satisfied: bool,
    pub record: Option<ContentRecord>,
}

/// File service for uploads, downloads and record maintenance.
pub struct FileService {
    db: Arc<Database>,
    store: Arc<dyn BlobStore>,
    max_upload_size: u64,
    register_retries: u32,
    retry_backoff: Duration,
}

impl FileService {
    /// Create a new FileService with default limits.
    pub fn new(db: Arc<Database>, store: Arc<dyn BlobStore>) -> Self {
        let config = Config::default();
        Self {
            db,
            store,
            max_upload_size: config.storage.max_upload_size_bytes(),
            register_retries: config.upload.register_retries,
            retry_backoff: Duration::from_millis(config.upload.retry_backoff_ms),
        }
    }

    /// Create a FileService using the limits in `config`.
    pub fn from_config(db: Arc<Database>, store: Arc<dyn BlobStore>, config: &Config) -> Self {
        Self::new(db, store)
            .with_max_upload_size(config.storage.max_upload_size_bytes())
            .with_retry_policy(
                config.upload.register_retries,
                Duration::from_millis(config.upload.retry_backoff_ms),
            )
    }

    /// Set the maximum upload size in bytes.
    pub fn with_max_upload_size(mut self, max_size: u64) -> Self {
        self.max_upload_size = max_size;
        self
    }

    /// Set how often and how patiently registration is retried.
    pub fn with_retry_policy(mut self, retries: u32, backoff: Duration) -> Self {
        self.register_retries = retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    fn repo(&self) -> ContentRepository<'_> {
        ContentRepository::new(self.db.pool())
    }

    /// Upload content from a byte stream.
    ///
    /// The stream is fingerprinted and written to the blob store in one pass.
    /// If the content is already stored the new blob is discarded and the
    /// existing record is returned. `name` defaults to the fingerprint.
    ///
    /// Dropping the returned future before it completes leaves no blob and
    /// no record behind.
    pub async fn upload<S>(&self, name: Option<&str>, stream: S) -> Result<UploadOutcome>
    where
        S: Stream<Item = io::Result<Bytes>> + Unpin + Send,
    {
        let name = name.map(validate_name).transpose()?;
        let mut stage = UploadStage::Receiving;

        let result = self.run_upload(name, stream, &mut stage).await;
        match &result {
            Ok(done) => info!(
                fingerprint = %done.record.fingerprint,
                size = done.record.size,
                outcome = ?done.outcome,
                "Upload complete"
            ),
            Err(e) => warn!(stage = %stage, error = %e, "Upload failed"),
        }
        result
    }

    async fn run_upload<S>(
        &self,
        name: Option<String>,
        mut stream: S,
        stage: &mut UploadStage,
    ) -> Result<UploadOutcome>
    where
        S: Stream<Item = io::Result<Bytes>> + Unpin + Send,
    {
        let mut writer = self.store.put_stream().await?;
        let mut hasher = Fingerprint::hasher();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    abort_quietly(writer).await;
                    return Err(e.into());
                }
            };

            if hasher.bytes_hashed() + chunk.len() as u64 > self.max_upload_size {
                abort_quietly(writer).await;
                return Err(FilestoreError::Validation(format!(
                    "file too large (max {} bytes)",
                    self.max_upload_size
                )));
            }

            hasher.update(&chunk);
            let written = writer.write(chunk).await;
            if let Err(e) = written {
                abort_quietly(writer).await;
                return Err(e);
            }
        }

        *stage = UploadStage::Hashing;
        let size = hasher.bytes_hashed();
        let fingerprint = hasher.finalize();

        *stage = UploadStage::PersistingBlob;
        let location = writer.finish().await?;

        *stage = UploadStage::Registering;
        let name = name.unwrap_or_else(|| fingerprint.to_hex());
        let content = NewContent::new(fingerprint, name, size, location.clone());

        let (outcome, record) = match self.register_with_retry(&content).await {
            Ok(registered) => registered,
            Err(e) => {
                self.discard_blob(&location).await;
                return Err(e);
            }
        };

        if outcome == RegisterOutcome::AlreadyExists && record.location != location {
            debug!(fingerprint = %fingerprint, "Duplicate content, discarding new blob");
            self.discard_blob(&location).await;
        }

        *stage = UploadStage::Done;
        Ok(UploadOutcome { record, outcome })
    }

    /// Register content, retrying transient store errors with linear backoff.
    ///
    /// Once the registration statement commits a `Created` or `Reactivated`
    /// outcome the blob belongs to the record. From then on the statement is
    /// not repeated and a failed read-back falls back to the registered
    /// content, so `Err` always means the caller still owns the blob.
    async fn register_with_retry(
        &self,
        content: &NewContent,
    ) -> Result<(RegisterOutcome, ContentRecord)> {
        let repo = self.repo();
        let mut committed: Option<RegisterOutcome> = None;
        let mut attempt = 0;

        loop {
            let registered = match committed {
                Some(outcome) => Ok(outcome),
                None => repo.register_if_absent(content).await,
            };

            let result = match registered {
                Ok(outcome) => {
                    if outcome.is_created() {
                        committed = Some(outcome);
                    }
                    repo.lookup(&content.fingerprint)
                        .await
                        .map(|record| record.map(|r| (outcome, r)))
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(Some(registered)) => return Ok(registered),
                Ok(None) => {
                    if let Some(outcome) = committed {
                        debug!(
                            fingerprint = %content.fingerprint,
                            "Record removed right after registration"
                        );
                        return Ok((outcome, content.to_record()));
                    }
                    debug!(
                        fingerprint = %content.fingerprint,
                        "Record vanished during registration"
                    );
                }
                Err(e) if e.is_transient() && attempt < self.register_retries => {
                    warn!(
                        fingerprint = %content.fingerprint,
                        attempt = attempt + 1,
                        error = %e,
                        "Transient error while registering, retrying"
                    );
                }
                Err(e) => {
                    if let Some(outcome) = committed {
                        warn!(
                            fingerprint = %content.fingerprint,
                            error = %e,
                            "Registered but could not read the record back"
                        );
                        return Ok((outcome, content.to_record()));
                    }
                    return Err(e);
                }
            }

            if attempt >= self.register_retries {
                return Err(FilestoreError::StorageUnavailable(
                    "registration did not settle".to_string(),
                ));
            }
            attempt += 1;
            tokio::time::sleep(self.retry_backoff * attempt).await;
        }
    }

    /// Delete a blob nobody references, logging instead of failing.
    async fn discard_blob(&self, location: &str) {
        if let Err(e) = self.store.delete(location).await {
            warn!(location = %location, error = %e, "Failed to delete unreferenced blob");
        }
    }

    /// Check whether content the client already holds is stored.
    ///
    /// Satisfied only if an active record exists and its size matches the
    /// claim. A mismatched size is rejected as invalid input.
    pub async fn fast_upload(
        &self,
        fingerprint: &Fingerprint,
        size: u64,
    ) -> Result<FastUploadOutcome> {
        match self.repo().lookup(fingerprint).await? {
            Some(record) if record.size == size => Ok(FastUploadOutcome {
                satisfied: true,
                record: Some(record),
            }),
            Some(record) => Err(FilestoreError::Validation(format!(
                "size mismatch for {fingerprint}: claimed {size}, stored {}",
                record.size
            ))),
            None => Ok(FastUploadOutcome {
                satisfied: false,
                record: None,
            }),
        }
    }

    /// Get the active record for a fingerprint.
    pub async fn metadata(&self, fingerprint: &Fingerprint) -> Result<Option<ContentRecord>> {
        self.repo().lookup(fingerprint).await
    }

    /// Rename an active record and return it.
    pub async fn rename(
        &self,
        fingerprint: &Fingerprint,
        name: &str,
    ) -> Result<Option<ContentRecord>> {
        let name = validate_name(name)?;
        let repo = self.repo();

        if !repo.rename(fingerprint, &name).await? {
            return Ok(None);
        }
        repo.lookup(fingerprint).await
    }

    /// Soft-delete a record, then remove its blob.
    ///
    /// Returns `false` if there was no active record.
    pub async fn delete(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let Some(location) = self.repo().remove(fingerprint).await? else {
            return Ok(false);
        };

        info!(fingerprint = %fingerprint, "Content removed");
        self.discard_blob(&location).await;
        Ok(true)
    }

    /// List active records. `limit` is clamped to `1..=MAX_LIST_LIMIT`.
    pub async fn list(&self, limit: u32) -> Result<Vec<ContentRecord>> {
        self.repo().list(limit.clamp(1, MAX_LIST_LIMIT)).await
    }

    /// Read the bytes of an active record.
    pub async fn download(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<(ContentRecord, Bytes)>> {
        let Some(record) = self.repo().lookup(fingerprint).await? else {
            return Ok(None);
        };

        let data = self.store.get(&record.location).await?;
        Ok(Some((record, data)))
    }

    /// Move the bytes of an active record to a fresh blob location.
    pub async fn relocate(&self, fingerprint: &Fingerprint) -> Result<Option<ContentRecord>> {
        let repo = self.repo();
        let Some(record) = repo.lookup(fingerprint).await? else {
            return Ok(None);
        };

        let new_location = self.store.copy(&record.location).await?;

        match repo
            .swap_location(fingerprint, &record.location, &new_location)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(fingerprint = %fingerprint, "Record changed during relocation");
                self.discard_blob(&new_location).await;
                return Ok(None);
            }
            Err(e) => {
                self.discard_blob(&new_location).await;
                return Err(e);
            }
        }

        self.discard_blob(&record.location).await;
        info!(fingerprint = %fingerprint, location = %new_location, "Content relocated");
        repo.lookup(fingerprint).await
    }

    /// Number of active records.
    pub async fn count(&self) -> Result<i64> {
        self.repo().count_active().await
    }
}
