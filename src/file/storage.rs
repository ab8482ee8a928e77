//! Blob storage for filestore.
//!
//! Blobs are opaque byte strings addressed by a location chosen by the store.
//! The metadata layer records the location; nothing else interprets it.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{FilestoreError, Result};

/// Name of the staging directory under the store root.
const STAGING_DIR: &str = "tmp";

/// Byte storage addressed by store-chosen locations.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Start a streaming write. The blob becomes readable once the writer finishes.
    async fn put_stream(&self) -> Result<Box<dyn BlobWriter>>;

    /// Read a whole blob. A missing blob is `NotFound`.
    async fn get(&self, location: &str) -> Result<Bytes>;

    /// Delete a blob. Returns `false` if it was already gone.
    async fn delete(&self, location: &str) -> Result<bool>;

    /// Whether a blob exists at `location`.
    async fn exists(&self, location: &str) -> Result<bool>;

    /// Short identifier for logs.
    fn backend_name(&self) -> &'static str;

    /// Store a complete buffer and return its location.
    async fn put(&self, data: Bytes) -> Result<String> {
        let mut writer = self.put_stream().await?;
        if let Err(e) = writer.write(data).await {
            abort_quietly(writer).await;
            return Err(e);
        }
        writer.finish().await
    }

    /// Copy a blob to a fresh location.
    async fn copy(&self, location: &str) -> Result<String> {
        let data = self.get(location).await?;
        self.put(data).await
    }

    /// Verify the backend is usable.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// An in-progress blob write.
///
/// Dropping a writer without calling `finish` discards what was written.
#[async_trait]
pub trait BlobWriter: Send {
    /// Append a chunk.
    async fn write(&mut self, data: Bytes) -> Result<()>;

    /// Make the blob durable and return its location.
    async fn finish(self: Box<Self>) -> Result<String>;

    /// Discard the partial blob.
    async fn abort(self: Box<Self>) -> Result<()>;
}

/// Abort a writer, logging instead of failing.
pub async fn abort_quietly(writer: Box<dyn BlobWriter>) {
    if let Err(e) = writer.abort().await {
        warn!(error = %e, "Failed to abort partial blob");
    }
}

/// Blob store on the local filesystem.
///
/// Blobs are stored in a sharded directory structure, with writes staged
/// under `tmp/` and renamed into place when finished:
/// ```text
/// {base_path}/
/// ├── ab/
/// │   └── ab12cd34-5678-90ab-cdef-123456789012
/// ├── cd/
/// │   └── cd90ab12-3456-7890-abcd-ef1234567890
/// └── tmp/
///     └── 0f1e2d3c-....part
/// ```
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(base_path.join(STAGING_DIR))?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Generate a new location: `{shard}/{uuid}`.
    fn generate_location() -> String {
        let uuid = Uuid::new_v4().to_string();
        format!("{}/{}", &uuid[..2], uuid)
    }

    /// Resolve a location to a path inside the store.
    ///
    /// Locations are relative paths made of normal components only.
    fn blob_path(&self, location: &str) -> Result<PathBuf> {
        let invalid = || FilestoreError::Validation(format!("invalid blob location: {location}"));

        if location.is_empty()
            || location.contains("..")
            || location.starts_with('/')
            || location.starts_with('\\')
        {
            return Err(invalid());
        }
        if !Path::new(location)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(invalid());
        }
        if location.starts_with(STAGING_DIR) {
            return Err(invalid());
        }

        Ok(self.base_path.join(location))
    }

    /// Number of unfinished writes currently staged.
    pub fn staged_count(&self) -> Result<usize> {
        let count = fs::read_dir(self.base_path.join(STAGING_DIR))?
            .flatten()
            .filter(|e| e.path().is_file())
            .count();
        Ok(count)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put_stream(&self) -> Result<Box<dyn BlobWriter>> {
        let location = Self::generate_location();
        let final_path = self.blob_path(&location)?;
        let staging_path = self
            .base_path
            .join(STAGING_DIR)
            .join(format!("{}.part", Uuid::new_v4()));

        let file = tokio::fs::File::create(&staging_path).await?;
        debug!(location = %location, "Started blob write");

        Ok(Box::new(LocalBlobWriter {
            file: Some(file),
            staging_path,
            final_path,
            location,
            completed: false,
        }))
    }

    async fn get(&self, location: &str) -> Result<Bytes> {
        let path = self.blob_path(location)?;

        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FilestoreError::NotFound(format!("blob {location}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, location: &str) -> Result<bool> {
        let path = self.blob_path(location)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, location: &str) -> Result<bool> {
        let path = self.blob_path(location)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn health_check(&self) -> Result<()> {
        let meta = tokio::fs::metadata(self.base_path.join(STAGING_DIR)).await?;
        if meta.is_dir() {
            Ok(())
        } else {
            Err(FilestoreError::StorageUnavailable(
                "blob staging directory is missing".to_string(),
            ))
        }
    }
}

/// Streaming write into a staging file.
struct LocalBlobWriter {
    file: Option<tokio::fs::File>,
    staging_path: PathBuf,
    final_path: PathBuf,
    location: String,
    completed: bool,
}

#[async_trait]
impl BlobWriter for LocalBlobWriter {
    async fn write(&mut self, data: Bytes) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| FilestoreError::Io(io::Error::other("blob writer is closed")))?;
        file.write_all(&data).await?;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> Result<String> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        if let Some(parent) = self.final_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(&self.staging_path, &self.final_path).await?;
        self.completed = true;

        debug!(location = %self.location, "Finished blob write");
        Ok(self.location.clone())
    }

    async fn abort(mut self: Box<Self>) -> Result<()> {
        drop(self.file.take());
        self.completed = true;

        match tokio::fs::remove_file(&self.staging_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for LocalBlobWriter {
    fn drop(&mut self) {
        if !self.completed {
            drop(self.file.take());
            if let Err(e) = fs::remove_file(&self.staging_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = ?self.staging_path, error = %e, "Failed to remove staged blob");
                }
            }
        }
    }
}
