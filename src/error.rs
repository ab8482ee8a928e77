//! Error types for filestore.

use thiserror::Error;

/// Common error type for filestore.
#[derive(Error, Debug)]
pub enum FilestoreError {
    /// Database error.
    ///
    /// A statement was rejected by the metadata store for a reason that retrying
    /// will not fix (constraint violation, malformed SQL, decode failure).
    #[error("database error: {0}")]
    Database(String),

    /// The backing store is unreachable or contended (pool timeout, locked database).
    ///
    /// This is the only error class the upload path retries.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected failure inside the service.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FilestoreError {
    /// Whether the failed operation may succeed if attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(self, FilestoreError::StorageUnavailable(_))
    }
}

// SQLite reports contention as SQLITE_BUSY (5) or SQLITE_LOCKED (6).
fn is_sqlite_contention(code: Option<&str>, message: &str) -> bool {
    matches!(code, Some("5") | Some("6") | Some("517") | Some("262"))
        || message.contains("database is locked")
        || message.contains("database table is locked")
}

impl From<sqlx::Error> for FilestoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                FilestoreError::StorageUnavailable(e.to_string())
            }
            sqlx::Error::Database(db_err)
                if is_sqlite_contention(db_err.code().as_deref(), db_err.message()) =>
            {
                FilestoreError::StorageUnavailable(e.to_string())
            }
            _ => FilestoreError::Database(e.to_string()),
        }
    }
}

/// Result type alias for filestore operations.
pub type Result<T> = std::result::Result<T, FilestoreError>;
