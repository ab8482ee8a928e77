//! Configuration module for filestore.

use serde::Deserialize;
use std::path::Path;

use crate::{FilestoreError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Metadata database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Size of the connection pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/filestore.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the local blob store.
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_storage_path() -> String {
    "data/blobs".to_string()
}

fn default_max_upload_size() -> u64 {
    100
}

impl StorageConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Upload orchestration configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Extra attempts at registering metadata after a transient store error.
    #[serde(default = "default_register_retries")]
    pub register_retries: u32,
    /// Base delay between registration attempts in milliseconds (grows linearly).
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

fn default_register_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    50
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            register_retries: default_register_retries(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// JWT secret key (must be set).
    #[serde(default)]
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,
}

fn default_token_expiry() -> u64 {
    86400 // 1 day
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_expiry_secs: default_token_expiry(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filestore.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload orchestration.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Authentication.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FilestoreError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FilestoreError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILESTORE_JWT_SECRET`: Override the JWT secret key
    /// - `FILESTORE_DATABASE_PATH`: Override the database file path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("FILESTORE_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.auth.jwt_secret = jwt_secret;
            }
        }

        if let Ok(path) = std::env::var("FILESTORE_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The JWT secret is not set
    /// - The maximum upload size is zero
    /// - The connection pool is empty
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(FilestoreError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via FILESTORE_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.storage.max_upload_size_mb == 0 {
            return Err(FilestoreError::Config(
                "storage.max_upload_size_mb must be greater than zero".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(FilestoreError::Config(
                "database.max_connections must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
