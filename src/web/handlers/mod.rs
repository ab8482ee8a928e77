//! API handlers.

pub mod file;
pub mod user;

pub use file::*;
pub use user::*;

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::auth::AuthService;
use crate::config::Config;
use crate::db::Database;
use crate::file::{BlobStore, FileService};
use crate::web::dto::{ApiResponse, HealthResponse};
use crate::web::error::ApiError;

/// Shared state for every request.
pub struct AppState {
    pub db: Arc<Database>,
    pub files: Arc<FileService>,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(db: Arc<Database>, files: Arc<FileService>, auth: AuthService) -> Self {
        Self { db, files, auth }
    }

    /// Build the state from configuration.
    pub fn from_config(db: Arc<Database>, store: Arc<dyn BlobStore>, config: &Config) -> Self {
        let files = Arc::new(FileService::from_config(db.clone(), store, config));
        let auth = AuthService::new(
            db.clone(),
            &config.auth.jwt_secret,
            config.auth.token_expiry_secs,
        );
        Self::new(db, files, auth)
    }
}

/// GET /health - Liveness of the metadata store and blob store.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    state.db.health_check().await?;
    state.files.store().health_check().await?;

    Ok(Json(ApiResponse::new(HealthResponse {
        status: "ok",
        storage: state.files.store().backend_name(),
    })))
}
