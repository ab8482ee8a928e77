//! Router configuration for Web API.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    delete_file, download_file, fast_upload, get_file, health_check, list_files, relocate_file,
    rename_file, signin, signout, signup, upload_file, user_info, AppState,
};
use super::middleware::create_cors_layer;

/// Room for multipart boundaries and the name field on top of the file bytes.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the main API router.
///
/// `max_upload_size` bounds the request body; the upload itself enforces the
/// exact limit on file content.
pub fn create_router(
    app_state: Arc<AppState>,
    cors_origins: &[String],
    max_upload_size: u64,
) -> Router {
    let user_routes = Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/info", get(user_info));

    let body_limit = usize::try_from(max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let file_routes = Router::new()
        .route("/", get(list_files).post(upload_file))
        .route("/fast-upload", post(fast_upload))
        .route(
            "/:fingerprint",
            get(get_file).patch(rename_file).delete(delete_file),
        )
        .route("/:fingerprint/content", get(download_file))
        .route("/:fingerprint/relocate", post(relocate_file))
        .layer(DefaultBodyLimit::max(body_limit));

    let api_routes = Router::new()
        .nest("/user", user_routes)
        .nest("/files", file_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::Config;
    use crate::db::Database;
    use crate::file::LocalBlobStore;

    #[tokio::test]
    async fn test_create_routers() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let store = Arc::new(LocalBlobStore::new(dir.path()).unwrap());
        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret".to_string();

        let state = Arc::new(AppState::from_config(db, store, &config));
        let _router = create_router(state.clone(), &[], u64::MAX)
            .merge(create_health_router(state));
    }
}
