//! Shared helpers for the Web API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use filestore::file::LocalBlobStore;
use filestore::web::{create_health_router, create_router, AppState};
use filestore::{Config, Database};

/// Password used for every test account.
pub const TEST_PASSWORD: &str = "password123";

/// A running test server with its backing stores.
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<Database>,
    pub store: Arc<LocalBlobStore>,
    /// Keeps the blob directory alive for the duration of the test.
    pub blob_dir: TempDir,
}

/// Create a test configuration.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.auth.jwt_secret = "test-secret-key-for-testing-only".to_string();
    config.upload.retry_backoff_ms = 1;
    config
}

/// Create a test server with an in-memory database and a temporary blob root.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(create_test_config()).await
}

pub async fn create_test_app_with(config: Config) -> TestApp {
    let db = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );
    let blob_dir = tempfile::tempdir().expect("Failed to create blob dir");
    let store = Arc::new(LocalBlobStore::new(blob_dir.path()).expect("Failed to create store"));

    let state = Arc::new(AppState::from_config(db.clone(), store.clone(), &config));
    let router = create_router(
        state.clone(),
        &config.server.cors_origins,
        config.storage.max_upload_size_bytes(),
    )
    .merge(create_health_router(state));

    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        db,
        store,
        blob_dir,
    }
}

/// Register a user and sign in, returning the access token.
pub async fn signup_and_signin(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/api/user/signup")
        .json(&json!({ "username": username, "password": TEST_PASSWORD }))
        .await;
    response.assert_status_ok();

    let response = server
        .post("/api/user/signin")
        .json(&json!({ "username": username, "password": TEST_PASSWORD }))
        .await;
    response.assert_status_ok();

    response.json::<Value>()["data"]["token"]
        .as_str()
        .expect("token missing")
        .to_string()
}

/// Attach a bearer token to a request.
pub fn authed(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(AUTHORIZATION, format!("Bearer {}", token))
}

/// Build an upload form with an optional explicit name.
pub fn upload_form(name: Option<&str>, file_name: &str, content: &[u8]) -> MultipartForm {
    let mut form = MultipartForm::new();
    if let Some(name) = name {
        form = form.add_text("name", name.to_string());
    }
    form.add_part(
        "file",
        Part::bytes(content.to_vec())
            .file_name(file_name.to_string())
            .mime_type("application/octet-stream"),
    )
}

/// Upload `content` and return the response body.
pub async fn upload(server: &TestServer, token: &str, name: &str, content: &[u8]) -> Value {
    let response = authed(server.post("/api/files"), token)
        .multipart(upload_form(Some(name), name, content))
        .await;
    response.assert_status_ok();
    response.json::<Value>()
}

/// Count the committed blobs under a blob root, ignoring the staging area.
pub fn count_blobs(root: &std::path::Path) -> usize {
    let mut count = 0;
    for entry in std::fs::read_dir(root).unwrap() {
        let entry = entry.unwrap();
        if entry.file_name() == "tmp" || !entry.path().is_dir() {
            continue;
        }
        count += std::fs::read_dir(entry.path()).unwrap().count();
    }
    count
}
