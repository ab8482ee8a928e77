//! Web server for filestore.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::{FilestoreError, Result};

use super::handlers::AppState;
use super::router::{create_health_router, create_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    cors_origins: Vec<String>,
    max_upload_size: u64,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, app_state: Arc<AppState>) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| FilestoreError::Config(format!("invalid server address: {e}")))?;

        Ok(Self {
            addr,
            app_state,
            cors_origins: config.server.cors_origins.clone(),
            max_upload_size: config.storage.max_upload_size_bytes(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn into_router(self) -> Router {
        create_router(
            self.app_state.clone(),
            &self.cors_origins,
            self.max_upload_size,
        )
        .merge(create_health_router(self.app_state))
        .layer(CompressionLayer::new())
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        let router = self.into_router();

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        let router = self.into_router();

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use crate::db::Database;
    use crate::file::LocalBlobStore;

    fn create_test_config() -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0; // Use random port
        config.auth.jwt_secret = "test-secret-key".to_string();
        config
    }

    async fn create_state(config: &Config, dir: &tempfile::TempDir) -> Arc<AppState> {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let store = Arc::new(LocalBlobStore::new(dir.path()).unwrap());
        Arc::new(AppState::from_config(db, store, config))
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config();
        let state = create_state(&config, &dir).await;

        let server = WebServer::new(&config, state).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_web_server_invalid_address() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config();
        config.server.host = "not an address".to_string();
        let state = create_state(&config, &dir).await;

        assert!(matches!(
            WebServer::new(&config, state),
            Err(FilestoreError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config();
        let state = create_state(&config, &dir).await;

        let server = WebServer::new(&config, state).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"status\":\"ok\""));
    }
}
