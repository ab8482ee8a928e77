use std::sync::Arc;

use tracing::{error, info};

use filestore::{AppState, Config, Database, LocalBlobStore, WebServer};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = filestore::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        filestore::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> filestore::Result<()> {
    info!("filestore starting");

    let db = Database::open(&config.database.path, config.database.max_connections).await?;
    let db = Arc::new(db);
    info!(path = %config.database.path, "Metadata store opened");

    let store = Arc::new(LocalBlobStore::new(&config.storage.path)?);
    info!(path = %config.storage.path, "Blob store ready");

    let state = Arc::new(AppState::from_config(db, store, &config));
    let server = WebServer::new(&config, state)?;
    info!("Server configured on {}", server.addr());

    server.run().await?;
    Ok(())
}
