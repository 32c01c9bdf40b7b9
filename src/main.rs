use std::sync::Arc;

use tracing::info;

use depot::store::{ContentStore, DatabaseContentStore, LocalFsContentStore, MemoryContentStore};
use depot::{Config, Database, FileService};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = depot::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        depot::logging::init_console_only(&config.logging.level);
    }

    info!("Depot - hosted file depot");

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database {}: {e}", config.database.path);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn ContentStore> = match config.storage.backend.as_str() {
        "memory" => Arc::new(MemoryContentStore::new()),
        "database" => Arc::new(DatabaseContentStore::new(db.pool().clone())),
        _ => match LocalFsContentStore::new(&config.storage.root) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                eprintln!("Failed to open storage root {}: {e}", config.storage.root);
                std::process::exit(1);
            }
        },
    };

    let _service = FileService::new(db, store).with_storage_config(&config.storage);

    info!(
        "File service ready ({} backend, database {})",
        config.storage.backend, config.database.path
    );
}
