//! Shared test helpers for cloud-drive integration tests.

use std::sync::Arc;

use crate::config::{Config, ServerConfig, StorageConfig};
use crate::object_store::LocalStore;
use crate::storage::Database;
use crate::AppState;

/// Create a test AppState with a temporary database and local object store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig::default(),
        test_mode: true,
        max_upload_mb: 10, // 10MB for tests
        default_storage_limit: 100 * 1024 * 1024,
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let object_store =
        LocalStore::new(&files_dir, None).expect("Failed to create test object store");

    Arc::new(AppState {
        config,
        db,
        object_store: Arc::new(object_store),
    })
}
