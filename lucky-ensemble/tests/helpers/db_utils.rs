//! Database Test Utilities

use lucky_common::db::init_database;
use lucky_ensemble::{EnsembleSettings, SessionManager, SqliteStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Create a file-backed store in a temporary directory
///
/// The TempDir must be kept alive for the duration of the test.
pub async fn create_test_store() -> (TempDir, Arc<SqliteStore>) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test_lucky.db");

    let pool = init_database(&db_path).await.unwrap();
    let store = SqliteStore::new(pool).await.unwrap().with_max_lock_wait(1000);

    (temp_dir, Arc::new(store))
}

/// Store plus a session manager using it for both records and predictions
pub async fn create_test_manager(settings: EnsembleSettings) -> (TempDir, Arc<SqliteStore>, SessionManager) {
    let (temp_dir, store) = create_test_store().await;
    let manager = SessionManager::new(store.clone(), store.clone(), settings);
    (temp_dir, store, manager)
}
