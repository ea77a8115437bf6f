// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

use swdb::{CompsEnvironmentItem, CompsPackageType, TransactionStore};
use tempfile::TempDir;

/// Create an initialized history database in a temporary directory.
///
/// Returns (TempDir, db_path) - keep the TempDir alive to prevent cleanup.
pub fn setup_history_db() -> (TempDir, std::path::PathBuf) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("history.sqlite");
    swdb::db::init(&db_path).unwrap();
    (temp_dir, db_path)
}

/// Open a second, independent store on the same file
pub fn open_store(db_path: &std::path::Path) -> TransactionStore {
    let store = TransactionStore::open(db_path).unwrap();
    store.create_database().unwrap();
    store
}

/// The "minimal" environment: `core` added first, then `base`
pub fn minimal_environment() -> CompsEnvironmentItem {
    let mut env = CompsEnvironmentItem::new("minimal");
    env.name = "Minimal Environment".to_string();
    env.add_group("core", true, CompsPackageType::MANDATORY);
    env.add_group("base", false, CompsPackageType::OPTIONAL);
    env
}
