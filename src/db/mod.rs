// src/db/mod.rs

//! Database layer for the software history
//!
//! All history lives in one SQLite database. `TransactionStore` is the only
//! handle the rest of the crate persists through; the free functions here
//! open and initialize databases the way the store and the CLI need them.

pub mod migrations;
pub mod models;
pub mod paths;
pub mod schema;
mod store;

pub use store::{TransactionStore, TransactionSummary};

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Create the database file (and its directory) and bring the schema up to date
pub fn init(db_path: impl AsRef<Path>) -> Result<()> {
    let db_path = db_path.as_ref();
    std::fs::create_dir_all(paths::db_dir(db_path))?;

    info!("Initializing history database at {}", db_path.display());
    let conn = open(db_path)?;
    schema::migrate(&conn)
}

/// Open a connection configured for history access
///
/// Foreign keys are enforced and the journal runs in WAL mode so readers in
/// other processes never block on, or observe, an uncommitted write.
pub fn open(db_path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    configure(&conn)?;
    Ok(conn)
}

/// Per-connection settings shared by file-backed and in-memory databases
pub(crate) fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

/// Run `f` inside a SQLite transaction
///
/// Commits when `f` returns `Ok`; any error rolls every write back.
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&rusqlite::Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_parent_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested/history.sqlite");

        init(&db_path).unwrap();

        assert!(db_path.exists());
        let conn = open(&db_path).unwrap();
        assert_eq!(schema::get_schema_version(&conn).unwrap(), schema::SCHEMA_VERSION);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();

        let result: Result<()> = transaction(&mut conn, |tx| {
            tx.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Err(crate::Error::InvalidState("abort".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
    }
}
