// src/db/models/rpm_item.rs

//! RpmItem model - an RPM package identified by its NEVRA

use super::ItemKind;
use crate::db::TransactionStore;
use crate::error::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

/// An RPM package recorded in history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpmItem {
    id: Option<i64>,
    pub name: String,
    pub epoch: i32,
    pub version: String,
    pub release: String,
    pub arch: String,
    /// Repository the package originated from
    pub repo: String,
}

impl RpmItem {
    /// Create a new, unsaved RPM item
    pub fn new(
        name: impl Into<String>,
        epoch: i32,
        version: impl Into<String>,
        release: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            epoch,
            version: version.into(),
            release: release.into(),
            arch: arch.into(),
            repo: String::new(),
        }
    }

    /// Set the repository of origin
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = repo.into();
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Forget the stored id so the next save writes a new record
    pub(crate) fn detach(&mut self) {
        self.id = None;
    }

    /// `name-[epoch:]version-release.arch`, epoch omitted when zero
    pub fn nevra(&self) -> String {
        if self.epoch == 0 {
            format!("{}-{}-{}.{}", self.name, self.version, self.release, self.arch)
        } else {
            format!(
                "{}-{}:{}-{}.{}",
                self.name, self.epoch, self.version, self.release, self.arch
            )
        }
    }

    /// Insert or update this package, returning its item id
    pub fn save(&mut self, tx: &rusqlite::Transaction) -> Result<i64> {
        let id = match self.id {
            Some(id) => {
                let updated = tx.execute(
                    "UPDATE rpm_item SET name = ?1, epoch = ?2, version = ?3, release = ?4, arch = ?5, repo = ?6
                     WHERE item_id = ?7",
                    params![
                        &self.name,
                        self.epoch,
                        &self.version,
                        &self.release,
                        &self.arch,
                        &self.repo,
                        id
                    ],
                )?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("rpm item {id}")));
                }
                id
            }
            None => {
                let id = TransactionStore::next_id(tx, ItemKind::Rpm)?;
                tx.execute(
                    "INSERT INTO rpm_item (item_id, name, epoch, version, release, arch, repo)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        id,
                        &self.name,
                        self.epoch,
                        &self.version,
                        &self.release,
                        &self.arch,
                        &self.repo
                    ],
                )?;
                id
            }
        };

        self.id = Some(id);
        debug!("Saved rpm item {} ({})", id, self.nevra());
        Ok(id)
    }

    /// Load a package by item id
    pub fn load(conn: &Connection, id: i64) -> Result<Self> {
        let mut stmt = conn.prepare(
            "SELECT item_id, name, epoch, version, release, arch, repo
             FROM rpm_item WHERE item_id = ?1",
        )?;

        stmt.query_row([id], Self::from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("rpm item {id}")))
    }

    /// Convert a database row to an RpmItem
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            epoch: row.get(2)?,
            version: row.get(3)?,
            release: row.get(4)?,
            arch: row.get(5)?,
            repo: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> TransactionStore {
        let store = TransactionStore::open_in_memory().unwrap();
        store.create_database().unwrap();
        store
    }

    #[test]
    fn test_nevra() {
        let bash = RpmItem::new("bash", 0, "5.2.26", "1.fc40", "x86_64");
        assert_eq!(bash.nevra(), "bash-5.2.26-1.fc40.x86_64");

        let perl = RpmItem::new("perl-Time-HiRes", 4, "1.9775", "505.fc40", "x86_64");
        assert_eq!(perl.nevra(), "perl-Time-HiRes-4:1.9775-505.fc40.x86_64");
    }

    #[test]
    fn test_save_and_load() {
        let mut store = create_test_store();

        let mut rpm = RpmItem::new("kernel", 0, "6.8.5", "301.fc40", "x86_64").with_repo("updates");
        let id = store.run_atomic(|tx| rpm.save(tx)).unwrap();
        assert_eq!(rpm.id(), Some(id));

        let loaded = RpmItem::load(store.conn(), id).unwrap();
        assert_eq!(loaded, rpm);
    }

    #[test]
    fn test_resave_updates_in_place() {
        let mut store = create_test_store();

        let mut rpm = RpmItem::new("kernel", 0, "6.8.5", "301.fc40", "x86_64");
        let id = store.run_atomic(|tx| rpm.save(tx)).unwrap();
        rpm.repo = "fedora".to_string();
        assert_eq!(store.run_atomic(|tx| rpm.save(tx)).unwrap(), id);

        let conn = store.conn();
        assert_eq!(RpmItem::load(conn, id).unwrap().repo, "fedora");
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM rpm_item", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_load_missing() {
        let store = create_test_store();
        assert!(matches!(RpmItem::load(store.conn(), 7), Err(Error::NotFound(_))));
    }
}
