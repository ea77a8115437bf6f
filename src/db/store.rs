// src/db/store.rs

//! TransactionStore - the persistence boundary for transaction history
//!
//! The store owns one SQLite connection. Every write made by a transaction
//! or item goes through `run_atomic`, so other connections see a transaction
//! either completely written or not at all.

use super::models::{
    CompsEnvironmentGroup, CompsGroupPackage, Item, ItemKind, TransactionItem, TransactionState,
    timestamp_column,
};
use super::schema;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::debug;

/// Header-level view of a transaction for history listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSummary {
    pub id: i64,
    pub dt_begin: DateTime<Utc>,
    pub dt_end: Option<DateTime<Utc>>,
    pub state: TransactionState,
    pub cmdline: String,
    pub item_count: usize,
}

impl TransactionSummary {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let dt_begin = timestamp_column(row, 1)?.ok_or(rusqlite::Error::InvalidColumnType(
            1,
            "dt_begin".to_string(),
            rusqlite::types::Type::Null,
        ))?;
        let item_count: i64 = row.get(5)?;

        Ok(Self {
            id: row.get(0)?,
            dt_begin,
            dt_end: timestamp_column(row, 2)?,
            state: row.get(3)?,
            cmdline: row.get(4)?,
            item_count: item_count as usize,
        })
    }
}

/// Gateway to the history database
pub struct TransactionStore {
    conn: Connection,
}

impl TransactionStore {
    /// Open (or create) a history database file
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = super::open(db_path)?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wrap an already opened connection
    pub fn from_connection(conn: Connection) -> Result<Self> {
        super::configure(&conn)?;
        Ok(Self { conn })
    }

    /// Ensure the schema exists and is current; safe to call repeatedly
    pub fn create_database(&self) -> Result<()> {
        schema::migrate(&self.conn)
    }

    /// Read access for queries outside a unit of work
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `work` as one atomic unit: all of its writes commit or none do
    pub fn run_atomic<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T>,
    {
        super::transaction(&mut self.conn, work)
    }

    /// Allocate the next id in the item id space shared by every item kind
    ///
    /// Must run inside the unit of work that writes the item. Committed ids
    /// increase monotonically and are never reused, even after deletion.
    pub fn next_id(conn: &Connection, kind: ItemKind) -> Result<i64> {
        conn.execute("INSERT INTO item (kind) VALUES (?1)", [kind.as_str()])?;
        let id = conn.last_insert_rowid();
        debug!("Allocated {} item id {}", kind.as_str(), id);
        Ok(id)
    }

    /// Items of a transaction, ordered by insertion position
    pub fn transaction_items(&self, trans_id: i64) -> Result<Vec<TransactionItem>> {
        TransactionItem::find_by_transaction(&self.conn, trans_id)
    }

    /// Every item of one kind, oldest first
    pub fn items_of_kind(&self, kind: ItemKind) -> Result<Vec<Item>> {
        Item::ids_of_kind(&self.conn, kind)?
            .into_iter()
            .map(|id| Item::load(&self.conn, id))
            .collect()
    }

    /// Group memberships of an environment item, ordered by position
    pub fn environment_groups(&self, environment_item_id: i64) -> Result<Vec<CompsEnvironmentGroup>> {
        CompsEnvironmentGroup::find_by_environment(&self.conn, environment_item_id)
    }

    /// Packages of a group item, ordered by position
    pub fn group_packages(&self, group_item_id: i64) -> Result<Vec<CompsGroupPackage>> {
        CompsGroupPackage::find_by_group(&self.conn, group_item_id)
    }

    /// Transaction headers, newest first; `None` lists everything
    pub fn list_transactions(&self, limit: Option<usize>) -> Result<Vec<TransactionSummary>> {
        let limit = match limit {
            Some(limit) => i64::try_from(limit)
                .map_err(|_| Error::InvalidState(format!("listing limit too large: {limit}")))?,
            None => -1,
        };

        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.dt_begin, t.dt_end, t.state, t.cmdline,
                    (SELECT COUNT(*) FROM trans_item ti WHERE ti.trans_id = t.id)
             FROM trans t ORDER BY t.id DESC LIMIT ?1",
        )?;

        let summaries = stmt
            .query_map([limit], TransactionSummary::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(summaries)
    }

    /// Id of the most recently begun transaction
    pub fn last_transaction_id(&self) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT MAX(id) FROM trans", [], |row| row.get(0))
            .optional()?
            .flatten();
        Ok(id)
    }

    /// Transactions that touched an RPM of the given name, newest first
    pub fn transactions_with_item_name(&self, name: &str) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT ti.trans_id FROM trans_item ti
             JOIN rpm_item r ON r.item_id = ti.item_id
             WHERE r.name = ?1
             ORDER BY ti.trans_id DESC",
        )?;

        let ids = stmt
            .query_map([name], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        CompsEnvironmentItem, CompsGroupItem, CompsPackageType, RpmItem, Transaction,
        TransactionItemAction, TransactionItemReason,
    };

    fn create_test_store() -> TransactionStore {
        let store = TransactionStore::open_in_memory().unwrap();
        store.create_database().unwrap();
        store
    }

    fn record(store: &mut TransactionStore, names: &[&str], state: TransactionState) -> i64 {
        let mut trans = Transaction::new();
        trans.set_cmdline(format!("install {}", names.join(" ")));
        for name in names {
            trans
                .add_item(
                    RpmItem::new(*name, 0, "1.0", "1", "noarch"),
                    "fedora",
                    TransactionItemAction::Install,
                    TransactionItemReason::User,
                )
                .unwrap();
        }
        let id = trans.begin(store).unwrap();
        if state.is_terminal() {
            trans.finish(store, state).unwrap();
        }
        id
    }

    #[test]
    fn test_create_database_idempotent() {
        let store = create_test_store();
        store.create_database().unwrap();
        store.create_database().unwrap();
    }

    #[test]
    fn test_next_id_monotonic_across_kinds() {
        let store = create_test_store();
        let a = TransactionStore::next_id(store.conn(), ItemKind::Rpm).unwrap();
        let b = TransactionStore::next_id(store.conn(), ItemKind::CompsEnvironment).unwrap();
        let c = TransactionStore::next_id(store.conn(), ItemKind::Rpm).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_next_id_not_reused_after_delete() {
        let store = create_test_store();
        let first = TransactionStore::next_id(store.conn(), ItemKind::Rpm).unwrap();
        store.conn().execute("DELETE FROM item WHERE id = ?1", [first]).unwrap();

        let second = TransactionStore::next_id(store.conn(), ItemKind::Rpm).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_run_atomic_rolls_back_item_save() {
        let mut store = create_test_store();

        let result: Result<()> = store.run_atomic(|tx| {
            RpmItem::new("bash", 0, "5.2", "1", "x86_64").save(tx)?;
            Err(Error::InvalidState("abort".to_string()))
        });
        assert!(result.is_err());
        assert!(store.items_of_kind(ItemKind::Rpm).unwrap().is_empty());
    }

    #[test]
    fn test_items_of_kind() {
        let mut store = create_test_store();
        store
            .run_atomic(|tx| {
                CompsGroupItem::new("core").save(tx)?;
                RpmItem::new("bash", 0, "5.2", "1", "x86_64").save(tx)?;
                CompsGroupItem::new("base").save(tx)?;
                Ok(())
            })
            .unwrap();

        let groups = store.items_of_kind(ItemKind::CompsGroup).unwrap();
        let ids: Vec<String> = groups.iter().map(|g| g.to_string()).collect();
        assert_eq!(ids, ["@core", "@base"]);
    }

    #[test]
    fn test_environment_groups_query() {
        let mut store = create_test_store();
        let mut env = CompsEnvironmentItem::new("server");
        env.add_group("core", true, CompsPackageType::MANDATORY);
        env.add_group("headless", true, CompsPackageType::DEFAULT);
        let id = store.run_atomic(|tx| env.save(tx)).unwrap();

        let groups = store.environment_groups(id).unwrap();
        let ids: Vec<&str> = groups.iter().map(|g| g.group_id()).collect();
        assert_eq!(ids, ["headless", "core"]);
    }

    #[test]
    fn test_group_packages_query() {
        let mut store = create_test_store();
        let mut group = CompsGroupItem::new("core");
        group.add_package("bash", true, CompsPackageType::MANDATORY);
        group.add_package("dnf", true, CompsPackageType::MANDATORY);
        let id = store.run_atomic(|tx| group.save(tx)).unwrap();

        let packages = store.group_packages(id).unwrap();
        let names: Vec<&str> = packages.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["dnf", "bash"]);
    }

    #[test]
    fn test_list_transactions_newest_first() {
        let mut store = create_test_store();
        let first = record(&mut store, &["bash", "zsh"], TransactionState::Done);
        let second = record(&mut store, &["tmux"], TransactionState::Error);
        let third = record(&mut store, &["vim"], TransactionState::Started);

        let all = store.list_transactions(None).unwrap();
        let ids: Vec<i64> = all.iter().map(|s| s.id).collect();
        assert_eq!(ids, [third, second, first]);
        assert_eq!(all[2].item_count, 2);
        assert_eq!(all[2].cmdline, "install bash zsh");
        assert_eq!(all[1].state, TransactionState::Error);
        assert_eq!(all[0].state, TransactionState::Started);
        assert_eq!(all[0].dt_end, None);

        let limited = store.list_transactions(Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, third);
    }

    #[test]
    fn test_last_transaction_id() {
        let mut store = create_test_store();
        assert_eq!(store.last_transaction_id().unwrap(), None);

        record(&mut store, &["bash"], TransactionState::Done);
        let last = record(&mut store, &["zsh"], TransactionState::Done);
        assert_eq!(store.last_transaction_id().unwrap(), Some(last));
    }

    #[test]
    fn test_transactions_with_item_name() {
        let mut store = create_test_store();
        let first = record(&mut store, &["bash", "zsh"], TransactionState::Done);
        record(&mut store, &["tmux"], TransactionState::Done);
        let third = record(&mut store, &["bash"], TransactionState::Done);

        assert_eq!(store.transactions_with_item_name("bash").unwrap(), vec![third, first]);
        assert!(store.transactions_with_item_name("emacs").unwrap().is_empty());
    }
}
