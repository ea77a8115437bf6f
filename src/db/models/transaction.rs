// src/db/models/transaction.rs

//! Transaction model - one recorded package-management operation
//!
//! # Lifecycle
//!
//! ```text
//! NEW -(begin)-> STARTED -(finish Done)-> DONE
//!                        -(finish Error)-> ERROR
//! ```
//!
//! `New` only exists in memory. `begin` writes the header and every item in
//! one atomic unit and assigns the id; `finish` seals the transaction. A
//! transaction that never reaches `finish` stays `Started` in history.
//! Transactions loaded by id are read-only.

use super::{
    Item, TransactionItem, TransactionItemAction, TransactionItemReason, timestamp_column,
};
use crate::db::TransactionStore;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use tracing::{debug, info};

/// Overall state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransactionState {
    /// Not yet begun; never persisted
    New,
    /// Begun and not finished, or interrupted
    Started,
    Done,
    Error,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Done | TransactionState::Error)
    }
}

/// One line of output captured while the transaction ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleOutputLine {
    /// 1 for stdout, 2 for stderr
    pub file_descriptor: i32,
    pub line: String,
}

impl ConsoleOutputLine {
    fn insert(&self, conn: &Connection, trans_id: i64) -> Result<()> {
        conn.execute(
            "INSERT INTO console_output (trans_id, file_descriptor, line) VALUES (?1, ?2, ?3)",
            params![trans_id, self.file_descriptor, &self.line],
        )?;
        Ok(())
    }

    /// Output lines of a transaction in the order they were recorded
    pub fn find_by_transaction(conn: &Connection, trans_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT file_descriptor, line FROM console_output WHERE trans_id = ?1 ORDER BY id",
        )?;

        let lines = stmt
            .query_map([trans_id], |row| {
                Ok(Self {
                    file_descriptor: row.get(0)?,
                    line: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(lines)
    }
}

/// A package-management transaction and its ordered items
#[derive(Debug, Clone)]
pub struct Transaction {
    id: Option<i64>,
    dt_begin: Option<DateTime<Utc>>,
    dt_end: Option<DateTime<Utc>>,
    rpmdb_version_begin: String,
    rpmdb_version_end: String,
    releasever: String,
    user_id: u32,
    cmdline: String,
    comment: String,
    state: TransactionState,
    items: Vec<TransactionItem>,
    console_output: Vec<ConsoleOutputLine>,
    /// Number of `console_output` lines already written
    persisted_output: usize,
    /// Set for transactions reconstructed from history
    read_only: bool,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    /// Create a new, not yet begun transaction
    pub fn new() -> Self {
        Self {
            id: None,
            dt_begin: None,
            dt_end: None,
            rpmdb_version_begin: String::new(),
            rpmdb_version_end: String::new(),
            releasever: String::new(),
            user_id: 0,
            cmdline: String::new(),
            comment: String::new(),
            state: TransactionState::New,
            items: Vec::new(),
            console_output: Vec::new(),
            persisted_output: 0,
            read_only: false,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn dt_begin(&self) -> Option<DateTime<Utc>> {
        self.dt_begin
    }

    /// Override the begin timestamp recorded by `begin`
    pub fn set_dt_begin(&mut self, dt: DateTime<Utc>) {
        self.dt_begin = Some(dt);
    }

    pub fn dt_end(&self) -> Option<DateTime<Utc>> {
        self.dt_end
    }

    /// Override the end timestamp recorded by `finish`
    pub fn set_dt_end(&mut self, dt: DateTime<Utc>) {
        self.dt_end = Some(dt);
    }

    pub fn rpmdb_version_begin(&self) -> &str {
        &self.rpmdb_version_begin
    }

    pub fn set_rpmdb_version_begin(&mut self, version: impl Into<String>) {
        self.rpmdb_version_begin = version.into();
    }

    pub fn rpmdb_version_end(&self) -> &str {
        &self.rpmdb_version_end
    }

    pub fn set_rpmdb_version_end(&mut self, version: impl Into<String>) {
        self.rpmdb_version_end = version.into();
    }

    pub fn releasever(&self) -> &str {
        &self.releasever
    }

    pub fn set_releasever(&mut self, releasever: impl Into<String>) {
        self.releasever = releasever.into();
    }

    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    pub fn set_user_id(&mut self, user_id: u32) {
        self.user_id = user_id;
    }

    pub fn cmdline(&self) -> &str {
        &self.cmdline
    }

    pub fn set_cmdline(&mut self, cmdline: impl Into<String>) {
        self.cmdline = cmdline.into();
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    /// Whether this instance was reconstructed from history
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Items in insertion order
    pub fn items(&self) -> &[TransactionItem] {
        &self.items
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut TransactionItem> {
        self.items.get_mut(index)
    }

    /// Resolve a transaction item by the id of the item it wraps
    pub fn item_by_item_id(&self, item_id: i64) -> Option<&TransactionItem> {
        self.items.iter().find(|ti| ti.item().id() == Some(item_id))
    }

    pub fn console_output(&self) -> &[ConsoleOutputLine] {
        &self.console_output
    }

    /// Append an item with the action and reason decided by the caller
    ///
    /// A saved item may appear once per transaction: adding it again with the
    /// same action and reason returns the existing entry, anything else fails
    /// with `DuplicateItem`.
    pub fn add_item(
        &mut self,
        item: impl Into<Item>,
        repo_id: impl Into<String>,
        action: TransactionItemAction,
        reason: TransactionItemReason,
    ) -> Result<&mut TransactionItem> {
        self.ensure_writable("add an item to")?;
        let item = item.into();

        if let Some(item_id) = item.id()
            && let Some(index) = self.items.iter().position(|ti| ti.item().id() == Some(item_id))
        {
            let existing = &self.items[index];
            if existing.action() != action || existing.reason() != reason {
                return Err(Error::DuplicateItem(format!(
                    "{} is already recorded as {} ({})",
                    existing.item(),
                    existing.action(),
                    existing.reason()
                )));
            }
            return Ok(&mut self.items[index]);
        }

        self.items
            .push(TransactionItem::new(item, repo_id.into(), action, reason));
        let index = self.items.len() - 1;
        Ok(&mut self.items[index])
    }

    /// Buffer a line of console output; written on the next persisting call
    pub fn add_console_output_line(&mut self, file_descriptor: i32, line: impl Into<String>) -> Result<()> {
        self.ensure_writable("record output for")?;
        self.console_output.push(ConsoleOutputLine {
            file_descriptor,
            line: line.into(),
        });
        Ok(())
    }

    /// Persist the header and all items, assigning the transaction id
    ///
    /// The whole write is one atomic unit; on failure this instance is left
    /// untouched and `begin` can be retried.
    pub fn begin(&mut self, store: &mut TransactionStore) -> Result<i64> {
        if self.id.is_some() {
            return Err(Error::DuplicateTransaction);
        }

        let dt_begin = self.dt_begin.unwrap_or_else(Utc::now);
        let mut items = self.items.clone();
        let pending_output = &self.console_output[self.persisted_output..];

        let id = store.run_atomic(|tx| {
            tx.execute(
                "INSERT INTO trans (dt_begin, rpmdb_version_begin, releasever, user_id, cmdline, comment, state)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    dt_begin.timestamp(),
                    &self.rpmdb_version_begin,
                    &self.releasever,
                    self.user_id,
                    &self.cmdline,
                    &self.comment,
                    TransactionState::Started
                ],
            )?;
            let id = tx.last_insert_rowid();

            save_items(tx, id, &mut items)?;
            for line in pending_output {
                line.insert(tx, id)?;
            }
            Ok(id)
        })?;

        self.id = Some(id);
        self.dt_begin = Some(dt_begin);
        self.state = TransactionState::Started;
        self.items = items;
        self.persisted_output = self.console_output.len();

        info!("Began transaction {} with {} items", id, self.items.len());
        Ok(id)
    }

    /// Persist items added since `begin` and the current state of every item
    pub fn save_items(&mut self, store: &mut TransactionStore) -> Result<()> {
        let id = self.started_id("save items of")?;

        let mut items = self.items.clone();
        let pending_output = &self.console_output[self.persisted_output..];
        store.run_atomic(|tx| {
            save_items(tx, id, &mut items)?;
            for line in pending_output {
                line.insert(tx, id)?;
            }
            Ok(())
        })?;

        self.items = items;
        self.persisted_output = self.console_output.len();
        debug!("Saved {} items of transaction {}", self.items.len(), id);
        Ok(())
    }

    /// Seal the transaction with its final state
    ///
    /// `final_state` must be `Done` or `Error`. The end timestamp, overall
    /// state and every item's state are written in one atomic unit.
    pub fn finish(&mut self, store: &mut TransactionStore, final_state: TransactionState) -> Result<()> {
        let id = self.started_id("finish")?;
        if !final_state.is_terminal() {
            return Err(Error::InvalidState(format!(
                "transaction {id} cannot finish with state {final_state}"
            )));
        }

        let dt_end = self.dt_end.unwrap_or_else(Utc::now);
        let mut items = self.items.clone();
        let pending_output = &self.console_output[self.persisted_output..];

        store.run_atomic(|tx| {
            save_items(tx, id, &mut items)?;
            for line in pending_output {
                line.insert(tx, id)?;
            }
            tx.execute(
                "UPDATE trans SET dt_end = ?1, rpmdb_version_end = ?2, comment = ?3, state = ?4
                 WHERE id = ?5",
                params![
                    dt_end.timestamp(),
                    &self.rpmdb_version_end,
                    &self.comment,
                    final_state,
                    id
                ],
            )?;
            Ok(())
        })?;

        self.dt_end = Some(dt_end);
        self.state = final_state;
        self.items = items;
        self.persisted_output = self.console_output.len();

        info!("Finished transaction {} with state {}", id, final_state);
        Ok(())
    }

    /// Reconstruct a transaction, its items and their memberships by id
    pub fn load(store: &TransactionStore, id: i64) -> Result<Self> {
        let conn = store.conn();
        let mut stmt = conn.prepare(
            "SELECT id, dt_begin, dt_end, rpmdb_version_begin, rpmdb_version_end, releasever,
                    user_id, cmdline, comment, state
             FROM trans WHERE id = ?1",
        )?;

        let mut trans = stmt
            .query_row([id], Self::from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("transaction {id}")))?;

        trans.items = store.transaction_items(id)?;
        trans.console_output = ConsoleOutputLine::find_by_transaction(conn, id)?;
        trans.persisted_output = trans.console_output.len();

        debug!("Loaded transaction {} with {} items", id, trans.items.len());
        Ok(trans)
    }

    /// Id of a started, writable transaction
    fn started_id(&self, operation: &str) -> Result<i64> {
        let id = self.id.ok_or_else(|| {
            Error::InvalidState(format!("cannot {operation} a transaction that has not begun"))
        })?;
        self.ensure_writable(operation)?;
        if self.state != TransactionState::Started {
            return Err(Error::InvalidState(format!(
                "cannot {operation} transaction {id}: already {}",
                self.state
            )));
        }
        Ok(id)
    }

    fn ensure_writable(&self, operation: &str) -> Result<()> {
        if self.read_only {
            return Err(Error::InvalidState(format!(
                "cannot {operation} transaction {} loaded from history",
                self.id.unwrap_or_default()
            )));
        }
        if self.state.is_terminal() {
            return Err(Error::InvalidState(format!(
                "cannot {operation} transaction {}: already {}",
                self.id.unwrap_or_default(),
                self.state
            )));
        }
        Ok(())
    }

    /// Convert a database row to a Transaction header (items loaded separately)
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let dt_begin = timestamp_column(row, 1)?;

        Ok(Self {
            id: Some(row.get(0)?),
            dt_begin,
            dt_end: timestamp_column(row, 2)?,
            rpmdb_version_begin: row.get(3)?,
            rpmdb_version_end: row.get(4)?,
            releasever: row.get(5)?,
            user_id: row.get(6)?,
            cmdline: row.get(7)?,
            comment: row.get(8)?,
            state: row.get(9)?,
            items: Vec::new(),
            console_output: Vec::new(),
            persisted_output: 0,
            read_only: true,
        })
    }
}

fn save_items(
    tx: &rusqlite::Transaction,
    trans_id: i64,
    items: &mut [TransactionItem],
) -> Result<()> {
    for (position, ti) in items.iter_mut().enumerate() {
        ti.save(tx, trans_id, position)?;
    }
    Ok(())
}
