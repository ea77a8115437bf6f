// src/db/models/transaction_item.rs

//! TransactionItem model - an item bound to a transaction
//!
//! A transaction item records what was done to an item (action), why
//! (reason), and whether it succeeded (state). Items start out `Started`
//! and move once to `Ok` or `Error`.

use super::Item;
use crate::error::{Error, Result};
use rusqlite::{Connection, params};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use tracing::debug;

/// What was done to an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransactionItemAction {
    Install,
    Downgrade,
    Downgraded,
    Obsolete,
    Obsoleted,
    Upgrade,
    Upgraded,
    Remove,
    Reinstall,
    Reinstalled,
    ReasonChange,
}

/// Why the item was part of the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransactionItemReason {
    Unknown,
    Dependency,
    User,
    Clean,
    WeakDependency,
    Group,
}

/// Outcome of the work done on one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransactionItemState {
    Started,
    Ok,
    Error,
}

impl TransactionItemState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionItemState::Started)
    }
}

/// An item together with the action taken on it in one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionItem {
    /// Row id in `trans_item`, set once persisted
    id: Option<i64>,
    /// Owning transaction, set once the owner has been started
    transaction_id: Option<i64>,
    item: Item,
    repo_id: String,
    action: TransactionItemAction,
    reason: TransactionItemReason,
    state: TransactionItemState,
}

impl TransactionItem {
    pub(crate) fn new(
        item: Item,
        repo_id: String,
        action: TransactionItemAction,
        reason: TransactionItemReason,
    ) -> Self {
        Self {
            id: None,
            transaction_id: None,
            item,
            repo_id,
            action,
            reason,
            state: TransactionItemState::Started,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Id of the owning transaction; resolve it through that `Transaction`
    pub fn transaction_id(&self) -> Option<i64> {
        self.transaction_id
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Mutable access to the item; changes are written on the owner's next save
    pub fn item_mut(&mut self) -> &mut Item {
        &mut self.item
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    pub fn action(&self) -> TransactionItemAction {
        self.action
    }

    pub fn reason(&self) -> TransactionItemReason {
        self.reason
    }

    pub fn state(&self) -> TransactionItemState {
        self.state
    }

    /// Record the outcome for this item
    ///
    /// Only `Started -> Ok` and `Started -> Error` are allowed.
    pub fn set_state(&mut self, state: TransactionItemState) -> Result<()> {
        if self.state.is_terminal() || !state.is_terminal() {
            return Err(Error::InvalidState(format!(
                "cannot move transaction item {} from {} to {}",
                self.item, self.state, state
            )));
        }

        self.state = state;
        Ok(())
    }

    /// Persist the item and its `trans_item` row at `position`
    ///
    /// An item already recorded by another transaction is saved as a new
    /// copy; history rows of other transactions are never rewritten.
    pub(crate) fn save(
        &mut self,
        tx: &rusqlite::Transaction,
        trans_id: i64,
        position: usize,
    ) -> Result<()> {
        if let Some(item_id) = self.item.id()
            && recorded_by_other_transaction(tx, item_id, trans_id)?
        {
            debug!(
                "Item {} already belongs to another transaction, recording a copy",
                item_id
            );
            self.item.detach();
        }
        let item_id = self.item.save(tx)?;

        match self.id {
            Some(row_id) => {
                tx.execute(
                    "UPDATE trans_item SET item_id = ?1, repo_id = ?2, action = ?3, reason = ?4,
                     state = ?5, position = ?6
                     WHERE id = ?7",
                    params![
                        item_id,
                        &self.repo_id,
                        self.action,
                        self.reason,
                        self.state,
                        position as i64,
                        row_id
                    ],
                )?;
            }
            None => {
                tx.execute(
                    "INSERT INTO trans_item (trans_id, item_id, repo_id, action, reason, state, position)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        trans_id,
                        item_id,
                        &self.repo_id,
                        self.action,
                        self.reason,
                        self.state,
                        position as i64
                    ],
                )?;
                self.id = Some(tx.last_insert_rowid());
            }
        }

        self.transaction_id = Some(trans_id);
        debug!(
            "Saved transaction item {} at position {} ({} {})",
            self.item, position, self.action, self.state
        );
        Ok(())
    }

    /// Items of a transaction in insertion order, with their items loaded
    pub fn find_by_transaction(conn: &Connection, trans_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, item_id, repo_id, action, reason, state FROM trans_item
             WHERE trans_id = ?1 ORDER BY position",
        )?;

        let rows = stmt
            .query_map([trans_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, TransactionItemAction>(3)?,
                    row.get::<_, TransactionItemReason>(4)?,
                    row.get::<_, TransactionItemState>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, item_id, repo_id, action, reason, state)| {
                Ok(Self {
                    id: Some(id),
                    transaction_id: Some(trans_id),
                    item: Item::load(conn, item_id)?,
                    repo_id,
                    action,
                    reason,
                    state,
                })
            })
            .collect()
    }
}

fn recorded_by_other_transaction(conn: &Connection, item_id: i64, trans_id: i64) -> Result<bool> {
    let found = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM trans_item WHERE item_id = ?1 AND trans_id != ?2)",
        params![item_id, trans_id],
        |row| row.get(0),
    )?;
    Ok(found)
}
