// src/lib.rs

//! swdb - software history database
//!
//! Records every package-management operation as a durable transaction of
//! heterogeneous items and reconstructs it later for auditing, rollback
//! planning or display.
//!
//! # Architecture
//!
//! - Database-first: all history in SQLite, written through `TransactionStore`
//! - Items: RPM packages, comps groups and comps environments share one id space
//! - Transactions: `begin` and `finish` are each one atomic unit of work
//! - Reconstruction: `Transaction::load` rebuilds items and memberships in order
//!
//! ```no_run
//! use swdb::{
//!     CompsEnvironmentItem, CompsPackageType, Transaction, TransactionItemAction,
//!     TransactionItemReason, TransactionItemState, TransactionState, TransactionStore,
//! };
//!
//! # fn main() -> swdb::Result<()> {
//! let mut store = TransactionStore::open("/var/lib/swdb/history.sqlite")?;
//! store.create_database()?;
//!
//! let mut env = CompsEnvironmentItem::new("minimal");
//! env.add_group("core", true, CompsPackageType::MANDATORY);
//!
//! let mut trans = Transaction::new();
//! trans
//!     .add_item(env, "", TransactionItemAction::Install, TransactionItemReason::User)?
//!     .set_state(TransactionItemState::Ok)?;
//! trans.begin(&mut store)?;
//! trans.finish(&mut store, TransactionState::Done)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
mod error;

pub use config::HistoryConfig;
pub use db::models::{
    CompsEnvironmentGroup, CompsEnvironmentItem, CompsGroupItem, CompsGroupPackage,
    CompsPackageType, ConsoleOutputLine, Item, ItemKind, RpmItem, Transaction, TransactionItem,
    TransactionItemAction, TransactionItemReason, TransactionItemState, TransactionState,
};
pub use db::{TransactionStore, TransactionSummary};
pub use error::{Error, Result};
