// src/db/models/mod.rs

//! Data models for history database entities
//!
//! This module defines Rust structs that correspond to database tables
//! and provides methods for saving and loading records.

mod comps_environment;
mod comps_group;
mod comps_type;
mod item;
mod rpm_item;
mod transaction;
mod transaction_item;

pub use comps_environment::{CompsEnvironmentGroup, CompsEnvironmentItem};
pub use comps_group::{CompsGroupItem, CompsGroupPackage};
pub use comps_type::CompsPackageType;
pub use item::{Item, ItemKind};
pub use rpm_item::RpmItem;
pub use transaction::{ConsoleOutputLine, Transaction, TransactionState};
pub use transaction_item::{
    TransactionItem, TransactionItemAction, TransactionItemReason, TransactionItemState,
};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rusqlite::Row;
use rusqlite::types::Type;

/// Store a text-backed enum through its strum string form
macro_rules! sql_text_enum {
    ($($ty:ty),+ $(,)?) => {$(
        impl rusqlite::types::ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                let text: &'static str = self.into();
                Ok(rusqlite::types::ToSqlOutput::from(text))
            }
        }

        impl rusqlite::types::FromSql for $ty {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
            }
        }
    )+};
}

sql_text_enum!(
    TransactionState,
    TransactionItemAction,
    TransactionItemReason,
    TransactionItemState,
);

/// Decode a nullable unix timestamp column
pub(crate) fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let secs: Option<i64> = row.get(idx)?;
    secs.map(|secs| {
        DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                Type::Integer,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("timestamp out of range: {secs}"),
                )),
            )
        })
    })
    .transpose()
}

/// Insert `key` at the front of `map`, replacing any entry already under it.
///
/// `update` receives the previous value (if any) and returns the value to
/// store. Every other entry keeps its relative order.
pub(crate) fn upsert_front<V>(
    map: &mut IndexMap<String, V>,
    key: String,
    update: impl FnOnce(Option<V>) -> V,
) {
    let previous = map.shift_remove(&key);
    map.shift_insert(0, key, update(previous));
}
