// src/db/models/item.rs

//! Item model - the polymorphic unit recorded by a transaction
//!
//! Every item variant draws its id from the `item` table, so ids are unique
//! across packages, groups and environments. The `kind` column on that row
//! selects the variant table to read on load.

use super::{CompsEnvironmentItem, CompsGroupItem, RpmItem};
use crate::error::{Error, Result};
use rusqlite::{Connection, OptionalExtension};
use std::fmt;
use std::str::FromStr;

/// Tag stored alongside every item id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Rpm,
    CompsGroup,
    CompsEnvironment,
}

impl ItemKind {
    pub fn as_str(&self) -> &str {
        match self {
            ItemKind::Rpm => "rpm",
            ItemKind::CompsGroup => "comps_group",
            ItemKind::CompsEnvironment => "comps_environment",
        }
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "rpm" => Ok(ItemKind::Rpm),
            "comps_group" => Ok(ItemKind::CompsGroup),
            "comps_environment" => Ok(ItemKind::CompsEnvironment),
            _ => Err(format!("Invalid item kind: {s}")),
        }
    }
}

/// One package-management entity: an RPM, a comps group or a comps environment
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Rpm(RpmItem),
    CompsGroup(CompsGroupItem),
    CompsEnvironment(CompsEnvironmentItem),
}

impl Item {
    /// Store-assigned id, `None` until the item is first saved
    pub fn id(&self) -> Option<i64> {
        match self {
            Item::Rpm(rpm) => rpm.id(),
            Item::CompsGroup(group) => group.id(),
            Item::CompsEnvironment(env) => env.id(),
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Rpm(_) => ItemKind::Rpm,
            Item::CompsGroup(_) => ItemKind::CompsGroup,
            Item::CompsEnvironment(_) => ItemKind::CompsEnvironment,
        }
    }

    /// Drop the stored id; the next save inserts a fresh copy with its nested rows
    pub(crate) fn detach(&mut self) {
        match self {
            Item::Rpm(rpm) => rpm.detach(),
            Item::CompsGroup(group) => group.detach(),
            Item::CompsEnvironment(env) => env.detach(),
        }
    }

    /// Persist the variant row and its nested rows, returning the item id
    ///
    /// Every row is written inside `tx`, so a failed save leaves no partial item.
    pub fn save(&mut self, tx: &rusqlite::Transaction) -> Result<i64> {
        match self {
            Item::Rpm(rpm) => rpm.save(tx),
            Item::CompsGroup(group) => group.save(tx),
            Item::CompsEnvironment(env) => env.save(tx),
        }
    }

    /// Load any item by id, dispatching on its persisted kind
    pub fn load(conn: &Connection, id: i64) -> Result<Self> {
        let kind: Option<String> = conn
            .query_row("SELECT kind FROM item WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        let kind = kind.ok_or_else(|| Error::NotFound(format!("item {id}")))?;

        match kind.parse::<ItemKind>().map_err(Error::Schema)? {
            ItemKind::Rpm => RpmItem::load(conn, id).map(Item::Rpm),
            ItemKind::CompsGroup => CompsGroupItem::load(conn, id).map(Item::CompsGroup),
            ItemKind::CompsEnvironment => {
                CompsEnvironmentItem::load(conn, id).map(Item::CompsEnvironment)
            }
        }
    }

    /// Ids of every item of one kind, oldest first
    pub fn ids_of_kind(conn: &Connection, kind: ItemKind) -> Result<Vec<i64>> {
        let mut stmt = conn.prepare("SELECT id FROM item WHERE kind = ?1 ORDER BY id")?;

        let ids = stmt
            .query_map([kind.as_str()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ids)
    }

    pub fn as_rpm(&self) -> Option<&RpmItem> {
        match self {
            Item::Rpm(rpm) => Some(rpm),
            _ => None,
        }
    }

    pub fn as_comps_group(&self) -> Option<&CompsGroupItem> {
        match self {
            Item::CompsGroup(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_comps_group_mut(&mut self) -> Option<&mut CompsGroupItem> {
        match self {
            Item::CompsGroup(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_comps_environment(&self) -> Option<&CompsEnvironmentItem> {
        match self {
            Item::CompsEnvironment(env) => Some(env),
            _ => None,
        }
    }

    pub fn as_comps_environment_mut(&mut self) -> Option<&mut CompsEnvironmentItem> {
        match self {
            Item::CompsEnvironment(env) => Some(env),
            _ => None,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Rpm(rpm) => write!(f, "{}", rpm.nevra()),
            Item::CompsGroup(group) => write!(f, "@{}", group.group_id),
            Item::CompsEnvironment(env) => write!(f, "@^{}", env.environment_id),
        }
    }
}

impl From<RpmItem> for Item {
    fn from(rpm: RpmItem) -> Self {
        Item::Rpm(rpm)
    }
}

impl From<CompsGroupItem> for Item {
    fn from(group: CompsGroupItem) -> Self {
        Item::CompsGroup(group)
    }
}

impl From<CompsEnvironmentItem> for Item {
    fn from(env: CompsEnvironmentItem) -> Self {
        Item::CompsEnvironment(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TransactionStore;

    fn create_test_store() -> TransactionStore {
        let store = TransactionStore::open_in_memory().unwrap();
        store.create_database().unwrap();
        store
    }

    #[test]
    fn test_item_kind_round_trip() {
        for kind in [ItemKind::Rpm, ItemKind::CompsGroup, ItemKind::CompsEnvironment] {
            assert_eq!(kind.as_str().parse::<ItemKind>().unwrap(), kind);
        }
        assert!("module".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_ids_shared_across_variants() {
        let mut store = create_test_store();

        let mut rpm: Item = RpmItem::new("bash", 0, "5.2.26", "1.fc40", "x86_64").into();
        let mut group: Item = CompsGroupItem::new("core").into();
        let mut env: Item = CompsEnvironmentItem::new("minimal").into();

        let ids = store
            .run_atomic(|tx| Ok([rpm.save(tx)?, group.save(tx)?, env.save(tx)?]))
            .unwrap();
        assert!(ids[0] < ids[1] && ids[1] < ids[2]);

        assert_eq!(Item::ids_of_kind(store.conn(), ItemKind::CompsGroup).unwrap(), vec![ids[1]]);
    }

    #[test]
    fn test_load_dispatches_on_kind() {
        let mut store = create_test_store();

        let mut env: Item = CompsEnvironmentItem::new("minimal").into();
        let id = store.run_atomic(|tx| env.save(tx)).unwrap();

        let loaded = Item::load(store.conn(), id).unwrap();
        assert_eq!(loaded.kind(), ItemKind::CompsEnvironment);
        assert_eq!(loaded, env);
        assert_eq!(loaded.to_string(), "@^minimal");
    }

    #[test]
    fn test_load_unknown_id() {
        let store = create_test_store();
        assert!(matches!(Item::load(store.conn(), 42), Err(Error::NotFound(_))));
    }
}
