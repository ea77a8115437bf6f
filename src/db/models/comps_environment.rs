// src/db/models/comps_environment.rs

//! CompsEnvironmentItem model - a comps environment and its group memberships
//!
//! Memberships are ordered most-recent-first. `add_group` with a group id
//! that is already present updates that membership and moves it to the
//! front instead of adding a second entry. The order is persisted in the
//! `position` column of `comps_environment_group` and restored on load.

use super::{CompsPackageType, ItemKind, upsert_front};
use crate::db::TransactionStore;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

/// A comps group's membership in an environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompsEnvironmentGroup {
    group_id: String,
    installed: bool,
    group_type: CompsPackageType,
}

impl CompsEnvironmentGroup {
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn installed(&self) -> bool {
        self.installed
    }

    pub fn group_type(&self) -> CompsPackageType {
        self.group_type
    }

    /// Memberships of an environment in their persisted order
    pub fn find_by_environment(conn: &Connection, environment_item_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT groupid, installed, group_type FROM comps_environment_group
             WHERE environment_item_id = ?1 ORDER BY position",
        )?;

        let groups = stmt
            .query_map([environment_item_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(groups)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            group_id: row.get(0)?,
            installed: row.get(1)?,
            group_type: row.get(2)?,
        })
    }
}

/// A comps environment recorded in history
#[derive(Debug, Clone)]
pub struct CompsEnvironmentItem {
    id: Option<i64>,
    pub environment_id: String,
    pub name: String,
    pub translated_name: String,
    /// Group types this environment pulls in by default
    pub package_types: CompsPackageType,
    groups: IndexMap<String, CompsEnvironmentGroup>,
}

impl CompsEnvironmentItem {
    /// Create a new, unsaved environment item
    pub fn new(environment_id: impl Into<String>) -> Self {
        Self {
            id: None,
            environment_id: environment_id.into(),
            name: String::new(),
            translated_name: String::new(),
            package_types: CompsPackageType::empty(),
            groups: IndexMap::new(),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Forget the stored id so the next save writes a new record
    pub(crate) fn detach(&mut self) {
        self.id = None;
    }

    /// Record a group membership
    ///
    /// If `group_id` is already a member its `installed` flag and type are
    /// replaced and it moves to the front. Repeating an identical call leaves
    /// a single membership in the same position.
    pub fn add_group(
        &mut self,
        group_id: impl Into<String>,
        installed: bool,
        group_type: CompsPackageType,
    ) {
        let group_id = group_id.into();
        let key = group_id.clone();
        upsert_front(&mut self.groups, key, |previous| match previous {
            Some(mut group) => {
                group.installed = installed;
                group.group_type = group_type;
                group
            }
            None => CompsEnvironmentGroup {
                group_id,
                installed,
                group_type,
            },
        });
    }

    /// Memberships, most recently added or updated first
    pub fn groups(&self) -> impl ExactSizeIterator<Item = &CompsEnvironmentGroup> {
        self.groups.values()
    }

    pub fn group(&self, group_id: &str) -> Option<&CompsEnvironmentGroup> {
        self.groups.get(group_id)
    }

    /// Insert or update this environment and rewrite its membership rows
    pub fn save(&mut self, tx: &rusqlite::Transaction) -> Result<i64> {
        let id = match self.id {
            Some(id) => {
                let updated = tx.execute(
                    "UPDATE comps_environment_item SET environmentid = ?1, name = ?2,
                     translated_name = ?3, pkg_types = ?4 WHERE item_id = ?5",
                    params![
                        &self.environment_id,
                        &self.name,
                        &self.translated_name,
                        self.package_types,
                        id
                    ],
                )?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("comps environment item {id}")));
                }
                id
            }
            None => {
                let id = TransactionStore::next_id(tx, ItemKind::CompsEnvironment)?;
                tx.execute(
                    "INSERT INTO comps_environment_item (item_id, environmentid, name, translated_name, pkg_types)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        id,
                        &self.environment_id,
                        &self.name,
                        &self.translated_name,
                        self.package_types
                    ],
                )?;
                id
            }
        };

        tx.execute(
            "DELETE FROM comps_environment_group WHERE environment_item_id = ?1",
            [id],
        )?;
        let mut stmt = tx.prepare(
            "INSERT INTO comps_environment_group (environment_item_id, groupid, installed, group_type, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (position, group) in self.groups.values().enumerate() {
            stmt.execute(params![
                id,
                &group.group_id,
                group.installed,
                group.group_type,
                position as i64
            ])?;
        }

        self.id = Some(id);
        debug!(
            "Saved comps environment item {} ({}, {} groups)",
            id,
            self.environment_id,
            self.groups.len()
        );
        Ok(id)
    }

    /// Load an environment and its memberships by item id
    pub fn load(conn: &Connection, id: i64) -> Result<Self> {
        let mut stmt = conn.prepare(
            "SELECT item_id, environmentid, name, translated_name, pkg_types
             FROM comps_environment_item WHERE item_id = ?1",
        )?;

        let mut env = stmt
            .query_row([id], Self::from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("comps environment item {id}")))?;

        env.groups = CompsEnvironmentGroup::find_by_environment(conn, id)?
            .into_iter()
            .map(|group| (group.group_id.clone(), group))
            .collect();

        Ok(env)
    }

    /// Convert a database row to a CompsEnvironmentItem (groups loaded separately)
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            environment_id: row.get(1)?,
            name: row.get(2)?,
            translated_name: row.get(3)?,
            package_types: row.get(4)?,
            groups: IndexMap::new(),
        })
    }
}

impl PartialEq for CompsEnvironmentItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.environment_id == other.environment_id
            && self.name == other.name
            && self.translated_name == other.translated_name
            && self.package_types == other.package_types
            && self.groups.iter().eq(other.groups.iter())
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

    fn create_minimal_environment() -> CompsEnvironmentItem {
        let mut env = CompsEnvironmentItem::new("minimal");
        env.name = "Minimal Environment".to_string();
        env.translated_name = "translated(Minimal Environment)".to_string();
        env.package_types = CompsPackageType::DEFAULT;
        env.add_group("core", true, CompsPackageType::MANDATORY);
        env.add_group("base", false, CompsPackageType::OPTIONAL);
        env
    }

    fn group_ids(env: &CompsEnvironmentItem) -> Vec<&str> {
        env.groups().map(|g| g.group_id()).collect()
    }

    #[test]
    fn test_groups_most_recent_first() {
        let env = create_minimal_environment();
        assert_eq!(group_ids(&env), ["base", "core"]);
    }

    #[test]
    fn test_add_duplicate_group_replaces_and_promotes() {
        let mut env = create_minimal_environment();
        env.add_group("base", true, CompsPackageType::MANDATORY);

        assert_eq!(env.groups().len(), 2);
        assert_eq!(group_ids(&env), ["base", "core"]);
        let base = env.group("base").unwrap();
        assert!(base.installed());
        assert_eq!(base.group_type(), CompsPackageType::MANDATORY);

        let core = env.group("core").unwrap();
        assert!(core.installed());
        assert_eq!(core.group_type(), CompsPackageType::MANDATORY);
    }

    #[test]
    fn test_update_moves_older_group_to_front() {
        let mut env = create_minimal_environment();
        env.add_group("core", false, CompsPackageType::DEFAULT);

        assert_eq!(group_ids(&env), ["core", "base"]);
        let core = env.group("core").unwrap();
        assert!(!core.installed());
        assert_eq!(core.group_type(), CompsPackageType::DEFAULT);
    }

    #[test]
    fn test_add_group_idempotent() {
        let mut env = create_minimal_environment();
        env.add_group("base", false, CompsPackageType::OPTIONAL);
        env.add_group("base", false, CompsPackageType::OPTIONAL);

        assert_eq!(env, create_minimal_environment());
    }

    #[test]
    fn test_save_and_load() {
        let mut store = create_test_store();

        let mut env = create_minimal_environment();
        let id = store.run_atomic(|tx| env.save(tx)).unwrap();

        let loaded = CompsEnvironmentItem::load(store.conn(), id).unwrap();
        assert_eq!(loaded.id(), Some(id));
        assert_eq!(loaded.environment_id, "minimal");
        assert_eq!(loaded.name, "Minimal Environment");
        assert_eq!(loaded.translated_name, "translated(Minimal Environment)");
        assert_eq!(loaded.package_types, CompsPackageType::DEFAULT);
        assert_eq!(group_ids(&loaded), ["base", "core"]);

        let base = loaded.group("base").unwrap();
        assert!(!base.installed());
        assert_eq!(base.group_type(), CompsPackageType::OPTIONAL);
        let core = loaded.group("core").unwrap();
        assert!(core.installed());
        assert_eq!(core.group_type(), CompsPackageType::MANDATORY);
    }

    #[test]
    fn test_mutation_not_persisted_until_save() {
        let mut store = create_test_store();

        let mut env = create_minimal_environment();
        let id = store.run_atomic(|tx| env.save(tx)).unwrap();
        env.add_group("standard", true, CompsPackageType::DEFAULT);

        assert_eq!(
            group_ids(&CompsEnvironmentItem::load(store.conn(), id).unwrap()),
            ["base", "core"]
        );

        store.run_atomic(|tx| env.save(tx)).unwrap();
        assert_eq!(
            group_ids(&CompsEnvironmentItem::load(store.conn(), id).unwrap()),
            ["standard", "base", "core"]
        );
    }

    #[test]
    fn test_find_groups_by_environment() {
        let mut store = create_test_store();

        let mut env = create_minimal_environment();
        let id = store.run_atomic(|tx| env.save(tx)).unwrap();

        let conn = store.conn();
        let groups = CompsEnvironmentGroup::find_by_environment(conn, id).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group_id(), "base");
        assert!(CompsEnvironmentGroup::find_by_environment(conn, id + 100).unwrap().is_empty());
    }
}
