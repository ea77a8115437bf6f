// src/db/models/comps_group.rs

//! CompsGroupItem model - a comps group and the packages it selects

use super::{CompsPackageType, ItemKind, upsert_front};
use crate::db::TransactionStore;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

/// A package belonging to a comps group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompsGroupPackage {
    name: String,
    installed: bool,
    package_type: CompsPackageType,
}

impl CompsGroupPackage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn installed(&self) -> bool {
        self.installed
    }

    pub fn package_type(&self) -> CompsPackageType {
        self.package_type
    }

    /// Packages of a group in their persisted order
    pub fn find_by_group(conn: &Connection, group_item_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, installed, pkg_type FROM comps_group_package
             WHERE group_item_id = ?1 ORDER BY position",
        )?;

        let packages = stmt
            .query_map([group_item_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(packages)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            installed: row.get(1)?,
            package_type: row.get(2)?,
        })
    }
}

/// A comps group recorded in history
#[derive(Debug, Clone)]
pub struct CompsGroupItem {
    id: Option<i64>,
    pub group_id: String,
    pub name: String,
    pub translated_name: String,
    pub package_types: CompsPackageType,
    pub installed: bool,
    packages: IndexMap<String, CompsGroupPackage>,
}

impl CompsGroupItem {
    /// Create a new, unsaved group item
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            id: None,
            group_id: group_id.into(),
            name: String::new(),
            translated_name: String::new(),
            package_types: CompsPackageType::empty(),
            installed: false,
            packages: IndexMap::new(),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Forget the stored id so the next save writes a new record
    pub(crate) fn detach(&mut self) {
        self.id = None;
    }

    /// Record a package of this group
    ///
    /// A package already present has its fields replaced and moves to the
    /// front; the most recently added or updated package is always first.
    pub fn add_package(
        &mut self,
        name: impl Into<String>,
        installed: bool,
        package_type: CompsPackageType,
    ) {
        let name = name.into();
        let key = name.clone();
        upsert_front(&mut self.packages, key, |previous| match previous {
            Some(mut package) => {
                package.installed = installed;
                package.package_type = package_type;
                package
            }
            None => CompsGroupPackage {
                name,
                installed,
                package_type,
            },
        });
    }

    /// Packages, most recently added first
    pub fn packages(&self) -> impl ExactSizeIterator<Item = &CompsGroupPackage> {
        self.packages.values()
    }

    pub fn package(&self, name: &str) -> Option<&CompsGroupPackage> {
        self.packages.get(name)
    }

    /// Insert or update this group and rewrite its package rows
    pub fn save(&mut self, tx: &rusqlite::Transaction) -> Result<i64> {
        let id = match self.id {
            Some(id) => {
                let updated = tx.execute(
                    "UPDATE comps_group_item SET groupid = ?1, name = ?2, translated_name = ?3,
                     pkg_types = ?4, installed = ?5 WHERE item_id = ?6",
                    params![
                        &self.group_id,
                        &self.name,
                        &self.translated_name,
                        self.package_types,
                        self.installed,
                        id
                    ],
                )?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("comps group item {id}")));
                }
                id
            }
            None => {
                let id = TransactionStore::next_id(tx, ItemKind::CompsGroup)?;
                tx.execute(
                    "INSERT INTO comps_group_item (item_id, groupid, name, translated_name, pkg_types, installed)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        id,
                        &self.group_id,
                        &self.name,
                        &self.translated_name,
                        self.package_types,
                        self.installed
                    ],
                )?;
                id
            }
        };

        tx.execute(
            "DELETE FROM comps_group_package WHERE group_item_id = ?1",
            [id],
        )?;
        let mut stmt = tx.prepare(
            "INSERT INTO comps_group_package (group_item_id, name, installed, pkg_type, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (position, package) in self.packages.values().enumerate() {
            stmt.execute(params![
                id,
                &package.name,
                package.installed,
                package.package_type,
                position as i64
            ])?;
        }

        self.id = Some(id);
        debug!(
            "Saved comps group item {} ({}, {} packages)",
            id,
            self.group_id,
            self.packages.len()
        );
        Ok(id)
    }

    /// Load a group and its packages by item id
    pub fn load(conn: &Connection, id: i64) -> Result<Self> {
        let mut stmt = conn.prepare(
            "SELECT item_id, groupid, name, translated_name, pkg_types, installed
             FROM comps_group_item WHERE item_id = ?1",
        )?;

        let mut group = stmt
            .query_row([id], Self::from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("comps group item {id}")))?;

        group.packages = CompsGroupPackage::find_by_group(conn, id)?
            .into_iter()
            .map(|package| (package.name.clone(), package))
            .collect();

        Ok(group)
    }

    /// Convert a database row to a CompsGroupItem (packages loaded separately)
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            group_id: row.get(1)?,
            name: row.get(2)?,
            translated_name: row.get(3)?,
            package_types: row.get(4)?,
            installed: row.get(5)?,
            packages: IndexMap::new(),
        })
    }
}

// Packages compare in order.
impl PartialEq for CompsGroupItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.group_id == other.group_id
            && self.name == other.name
            && self.translated_name == other.translated_name
            && self.package_types == other.package_types
            && self.installed == other.installed
            && self.packages.iter().eq(other.packages.iter())
    }
}
