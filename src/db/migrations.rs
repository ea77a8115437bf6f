// src/db/migrations.rs
//! Database migration implementations
//!
//! Each migration function creates or evolves the tables for one schema
//! version. They run inside the transaction opened by `schema::migrate`.

use crate::error::Result;
use rusqlite::Connection;
use tracing::debug;

/// Initial schema - Version 1
///
/// Creates all history tables:
/// - trans: Transaction headers and lifecycle state
/// - item: Shared id space for every item variant
/// - rpm_item, comps_group_item, comps_environment_item: Variant rows
/// - comps_group_package, comps_environment_group: Ordered comps memberships
/// - trans_item: Items bound to a transaction with action/reason/state
/// - console_output: Output captured while a transaction ran
pub fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        -- Transactions: one row per recorded package-management operation
        CREATE TABLE trans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            dt_begin INTEGER NOT NULL,
            dt_end INTEGER,
            rpmdb_version_begin TEXT NOT NULL DEFAULT '',
            rpmdb_version_end TEXT NOT NULL DEFAULT '',
            releasever TEXT NOT NULL DEFAULT '',
            user_id INTEGER NOT NULL DEFAULT 0,
            cmdline TEXT NOT NULL DEFAULT '',
            comment TEXT NOT NULL DEFAULT '',
            state TEXT NOT NULL CHECK(state IN ('started', 'done', 'error'))
        );

        CREATE INDEX idx_trans_state ON trans(state);

        -- Items: ids are shared by all variants and never reused
        CREATE TABLE item (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL CHECK(kind IN ('rpm', 'comps_group', 'comps_environment'))
        );

        CREATE INDEX idx_item_kind ON item(kind);

        CREATE TABLE rpm_item (
            item_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            epoch INTEGER NOT NULL DEFAULT 0,
            version TEXT NOT NULL,
            release TEXT NOT NULL,
            arch TEXT NOT NULL,
            repo TEXT NOT NULL DEFAULT '',
            FOREIGN KEY (item_id) REFERENCES item(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_rpm_item_name ON rpm_item(name);

        CREATE TABLE comps_group_item (
            item_id INTEGER PRIMARY KEY,
            groupid TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            translated_name TEXT NOT NULL DEFAULT '',
            pkg_types INTEGER NOT NULL DEFAULT 0,
            installed INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (item_id) REFERENCES item(id) ON DELETE CASCADE
        );

        CREATE TABLE comps_group_package (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_item_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            installed INTEGER NOT NULL DEFAULT 0,
            pkg_type INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL,
            UNIQUE(group_item_id, name),
            UNIQUE(group_item_id, position),
            FOREIGN KEY (group_item_id) REFERENCES comps_group_item(item_id) ON DELETE CASCADE
        );

        CREATE TABLE comps_environment_item (
            item_id INTEGER PRIMARY KEY,
            environmentid TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            translated_name TEXT NOT NULL DEFAULT '',
            pkg_types INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (item_id) REFERENCES item(id) ON DELETE CASCADE
        );

        CREATE TABLE comps_environment_group (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            environment_item_id INTEGER NOT NULL,
            groupid TEXT NOT NULL,
            installed INTEGER NOT NULL DEFAULT 0,
            group_type INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL,
            UNIQUE(environment_item_id, groupid),
            UNIQUE(environment_item_id, position),
            FOREIGN KEY (environment_item_id) REFERENCES comps_environment_item(item_id) ON DELETE CASCADE
        );

        -- Transaction items: insertion order is kept in position
        CREATE TABLE trans_item (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            trans_id INTEGER NOT NULL,
            item_id INTEGER NOT NULL,
            repo_id TEXT NOT NULL DEFAULT '',
            action TEXT NOT NULL,
            reason TEXT NOT NULL,
            state TEXT NOT NULL CHECK(state IN ('started', 'ok', 'error')),
            position INTEGER NOT NULL,
            UNIQUE(trans_id, item_id),
            UNIQUE(trans_id, position),
            FOREIGN KEY (trans_id) REFERENCES trans(id) ON DELETE CASCADE,
            FOREIGN KEY (item_id) REFERENCES item(id)
        );

        CREATE INDEX idx_trans_item_trans_id ON trans_item(trans_id);
        CREATE INDEX idx_trans_item_item_id ON trans_item(item_id);

        CREATE TABLE console_output (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            trans_id INTEGER NOT NULL,
            file_descriptor INTEGER NOT NULL,
            line TEXT NOT NULL,
            FOREIGN KEY (trans_id) REFERENCES trans(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_console_output_trans_id ON console_output(trans_id);
        ",
    )?;

    debug!("Schema version 1 created successfully");
    Ok(())
}
