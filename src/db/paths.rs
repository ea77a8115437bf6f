// src/db/paths.rs
//! Centralized path derivation for the history database

use std::path::{Path, PathBuf};

/// Default location of the history database
pub const DEFAULT_DB_PATH: &str = "/var/lib/swdb/history.sqlite";

/// Environment variable overriding the database location
pub const DB_PATH_ENV: &str = "SWDB_DB_PATH";

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/swdb/swdb.toml";

/// Get the directory containing the database
pub fn db_dir(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_dir() {
        assert_eq!(
            db_dir(Path::new("/var/lib/swdb/history.sqlite")),
            PathBuf::from("/var/lib/swdb")
        );
    }

    #[test]
    fn test_db_dir_bare_filename() {
        assert_eq!(db_dir(Path::new("history.sqlite")), PathBuf::from("."));
    }
}
