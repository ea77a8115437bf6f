// src/db/models/comps_type.rs

//! Comps package-type flags

use bitflags::bitflags;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::fmt;

bitflags! {
    /// Package/group selection types used by comps groups and environments
    ///
    /// Groups and environments store a mask of the types they pull in by
    /// default; a single membership carries exactly one flag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompsPackageType: u32 {
        const CONDITIONAL = 1 << 0;
        const DEFAULT     = 1 << 1;
        const MANDATORY   = 1 << 2;
        const OPTIONAL    = 1 << 3;
    }
}

impl Default for CompsPackageType {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for CompsPackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter_names().map(|(name, _)| name.to_lowercase()).collect();
        write!(f, "{}", names.join(", "))
    }
}

impl ToSql for CompsPackageType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.bits())))
    }
}

// Bits outside the known flags are kept as-is.
impl FromSql for CompsPackageType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_i64()?;
        u32::try_from(raw)
            .map(Self::from_bits_retain)
            .map_err(|_| FromSqlError::OutOfRange(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_display_lists_flags() {
        let types = CompsPackageType::MANDATORY | CompsPackageType::DEFAULT;
        assert_eq!(types.to_string(), "default, mandatory");
        assert_eq!(CompsPackageType::empty().to_string(), "");
    }

    #[test]
    fn test_sql_keeps_unknown_bits() {
        let conn = Connection::open_in_memory().unwrap();
        let raw = CompsPackageType::from_bits_retain(0b1_0100);

        let loaded: CompsPackageType = conn.query_row("SELECT ?1", [raw], |row| row.get(0)).unwrap();

        assert_eq!(loaded.bits(), 0b1_0100);
        assert!(loaded.contains(CompsPackageType::MANDATORY));
    }
}
