// src/error.rs

//! Error types for the software history database

use thiserror::Error;

/// Errors surfaced by history recording and reconstruction
#[derive(Error, Debug)]
pub enum Error {
    /// `begin()` called on a transaction that already has an id
    #[error("Transaction has already been started")]
    DuplicateTransaction,

    /// Lifecycle call made out of order, or an illegal item state transition
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// No transaction or item with the requested id
    #[error("Not found: {0}")]
    NotFound(String),

    /// The same item added to one transaction with conflicting action/reason
    #[error("Duplicate item: {0}")]
    DuplicateItem(String),

    /// Underlying SQLite failure (unavailable store, constraint, write failure)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Schema version mismatch or undecodable persisted row
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
