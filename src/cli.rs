// src/cli.rs
//! CLI definitions for the swdb history tool
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use swdb::db::paths::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "swdb")]
#[command(author = "swdb Contributors")]
#[command(version)]
#[command(about = "Transactional history of package-management operations", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the history database (safe to run on an existing one)
    Init {
        /// Path to the database file
        #[arg(short, long)]
        db_path: Option<String>,
    },

    /// List recorded transactions, newest first
    List {
        /// Path to the database file
        #[arg(short, long)]
        db_path: Option<String>,

        /// Maximum number of transactions to show (0 = all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show one transaction with its items
    Info {
        /// Transaction id (default: the most recent transaction)
        id: Option<i64>,

        /// Path to the database file
        #[arg(short, long)]
        db_path: Option<String>,
    },
}
