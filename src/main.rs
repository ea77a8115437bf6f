// src/main.rs

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use swdb::HistoryConfig;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = HistoryConfig::load_or_default(Path::new(&cli.config))?;

    let resolve = |db_path: Option<String>| -> PathBuf {
        db_path
            .map(PathBuf::from)
            .unwrap_or_else(|| config.database.path.clone())
    };

    match cli.command {
        Some(Commands::Init { db_path }) => commands::cmd_init(&resolve(db_path)),
        Some(Commands::List { db_path, limit }) => {
            let limit = match limit {
                Some(0) => None,
                Some(limit) => Some(limit),
                None => config.list_limit(),
            };
            commands::cmd_list(&resolve(db_path), limit)
        }
        Some(Commands::Info { id, db_path }) => commands::cmd_info(&resolve(db_path), id),
        None => {
            println!("swdb {} - software history database", env!("CARGO_PKG_VERSION"));
            println!("Run 'swdb --help' for usage information");
            Ok(())
        }
    }
}
