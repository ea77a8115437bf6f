// src/commands.rs
//! Command implementations for the swdb CLI

use anyhow::{Context, Result};
use std::path::Path;
use swdb::{Item, Transaction, TransactionStore};

/// Timestamp layout used in listings
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn open_store(db_path: &Path) -> Result<TransactionStore> {
    let store = TransactionStore::open(db_path)
        .with_context(|| format!("Failed to open history database {}", db_path.display()))?;
    store
        .create_database()
        .with_context(|| format!("Failed to prepare history database {}", db_path.display()))?;
    Ok(store)
}

/// Requested id, or the most recent transaction when none is given
fn resolve_transaction_id(store: &TransactionStore, id: Option<i64>) -> Result<Option<i64>> {
    match id {
        Some(id) => Ok(Some(id)),
        None => Ok(store.last_transaction_id()?),
    }
}

/// Initialize the history database
pub fn cmd_init(db_path: &Path) -> Result<()> {
    swdb::db::init(db_path)
        .with_context(|| format!("Failed to initialize {}", db_path.display()))?;
    println!("History database initialized at: {}", db_path.display());
    Ok(())
}

/// List transactions, newest first
pub fn cmd_list(db_path: &Path, limit: Option<usize>) -> Result<()> {
    let store = open_store(db_path)?;
    let summaries = store.list_transactions(limit)?;

    if summaries.is_empty() {
        println!("No transaction history.");
        return Ok(());
    }

    println!("Transaction history:");
    for summary in &summaries {
        println!(
            "  [{}] {} {:>7} {:>4} item(s)  {}",
            summary.id,
            summary.dt_begin.format(TIME_FORMAT),
            summary.state,
            summary.item_count,
            summary.cmdline
        );
    }
    println!("\nTotal: {} transaction(s)", summaries.len());
    Ok(())
}

/// Show a transaction and its items
pub fn cmd_info(db_path: &Path, id: Option<i64>) -> Result<()> {
    let store = open_store(db_path)?;
    let Some(id) = resolve_transaction_id(&store, id)? else {
        println!("No transaction history.");
        return Ok(());
    };

    let trans = Transaction::load(&store, id)
        .with_context(|| format!("Failed to load transaction {id}"))?;

    println!("Transaction ID : {}", id);
    if let Some(begin) = trans.dt_begin() {
        println!("Begin time     : {}", begin.format(TIME_FORMAT));
    }
    match trans.dt_end() {
        Some(end) => println!("End time       : {}", end.format(TIME_FORMAT)),
        None => println!("End time       : (unfinished)"),
    }
    println!("State          : {}", trans.state());
    println!("User           : {}", trans.user_id());
    println!("Releasever     : {}", trans.releasever());
    println!("Rpmdb begin    : {}", trans.rpmdb_version_begin());
    println!("Rpmdb end      : {}", trans.rpmdb_version_end());
    println!("Command line   : {}", trans.cmdline());
    if !trans.comment().is_empty() {
        println!("Comment        : {}", trans.comment());
    }

    println!("Items:");
    for ti in trans.items() {
        println!(
            "  {:<12} {:<16} {:<8} {} {}",
            ti.action().as_ref(),
            ti.reason().as_ref(),
            ti.state().as_ref(),
            ti.item(),
            ti.repo_id()
        );
        if let Item::CompsEnvironment(env) = ti.item() {
            for group in env.groups() {
                let mark = if group.installed() { "installed" } else { "" };
                println!("      @{} ({}) {}", group.group_id(), group.group_type(), mark);
            }
        }
    }

    if !trans.console_output().is_empty() {
        println!("Output:");
        for line in trans.console_output() {
            println!("  {}", line.line);
        }
    }
    Ok(())
}
