// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: database path
fn db_path_arg() -> Arg {
    Arg::new("db_path")
        .short('d')
        .long("db-path")
        .value_name("PATH")
        .help("Database path (overrides the config file and SWDB_DB_PATH)")
}

fn build_cli() -> Command {
    Command::new("swdb")
        .version(env!("CARGO_PKG_VERSION"))
        .author("swdb Contributors")
        .about("Transactional history of package-management operations")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .default_value("/etc/swdb/swdb.toml")
                .global(true)
                .help("Path to the configuration file"),
        )
        .subcommand(
            Command::new("init")
                .about("Create the history database (safe to run on an existing one)")
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("list")
                .about("List recorded transactions, newest first")
                .arg(db_path_arg())
                .arg(
                    Arg::new("limit")
                        .short('n')
                        .long("limit")
                        .value_name("N")
                        .help("Maximum number of transactions to show (0 = all)"),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Show one transaction with its items")
                .arg(Arg::new("id").help("Transaction id (default: the most recent transaction)"))
                .arg(db_path_arg()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("swdb.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
