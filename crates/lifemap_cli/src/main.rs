//! CLI inspection entry point.
//!
//! # Responsibility
//! - Load a storage snapshot (JSON), hydrate a store, print the resolved
//!   layout as JSON.
//! - Restore and persist the override cache when a database is given.
//!
//! Every flag also reads a `LIFEMAP_*` environment variable; see `--help`.

mod cli;

use clap::Parser;
use cli::CliArgs;
use lifemap_core::db::open_db;
use lifemap_core::{
    default_log_level, init_logging, Bubble, BubbleStore, HydrationSnapshot, OverrideService,
    SqliteOverrideRepository,
};
use log::{info, warn};
use serde::Serialize;
use std::process::ExitCode;

#[derive(Debug, Serialize)]
struct LayoutReport<'a> {
    owner: &'a str,
    restored_overrides: usize,
    persisted_overrides: usize,
    bubbles: Vec<&'a Bubble>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging_from_args(args: &CliArgs) {
    let Some(log_dir) = args.log_dir.as_deref() else {
        return;
    };
    let level = args.log_level.as_deref().unwrap_or_else(|| default_log_level());
    if let Err(err) = init_logging(level, log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }
}

fn run(args: &CliArgs) -> Result<(), String> {
    let snapshot_path = args.snapshot.display();
    let raw = std::fs::read_to_string(&args.snapshot)
        .map_err(|err| format!("failed to read `{snapshot_path}`: {err}"))?;
    let snapshot: HydrationSnapshot = serde_json::from_str(&raw)
        .map_err(|err| format!("invalid snapshot `{snapshot_path}`: {err}"))?;
    let owner = args.owner.as_str();

    let mut store = BubbleStore::new();
    let (restored, persisted) = match &args.db_path {
        Some(db_path) => {
            let conn = open_db(db_path)
                .map_err(|err| format!("failed to open `{}`: {err}", db_path.display()))?;
            let service = OverrideService::new(SqliteOverrideRepository::new(&conn));
            let restored = service
                .restore(&mut store, owner)
                .map_err(|err| format!("failed to restore overrides: {err}"))?;
            store.hydrate(&snapshot);
            let persisted = service
                .persist(&store, owner)
                .map_err(|err| format!("failed to persist overrides: {err}"))?;
            (restored, persisted)
        }
        None => {
            warn!("event=cli_run module=cli status=skip reason=no_override_db");
            store.sync_owner(owner);
            store.hydrate(&snapshot);
            (0, 0)
        }
    };

    let report = LayoutReport {
        owner,
        restored_overrides: restored,
        persisted_overrides: persisted,
        bubbles: store.bubbles().values().collect(),
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to encode layout: {err}"))?;
    println!("{json}");
    info!(
        "event=cli_run module=cli status=ok rows={} bubbles={}",
        snapshot.len(),
        store.len()
    );
    Ok(())
}
