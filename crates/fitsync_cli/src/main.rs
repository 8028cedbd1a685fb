//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `fitsync_core` linkage without the mobile runtime.
//! - Inspect or clear the persisted sync anchor of a database file.
//!
//! Usage: `fitsync_cli [anchor <db-path> [--reset]]`

use fitsync_core::db::open_db;
use fitsync_core::sync::anchor_store::AnchorStore;
use fitsync_core::{ConnectorConfig, SqliteKeyValueStore};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("fitsync_core ping={}", fitsync_core::ping());
    println!("fitsync_core version={}", fitsync_core::core_version());

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] => ExitCode::SUCCESS,
        ["anchor", path] => report(inspect_anchor(path, false)),
        ["anchor", path, "--reset"] => report(inspect_anchor(path, true)),
        _ => {
            eprintln!("usage: fitsync_cli [anchor <db-path> [--reset]]");
            ExitCode::from(2)
        }
    }
}

fn inspect_anchor(path: &str, reset: bool) -> Result<(), String> {
    let conn = open_db(path).map_err(|err| format!("open {path} failed: {err}"))?;
    let store = AnchorStore::new(
        SqliteKeyValueStore::new(conn),
        ConnectorConfig::default().history_key,
    );

    match store.restore() {
        Some(anchor) => println!(
            "anchor key={} bytes={}",
            store.key(),
            anchor.as_bytes().len()
        ),
        None => println!("anchor key={} absent", store.key()),
    }
    if reset {
        store.reset();
        println!("anchor key={} reset", store.key());
    }
    Ok(())
}

fn report(result: Result<(), String>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}
