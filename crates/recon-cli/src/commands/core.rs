//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use recon_core::Database;
use tracing::debug;

/// Open the database, creating it (and its schema) if missing
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    debug!("Opening database at {}", path_str);
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let _db = open_db(db_path)?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import a bank export: recon import --file settlement.csv --format eod");
    println!("  2. Import gateway orders: recon import --file orders.csv --format emerchant");
    println!("  3. Reconcile: recon reconcile --match-merchant --save");

    Ok(())
}
