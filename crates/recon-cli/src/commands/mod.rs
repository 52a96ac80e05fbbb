//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db)
//! - `import` - File ingestion command
//! - `reconcile` - Reconciliation run command
//! - `status` - Status/batches/transactions/matches listing commands

pub mod core;
pub mod import;
pub mod reconcile;
pub mod status;

// Re-export command functions for main.rs
pub use core::*;
pub use import::*;
pub use reconcile::*;
pub use status::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
