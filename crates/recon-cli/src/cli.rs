//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Recon - Reconcile bank settlement exports against e-merchant orders
#[derive(Parser)]
#[command(name = "recon")]
#[command(about = "Transaction ledger reconciliation tool", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "recon.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import a settlement or order export file
    Import {
        /// File to import (.csv, .xlsx or .xls)
        #[arg(short, long)]
        file: PathBuf,

        /// Source format: eod (bank settlement) or emerchant (gateway orders)
        #[arg(long)]
        format: String,

        /// Gateway name used as the default merchant code for order rows
        /// that carry none (emerchant format only)
        #[arg(long)]
        merchant_type: Option<String>,

        /// Uploader the records are attributed to
        #[arg(long, default_value = "cli")]
        uploader: String,
    },

    /// Run reconciliation between the two ledgers
    Reconcile {
        /// Window start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: Option<String>,

        /// Window end date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,

        /// Only consider orders whose merchant code contains this text
        #[arg(long)]
        merchant: Option<String>,

        /// Minimum confidence score for a match
        #[arg(long, default_value_t = recon_core::DEFAULT_THRESHOLD)]
        threshold: i64,

        /// Include the merchant-name sub-score
        #[arg(long)]
        match_merchant: bool,

        /// Exclude the amount sub-score
        #[arg(long)]
        no_match_amount: bool,

        /// Exclude the date sub-score
        #[arg(long)]
        no_match_date: bool,

        /// Uploader whose records are reconciled
        #[arg(long, default_value = "cli")]
        uploader: String,

        /// Persist the matches for review instead of only reporting
        #[arg(long)]
        save: bool,

        /// Free-text note stored on every persisted match
        #[arg(long)]
        notes: Option<String>,

        /// Emit the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List upload batches
    Batches {
        /// Maximum number of batches to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show database status and record counts
    Status,

    /// List stored transactions
    Transactions {
        /// Which ledger: eod or emerchant
        ledger: String,

        /// Maximum number of rows to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Manage persisted matches (list, confirm, reject)
    Matches {
        #[command(subcommand)]
        action: Option<MatchesAction>,
    },
}

#[derive(Subcommand)]
pub enum MatchesAction {
    /// List persisted matches
    List {
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
    /// Confirm a pending match
    Confirm {
        /// Match ID
        id: i64,
    },
    /// Reject a pending match
    Reject {
        /// Match ID
        id: i64,
    },
}
