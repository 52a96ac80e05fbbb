//! Recon CLI - Transaction ledger reconciliation
//!
//! Usage:
//!   recon init                             Initialize database
//!   recon import --file export.csv --format eod
//!   recon reconcile --match-merchant --save
//!   recon status                           Show record counts

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Import {
            file,
            format,
            merchant_type,
            uploader,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_import(&db, &file, &format, merchant_type.as_deref(), &uploader)
        }
        Commands::Reconcile {
            from,
            to,
            merchant,
            threshold,
            match_merchant,
            no_match_amount,
            no_match_date,
            uploader,
            save,
            notes,
            json,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_reconcile(
                &db,
                commands::ReconcileArgs {
                    from: from.as_deref(),
                    to: to.as_deref(),
                    merchant: merchant.as_deref(),
                    threshold,
                    match_merchant,
                    no_match_amount,
                    no_match_date,
                    uploader: &uploader,
                    save,
                    notes: notes.as_deref(),
                    json,
                },
            )
        }
        Commands::Batches { limit } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_batches(&db, limit)
        }
        Commands::Status => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_status(&db)
        }
        Commands::Transactions { ledger, limit } => {
            let db = commands::open_db(&cli.db)?;
            match ledger.as_str() {
                "eod" => commands::cmd_transactions_eod(&db, limit),
                "emerchant" => commands::cmd_transactions_emerchant(&db, limit),
                other => anyhow::bail!("Unknown ledger: {} (use eod or emerchant)", other),
            }
        }
        Commands::Matches { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_matches_list(&db, 20),
                Some(MatchesAction::List { limit }) => commands::cmd_matches_list(&db, limit),
                Some(MatchesAction::Confirm { id }) => commands::cmd_matches_confirm(&db, id),
                Some(MatchesAction::Reject { id }) => commands::cmd_matches_reject(&db, id),
            }
        }
    }
}
