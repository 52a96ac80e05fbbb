//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use recon_core::{Database, Ingestor, MatchStatus, ReconciliationStatus, SourceFormat};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::commands::{self, truncate, ReconcileArgs};

const EOD_CSV: &str = "\
Daily Settlement Report,,,,,,
Terminal Name,TID,Date of Transaction,Card Type,Card Number,Receipt,Ref Number,Amount (RM)
,,,,,,
Terminal Name,TID,Date of Transaction,Card Type,Card Number,Receipt,Ref Number,Amount (RM)
ALPHA STORE,T001,14/01/2024 15:04,Visa,4111111111111111,R1,REF001,RM100.00
ALPHA STORE,T001,14/01/2024 16:30,Visa,4222222222222222,R2,REF002,RM55.50
";

const MERCHANT_CSV: &str = "\
Order ID,Date,Total,Merchant,Status
ORD-1,2024-01-14,100.05,ALPHA,PAID
ORD-2,2024-01-14,55.50,ALPHA,PAID
";

/// Ingest both fixture ledgers for the given uploader
fn seed_ledgers(db: &Database, uploader: &str) {
    let ingestor = Ingestor::new(db);
    let report = ingestor
        .ingest(EOD_CSV.as_bytes(), "settlement.csv", SourceFormat::Eod, uploader, None)
        .unwrap();
    assert!(report.success);
    let report = ingestor
        .ingest(
            MERCHANT_CSV.as_bytes(),
            "orders.csv",
            SourceFormat::Emerchant,
            uploader,
            None,
        )
        .unwrap();
    assert!(report.success);
}

fn reconcile_args(uploader: &str, save: bool) -> ReconcileArgs<'_> {
    ReconcileArgs {
        from: None,
        to: None,
        merchant: None,
        threshold: 95,
        match_merchant: true,
        no_match_amount: false,
        no_match_date: false,
        uploader,
        save,
        notes: None,
        json: false,
    }
}

// ========== Init / open_db Tests ==========

#[test]
fn test_cmd_init() {
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    let result = commands::cmd_init(&db_path);
    assert!(result.is_ok());
    assert!(db_path.exists());

    // Re-opening an initialized database works
    let result = commands::open_db(&db_path);
    assert!(result.is_ok());
}

// ========== Import Command Tests ==========

#[test]
fn test_cmd_import_eod_file() {
    use std::io::Write;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let file_path = dir.path().join("settlement.csv");
    let mut f = std::fs::File::create(&file_path).unwrap();
    f.write_all(EOD_CSV.as_bytes()).unwrap();
    drop(f);

    let db = Database::in_memory().unwrap();
    let result = commands::cmd_import(&db, &file_path, "eod", None, "alice");
    assert!(result.is_ok());
    assert_eq!(db.count_eod().unwrap(), 2);
    assert_eq!(db.count_batches().unwrap(), 1);

    let total: Decimal = db.list_eod(10).unwrap().iter().map(|tx| tx.amount).sum();
    assert_eq!(total, dec!(155.50));
}

#[test]
fn test_cmd_import_unknown_format() {
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let file_path = dir.path().join("export.csv");
    std::fs::write(&file_path, "a,b\n").unwrap();

    let db = Database::in_memory().unwrap();
    let result = commands::cmd_import(&db, &file_path, "sftp", None, "alice");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Unknown format"));
}

#[test]
fn test_cmd_import_unusable_file_fails() {
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let file_path = dir.path().join("settlement.csv");
    std::fs::write(&file_path, "no,header,markers\n1,2,3\n").unwrap();

    let db = Database::in_memory().unwrap();
    let result = commands::cmd_import(&db, &file_path, "eod", None, "alice");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Import failed"));

    // The failed upload is still on record
    assert_eq!(db.count_batches().unwrap(), 1);
}

#[test]
fn test_cmd_import_missing_file() {
    let db = Database::in_memory().unwrap();
    let result = commands::cmd_import(
        &db,
        std::path::Path::new("/nonexistent/export.csv"),
        "eod",
        None,
        "alice",
    );
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Failed to read file"));
}

// ========== Reconcile Command Tests ==========

#[test]
fn test_cmd_reconcile_report_only() {
    let db = Database::in_memory().unwrap();
    seed_ledgers(&db, "cli");

    let result = commands::cmd_reconcile(&db, reconcile_args("cli", false));
    assert!(result.is_ok());

    // Nothing persisted without --save
    assert_eq!(db.count_matches().unwrap(), 0);
    assert_eq!(
        db.count_emerchant_by_status(ReconciliationStatus::Pending).unwrap(),
        2
    );
}

#[test]
fn test_cmd_reconcile_save_persists_matches() {
    let db = Database::in_memory().unwrap();
    seed_ledgers(&db, "cli");

    let result = commands::cmd_reconcile(&db, reconcile_args("cli", true));
    assert!(result.is_ok());

    assert_eq!(db.count_matches().unwrap(), 2);
    assert_eq!(
        db.count_emerchant_by_status(ReconciliationStatus::Matched).unwrap(),
        2
    );
}

#[test]
fn test_cmd_reconcile_json_output() {
    let db = Database::in_memory().unwrap();
    seed_ledgers(&db, "cli");

    let mut args = reconcile_args("cli", false);
    args.json = true;
    let result = commands::cmd_reconcile(&db, args);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_reconcile_invalid_date() {
    let db = Database::in_memory().unwrap();

    let mut args = reconcile_args("cli", false);
    args.from = Some("14/01/2024");
    let result = commands::cmd_reconcile(&db, args);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("--from"));
}

// ========== Status / Listing Tests ==========

#[test]
fn test_cmd_status_empty() {
    let db = Database::in_memory().unwrap();
    let result = commands::cmd_status(&db);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_batches_empty_and_with_data() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_batches(&db, 20).is_ok());

    seed_ledgers(&db, "cli");
    assert!(commands::cmd_batches(&db, 20).is_ok());
}

#[test]
fn test_cmd_transactions_listings() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_transactions_eod(&db, 20).is_ok());
    assert!(commands::cmd_transactions_emerchant(&db, 20).is_ok());

    seed_ledgers(&db, "cli");
    assert!(commands::cmd_transactions_eod(&db, 20).is_ok());
    assert!(commands::cmd_transactions_emerchant(&db, 20).is_ok());
}

// ========== Matches Command Tests ==========

#[test]
fn test_cmd_matches_review_flow() {
    let db = Database::in_memory().unwrap();
    seed_ledgers(&db, "cli");
    commands::cmd_reconcile(&db, reconcile_args("cli", true)).unwrap();

    assert!(commands::cmd_matches_list(&db, 20).is_ok());

    let matches = db.list_matches(20).unwrap();
    assert_eq!(matches.len(), 2);

    let first = matches[0].id;
    let second = matches[1].id;

    assert!(commands::cmd_matches_confirm(&db, first).is_ok());
    assert!(commands::cmd_matches_reject(&db, second).is_ok());

    let reviewed = db.list_matches(20).unwrap();
    assert!(reviewed.iter().any(|m| m.match_status == MatchStatus::Confirmed));
    assert!(reviewed.iter().any(|m| m.match_status == MatchStatus::Rejected));

    // Confirming again fails: the match is no longer pending
    assert!(commands::cmd_matches_confirm(&db, first).is_err());
}

#[test]
fn test_cmd_matches_list_empty() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_matches_list(&db, 20).is_ok());
}

// ========== Helper Function Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a long string that exceeds", 10), "a long ...");
    assert_eq!(truncate("exact", 5), "exact");
}
