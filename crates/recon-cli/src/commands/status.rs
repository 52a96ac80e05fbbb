//! Status, batch, transaction, and match listing commands

use anyhow::Result;
use recon_core::{Database, MatchStatus, ReconciliationStatus};

use super::truncate;

pub fn cmd_status(db: &Database) -> Result<()> {
    println!("📊 Database: {}", db.path());
    println!("   ─────────────────────────────");
    println!("   EOD records: {}", db.count_eod()?);
    println!("   Orders: {}", db.count_emerchant()?);
    println!(
        "   - Pending: {}",
        db.count_emerchant_by_status(ReconciliationStatus::Pending)?
    );
    println!(
        "   - Matched: {}",
        db.count_emerchant_by_status(ReconciliationStatus::Matched)?
    );
    println!(
        "   - Unmatched: {}",
        db.count_emerchant_by_status(ReconciliationStatus::Unmatched)?
    );
    println!("   Upload batches: {}", db.count_batches()?);
    println!("   Matches: {}", db.count_matches()?);

    Ok(())
}

pub fn cmd_batches(db: &Database, limit: i64) -> Result<()> {
    let batches = db.list_batches(limit)?;

    if batches.is_empty() {
        println!("No upload batches yet. Run 'recon import' first.");
        return Ok(());
    }

    println!("📦 Upload batches");
    for batch in batches {
        let marker = match batch.status {
            recon_core::BatchStatus::Completed => "✅",
            recon_core::BatchStatus::Failed => "❌",
        };
        println!(
            "   {} {} {} [{}] {} records by {} at {}",
            marker,
            batch.batch_id,
            truncate(&batch.file_name, 30),
            batch.file_type,
            batch.record_count,
            batch.uploaded_by,
            batch.uploaded_at.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

pub fn cmd_transactions_eod(db: &Database, limit: i64) -> Result<()> {
    let rows = db.list_eod(limit)?;

    if rows.is_empty() {
        println!("No EOD records stored.");
        return Ok(());
    }

    println!("🏦 EOD records (most recent first)");
    for tx in rows {
        println!(
            "   #{} {} {} {} {} ref={}",
            tx.id,
            tx.transaction_at.format("%Y-%m-%d %H:%M"),
            truncate(tx.terminal_name.as_deref().unwrap_or("-"), 20),
            tx.amount,
            tx.card_type.as_deref().unwrap_or("-"),
            tx.ref_number.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}

pub fn cmd_transactions_emerchant(db: &Database, limit: i64) -> Result<()> {
    let rows = db.list_emerchant(limit)?;

    if rows.is_empty() {
        println!("No order records stored.");
        return Ok(());
    }

    println!("🛒 Order records (most recent first)");
    for tx in rows {
        println!(
            "   #{} {} {} {} [{}] {}",
            tx.id,
            tx.transaction_date,
            truncate(&tx.order_id, 20),
            tx.amount,
            tx.reconciliation_status.as_str(),
            tx.merchant_code.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}

pub fn cmd_matches_list(db: &Database, limit: i64) -> Result<()> {
    let matches = db.list_matches(limit)?;

    if matches.is_empty() {
        println!("No matches persisted. Run 'recon reconcile --save' first.");
        return Ok(());
    }

    println!("🔗 Matches (most recent first)");
    for m in matches {
        let marker = match m.match_status {
            MatchStatus::Pending => "⏳",
            MatchStatus::Confirmed => "✅",
            MatchStatus::Rejected => "❌",
        };
        println!(
            "   {} #{} eod={} order={} score={} by {} at {}{}",
            marker,
            m.id,
            m.eod_id,
            m.emerchant_id,
            m.match_score,
            m.matched_by,
            m.matched_at.format("%Y-%m-%d %H:%M"),
            m.notes.map(|n| format!(" ({})", truncate(&n, 30))).unwrap_or_default(),
        );
    }

    Ok(())
}

pub fn cmd_matches_confirm(db: &Database, id: i64) -> Result<()> {
    db.set_match_status(id, MatchStatus::Confirmed)?;
    println!("✅ Match {} confirmed", id);
    Ok(())
}

pub fn cmd_matches_reject(db: &Database, id: i64) -> Result<()> {
    db.set_match_status(id, MatchStatus::Rejected)?;
    println!("❌ Match {} rejected", id);
    Ok(())
}
