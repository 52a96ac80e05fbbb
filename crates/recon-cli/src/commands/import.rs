//! File ingestion command implementation

use std::path::Path;

use anyhow::{Context, Result};
use recon_core::{Database, Ingestor, SourceFormat};

pub fn cmd_import(
    db: &Database,
    file: &Path,
    format_str: &str,
    merchant_type: Option<&str>,
    uploader: &str,
) -> Result<()> {
    let format: SourceFormat = format_str
        .parse()
        .map_err(|_| anyhow::anyhow!("Unknown format: {} (use eod or emerchant)", format_str))?;

    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("File path has no usable file name")?;

    let bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    println!("📥 Importing {} as {}...", file.display(), format);

    let ingestor = Ingestor::new(db);
    let report = ingestor.ingest(&bytes, file_name, format, uploader, merchant_type)?;

    if !report.success {
        anyhow::bail!(
            "Import failed (batch {}): {}",
            report.batch_id,
            report.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    println!("✅ Import complete! Batch: {}", report.batch_id);
    println!("   Saved: {}", report.records_saved);
    println!("   Skipped (duplicates): {}", report.duplicates_skipped);
    if report.rejections.total() > 0 {
        println!("   Rejected rows: {}", report.rejections.total());
        if report.rejections.non_visa > 0 {
            println!("   - Non-Visa: {}", report.rejections.non_visa);
        }
        if report.rejections.bad_card_number > 0 {
            println!("   - Bad card number: {}", report.rejections.bad_card_number);
        }
        if report.rejections.bad_date > 0 {
            println!("   - Unparseable date: {}", report.rejections.bad_date);
        }
        if report.rejections.missing_required > 0 {
            println!("   - Missing required fields: {}", report.rejections.missing_required);
        }
    }
    println!("   Total amount: {}", report.total_amount);

    Ok(())
}
