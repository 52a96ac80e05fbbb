//! Reconciliation run command implementation

use anyhow::{Context, Result};
use chrono::NaiveDate;
use recon_core::{Database, Engine, MatchCriteria, RunParams};

/// Arguments for one `recon reconcile` invocation
pub struct ReconcileArgs<'a> {
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
    pub merchant: Option<&'a str>,
    pub threshold: i64,
    pub match_merchant: bool,
    pub no_match_amount: bool,
    pub no_match_date: bool,
    pub uploader: &'a str,
    pub save: bool,
    pub notes: Option<&'a str>,
    pub json: bool,
}

fn parse_date(arg: Option<&str>, flag: &str) -> Result<Option<NaiveDate>> {
    arg.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .with_context(|| format!("Invalid {} date format (use YYYY-MM-DD)", flag))
}

pub fn cmd_reconcile(db: &Database, args: ReconcileArgs<'_>) -> Result<()> {
    let criteria = MatchCriteria {
        match_amount: !args.no_match_amount,
        match_date: !args.no_match_date,
        match_merchant: args.match_merchant,
    };

    let params = RunParams {
        uploaded_by: args.uploader.to_string(),
        start_date: parse_date(args.from, "--from")?,
        end_date: parse_date(args.to, "--to")?,
        merchant_filter: args.merchant.map(String::from),
        threshold: args.threshold,
        criteria,
    };

    let engine = Engine::new(db);
    let report = engine.run(&params)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("🔍 Reconciliation for {}", args.uploader);
        println!("   Threshold: {}", report.summary.threshold);
        println!("   EOD records: {}", report.summary.total_eod);
        println!("   Orders: {}", report.summary.total_emerchant);
        println!();
        println!("📊 Results");
        println!("   ─────────────────────────────");
        println!("   ✅ Matched: {}", report.summary.matched);
        println!("   ❓ Unmatched EOD: {}", report.summary.unmatched_eod);
        println!("   ❓ Unmatched orders: {}", report.summary.unmatched_emerchant);

        for pair in &report.matched {
            println!(
                "   {} ↔ {} (score {}, {} vs {})",
                pair.eod.ref_number.as_deref().unwrap_or("-"),
                pair.emerchant.order_id,
                pair.score,
                pair.eod.amount,
                pair.emerchant.amount,
            );
        }
    }

    if args.save {
        let written = engine.persist_matches(&report, args.uploader, args.notes)?;
        println!();
        println!("💾 Persisted {} matches for review. Run 'recon matches' to see them.", written);
    } else if report.summary.matched > 0 && !args.json {
        println!();
        println!("💡 Tip: re-run with --save to persist these matches for review.");
    }

    Ok(())
}
