//! Greedy reconciliation over stored records
//!
//! One run loads both ledgers for one uploader, scores EOD records
//! against the order pool in insertion order, and emits a report the
//! caller can inspect before persisting anything. Matching is greedy
//! with consumption: every EOD record picks its best-scoring candidate
//! over the whole pool (first seen wins on ties), but an order already
//! claimed by an earlier EOD record is gone; the later record goes
//! unmatched rather than falling back to a second-best candidate.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::db::Database;
use crate::error::Result;
use crate::models::{
    EmerchantTransaction, EodTransaction, NewReconciliationMatch, ReconciliationStatus,
};
use crate::score::{match_score, MatchCriteria};

/// Minimum score for a candidate pair to be emitted as a match
pub const DEFAULT_THRESHOLD: i64 = 95;

/// Parameters for one reconciliation run
#[derive(Debug, Clone)]
pub struct RunParams {
    /// Both ledgers are scoped to this uploader
    pub uploaded_by: String,
    /// Inclusive transaction-date window
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive substring filter on the order pool's merchant
    /// codes. EOD records are never filtered; those without an in-filter
    /// counterpart surface as unmatched.
    pub merchant_filter: Option<String>,
    pub threshold: i64,
    pub criteria: MatchCriteria,
}

impl RunParams {
    pub fn new(uploaded_by: impl Into<String>) -> Self {
        Self {
            uploaded_by: uploaded_by.into(),
            start_date: None,
            end_date: None,
            merchant_filter: None,
            threshold: DEFAULT_THRESHOLD,
            criteria: MatchCriteria::default(),
        }
    }
}

/// Condensed EOD record as it appears in a report
#[derive(Debug, Clone, Serialize)]
pub struct EodSummary {
    pub id: i64,
    pub terminal_name: Option<String>,
    pub tid: Option<String>,
    pub transaction_at: NaiveDateTime,
    pub ref_number: Option<String>,
    pub amount: Decimal,
}

impl From<&EodTransaction> for EodSummary {
    fn from(tx: &EodTransaction) -> Self {
        Self {
            id: tx.id,
            terminal_name: tx.terminal_name.clone(),
            tid: tx.tid.clone(),
            transaction_at: tx.transaction_at,
            ref_number: tx.ref_number.clone(),
            amount: tx.amount,
        }
    }
}

/// Condensed order record as it appears in a report
#[derive(Debug, Clone, Serialize)]
pub struct EmerchantSummary {
    pub id: i64,
    pub order_id: String,
    pub merchant_code: Option<String>,
    pub transaction_date: NaiveDate,
    pub amount: Decimal,
}

impl From<&EmerchantTransaction> for EmerchantSummary {
    fn from(tx: &EmerchantTransaction) -> Self {
        Self {
            id: tx.id,
            order_id: tx.order_id.clone(),
            merchant_code: tx.merchant_code.clone(),
            transaction_date: tx.transaction_date,
            amount: tx.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchedPair {
    pub eod: EodSummary,
    pub emerchant: EmerchantSummary,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_eod: usize,
    pub total_emerchant: usize,
    pub matched: usize,
    pub unmatched_eod: usize,
    pub unmatched_emerchant: usize,
    pub threshold: i64,
}

/// Full outcome of one run, not yet persisted
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub matched: Vec<MatchedPair>,
    pub unmatched_eod: Vec<EodSummary>,
    pub unmatched_emerchant: Vec<EmerchantSummary>,
    pub summary: RunSummary,
}

fn label_contains(label: Option<&str>, needle: &str) -> bool {
    label
        .map(|l| l.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

/// Reconciliation engine over one database
pub struct Engine<'a> {
    db: &'a Database,
}

impl<'a> Engine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Run reconciliation and build a report. Nothing is written;
    /// call [`Engine::persist_matches`] with the report to commit it.
    pub fn run(&self, params: &RunParams) -> Result<ReconciliationReport> {
        let eod_records =
            self.db
                .list_eod_in_range(&params.uploaded_by, params.start_date, params.end_date)?;
        let mut orders = self.db.list_emerchant_in_range(
            &params.uploaded_by,
            params.start_date,
            params.end_date,
        )?;

        if let Some(filter) = &params.merchant_filter {
            orders.retain(|tx| label_contains(tx.merchant_code.as_deref(), filter));
        }

        let total_eod = eod_records.len();
        let total_emerchant = orders.len();

        let mut matched = Vec::new();
        let mut unmatched_eod = Vec::new();
        let mut consumed = vec![false; orders.len()];

        for eod in &eod_records {
            let mut best: Option<(usize, i64)> = None;
            for (idx, order) in orders.iter().enumerate() {
                let score = match_score(eod, order, &params.criteria);
                // Strict > keeps the earliest candidate on ties
                if best.map(|(_, s)| score > s).unwrap_or(true) {
                    best = Some((idx, score));
                }
            }

            match best {
                Some((idx, score)) if score >= params.threshold && !consumed[idx] => {
                    consumed[idx] = true;
                    debug!(
                        "Matched eod {} to order {} (score {})",
                        eod.id, orders[idx].id, score
                    );
                    matched.push(MatchedPair {
                        eod: eod.into(),
                        emerchant: (&orders[idx]).into(),
                        score,
                    });
                }
                _ => unmatched_eod.push(eod.into()),
            }
        }

        let unmatched_emerchant: Vec<EmerchantSummary> = orders
            .iter()
            .zip(&consumed)
            .filter(|(_, used)| !**used)
            .map(|(tx, _)| tx.into())
            .collect();

        let summary = RunSummary {
            total_eod,
            total_emerchant,
            matched: matched.len(),
            unmatched_eod: unmatched_eod.len(),
            unmatched_emerchant: unmatched_emerchant.len(),
            threshold: params.threshold,
        };

        info!(
            "Reconciliation for {}: {} matched, {} eod unmatched, {} orders unmatched",
            params.uploaded_by, summary.matched, summary.unmatched_eod, summary.unmatched_emerchant
        );

        Ok(ReconciliationReport {
            matched,
            unmatched_eod,
            unmatched_emerchant,
            summary,
        })
    }

    /// Persist a report: one pending match row per matched pair, and the
    /// reconciliation state flipped on every order the run touched.
    /// Returns the number of match rows written.
    pub fn persist_matches(
        &self,
        report: &ReconciliationReport,
        matched_by: &str,
        notes: Option<&str>,
    ) -> Result<usize> {
        for pair in &report.matched {
            self.db.insert_match(&NewReconciliationMatch {
                eod_id: pair.eod.id,
                emerchant_id: pair.emerchant.id,
                match_score: pair.score,
                matched_by: matched_by.to_string(),
                notes: notes.map(String::from),
            })?;
            self.db
                .set_reconciliation_status(pair.emerchant.id, ReconciliationStatus::Matched)?;
        }

        for order in &report.unmatched_emerchant {
            self.db
                .set_reconciliation_status(order.id, ReconciliationStatus::Unmatched)?;
        }

        info!("Persisted {} matches for {}", report.matched.len(), matched_by);
        Ok(report.matched.len())
    }
}
