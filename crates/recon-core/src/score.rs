//! Confidence scoring between one EOD record and one e-merchant order
//!
//! Pure function over the two records and a criteria configuration.
//! Three independently togglable weighted sub-scores: amount (max 40),
//! date (max 30), merchant (max 30). The banding and branch order are
//! pinned by the reconciliation test suite; the absolute amount bands
//! are checked before the percentage fallback, which only applies when
//! both amounts are positive.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::{EmerchantTransaction, EodTransaction};

/// Which sub-scores participate in a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchCriteria {
    pub match_amount: bool,
    pub match_date: bool,
    pub match_merchant: bool,
}

impl Default for MatchCriteria {
    fn default() -> Self {
        Self {
            match_amount: true,
            match_date: true,
            match_merchant: false,
        }
    }
}

/// Maximum confidence score
pub const MAX_SCORE: i64 = 100;

/// Compute the 0-100 confidence that the two records are the same
/// real-world payment.
pub fn match_score(
    eod: &EodTransaction,
    order: &EmerchantTransaction,
    criteria: &MatchCriteria,
) -> i64 {
    let mut score: i64 = 0;

    if criteria.match_amount {
        score += amount_score(eod.amount, order.amount);
    }

    if criteria.match_date {
        let days = (eod.transaction_at.date() - order.transaction_date)
            .num_days()
            .abs();
        score += match days {
            0 => 30,
            1 => 20,
            2..=3 => 10,
            _ => 0,
        };
    }

    if criteria.match_merchant {
        if let (Some(label), Some(code)) = (eod.merchant_label(), order.merchant_code.as_deref()) {
            if contains_either_way(label, code) {
                score += 30;
            }
        }
    }

    // Redundant while the maxima sum to 100, enforced anyway.
    score.min(MAX_SCORE)
}

/// Amount sub-score: absolute bands first (within 10 sen, within RM 1),
/// percentage-difference fallback only when both amounts are positive.
fn amount_score(eod_amount: Decimal, merchant_amount: Decimal) -> i64 {
    let diff = (eod_amount - merchant_amount).abs();

    if diff <= dec!(0.10) {
        40
    } else if diff <= dec!(1.00) {
        20
    } else if eod_amount > Decimal::ZERO && merchant_amount > Decimal::ZERO {
        let pct = diff / eod_amount.max(merchant_amount);
        if pct <= dec!(0.05) {
            30
        } else if pct <= dec!(0.10) {
            15
        } else {
            0
        }
    } else {
        0
    }
}

/// Case-insensitive substring containment in either direction
fn contains_either_way(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}
