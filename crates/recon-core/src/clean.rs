//! Shared field cleaners for noisy spreadsheet values
//!
//! Both export formats arrive with locale-specific currency text,
//! inconsistent date formats, and free-text identifier columns. Every
//! cleaner here degrades to `None` (or a caller-chosen fallback) instead
//! of erroring; row-level data problems are expected, high-frequency
//! occurrences and must never abort a batch.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// Accepted EOD combined date+time formats, first successful parse wins
const EOD_DATETIME_FORMATS: [&str; 2] = [
    "%d/%m/%Y %H:%M",    // 14/01/2024 15:04
    "%d %b %Y %H:%M:%S", // 14 Jan 2024 15:04:05
];

/// Accepted merchant date formats, tried after the default ISO parse
const MERCHANT_DATE_FORMATS: [&str; 5] = [
    "%Y-%m-%d", // 2024-01-14
    "%d/%m/%Y", // 14/01/2024
    "%m/%d/%Y", // 01/14/2024
    "%Y%m%d",   // 20240114
    "%d-%b-%Y", // 14-Jan-2024
];

/// Parse a currency string into an exact decimal amount.
///
/// Strips the "RM" currency marker (case-insensitive), thousands
/// separators, and every remaining character outside `[0-9.]` before
/// parsing. Empty or unparseable input yields `None`; the bank pipeline
/// falls back to 0.00 while the merchant pipeline propagates the `None`
/// into a row drop. That asymmetry is intentional per source format.
pub fn clean_amount(raw: &str) -> Option<Decimal> {
    let mut s = raw.trim().to_string();
    // Remove the currency marker in any casing before the char filter
    // so "rm1,234.50" and "RM 1,234.50" both survive.
    let lower = s.to_lowercase();
    if let Some(pos) = lower.find("rm") {
        s.replace_range(pos..pos + 2, "");
    }
    let cleaned: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<Decimal>().ok().map(|d| d.round_dp(2))
}

/// Parse an EOD combined date+time against the ordered format list
pub fn parse_eod_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    EOD_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Parse a merchant transaction date.
///
/// The default locale-aware parse (ISO via FromStr) is tried first, then
/// the explicit format list; rows where everything fails get a null date
/// and are dropped by the normalizer.
pub fn parse_merchant_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = s.parse::<NaiveDate>() {
        return Some(date);
    }
    MERCHANT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Validate a card number: exactly 16 characters after trimming.
///
/// Anything else is dropped, never truncated or padded.
pub fn valid_card_number(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.chars().count() == 16 {
        Some(s.to_string())
    } else {
        None
    }
}

/// Truncate a receipt value to its first 10 characters (legacy fixed
/// width constraint in the settlement system downstream).
pub fn truncate_receipt(raw: &str) -> String {
    raw.chars().take(10).collect()
}

/// Canonicalize a header cell into a column name: lowercase, trimmed,
/// spaces to underscores, parentheses stripped.
pub fn canonical_column(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace(['(', ')'], "")
}

/// Non-empty trimmed cell value, or None
pub fn opt_text(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
