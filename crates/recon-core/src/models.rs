//! Domain models for recon

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The two ledger export formats the ingestion pipeline understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Acquirer/bank end-of-day settlement export
    Eod,
    /// Payment gateway / e-commerce order export
    Emerchant,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eod => "eod",
            Self::Emerchant => "emerchant",
        }
    }

    /// Batch id prefix for this format
    pub fn batch_prefix(&self) -> &'static str {
        match self {
            Self::Eod => "EOD",
            Self::Emerchant => "EMR",
        }
    }
}

impl std::str::FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eod" | "bank" => Ok(Self::Eod),
            "emerchant" | "merchant" => Ok(Self::Emerchant),
            _ => Err(format!("Unknown source format: {}", s)),
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconciliation state of an e-merchant order.
///
/// Only the reconciliation engine's persistence path mutates this;
/// ingestion always writes PENDING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReconciliationStatus {
    #[default]
    Pending,
    Matched,
    Unmatched,
}

impl ReconciliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Matched => "MATCHED",
            Self::Unmatched => "UNMATCHED",
        }
    }
}

impl std::str::FromStr for ReconciliationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "MATCHED" => Ok(Self::Matched),
            "UNMATCHED" => Ok(Self::Unmatched),
            _ => Err(format!("Unknown reconciliation status: {}", s)),
        }
    }
}

/// Review state of a persisted match.
///
/// Transitions pending -> confirmed and pending -> rejected happen only
/// through explicit review; matches are never auto-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown match status: {}", s)),
        }
    }
}

/// Outcome of one ingestion batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown batch status: {}", s)),
        }
    }
}

/// Provenance stamped on every record ingested from one file
#[derive(Debug, Clone)]
pub struct Provenance {
    pub uploaded_by: String,
    pub batch_id: String,
    pub file_name: String,
    pub uploaded_at: NaiveDateTime,
}

/// A normalized bank/terminal settlement line, ready for insert
#[derive(Debug, Clone)]
pub struct NewEodTransaction {
    pub terminal_name: Option<String>,
    pub tid: Option<String>,
    pub till_summary_no: Option<String>,
    pub till_closure_no: Option<String>,
    pub transaction_at: NaiveDateTime,
    pub card_type: Option<String>,
    /// Exactly 16 digits; rows failing this never reach insert
    pub card_number: String,
    /// Truncated to the first 10 characters (legacy fixed width)
    pub receipt: Option<String>,
    pub ref_number: Option<String>,
    pub stan_no: Option<String>,
    pub acquirer_mid: Option<String>,
    pub acquirer_tid: Option<String>,
    pub approval_code: Option<String>,
    pub amount: Decimal,
    /// JSON of the original cells keyed by derived header name
    pub raw_row: Option<String>,
}

/// A stored bank/terminal settlement line
#[derive(Debug, Clone, Serialize)]
pub struct EodTransaction {
    pub id: i64,
    pub terminal_name: Option<String>,
    pub tid: Option<String>,
    pub till_summary_no: Option<String>,
    pub till_closure_no: Option<String>,
    pub transaction_at: NaiveDateTime,
    pub card_type: Option<String>,
    pub card_number: String,
    pub receipt: Option<String>,
    pub ref_number: Option<String>,
    pub stan_no: Option<String>,
    pub acquirer_mid: Option<String>,
    pub acquirer_tid: Option<String>,
    pub approval_code: Option<String>,
    pub amount: Decimal,
    pub uploaded_by: String,
    pub batch_id: String,
    pub file_name: String,
    pub uploaded_at: NaiveDateTime,
}

impl EodTransaction {
    /// Acquirer-side merchant label used by the merchant sub-score.
    ///
    /// Terminal name is the merchant label in these exports; the TID is
    /// the fallback when a file omits it.
    pub fn merchant_label(&self) -> Option<&str> {
        self.terminal_name.as_deref().or(self.tid.as_deref())
    }
}

/// A normalized gateway/order line, ready for insert
#[derive(Debug, Clone)]
pub struct NewEmerchantTransaction {
    pub merchant_code: Option<String>,
    pub store_id: Option<String>,
    pub order_id: String,
    pub transaction_date: NaiveDate,
    pub transaction_time: Option<NaiveTime>,
    pub amount: Decimal,
    pub fee: Option<Decimal>,
    pub net_amount: Option<Decimal>,
    pub customer_email: Option<String>,
    pub payment_method: Option<String>,
    pub status: Option<String>,
    pub settlement_date: Option<NaiveDate>,
    pub raw_row: Option<String>,
}

/// A stored gateway/order line
#[derive(Debug, Clone, Serialize)]
pub struct EmerchantTransaction {
    pub id: i64,
    pub merchant_code: Option<String>,
    pub store_id: Option<String>,
    pub order_id: String,
    pub transaction_date: NaiveDate,
    pub transaction_time: Option<NaiveTime>,
    pub amount: Decimal,
    pub fee: Option<Decimal>,
    pub net_amount: Option<Decimal>,
    pub customer_email: Option<String>,
    pub payment_method: Option<String>,
    pub status: Option<String>,
    pub settlement_date: Option<NaiveDate>,
    pub reconciliation_status: ReconciliationStatus,
    pub uploaded_by: String,
    pub batch_id: String,
    pub file_name: String,
    pub uploaded_at: NaiveDateTime,
}

/// Provenance record for one ingestion call
#[derive(Debug, Clone, Serialize)]
pub struct UploadBatch {
    pub id: i64,
    pub batch_id: String,
    pub file_name: String,
    pub file_type: SourceFormat,
    pub merchant_type: Option<String>,
    pub record_count: i64,
    pub status: BatchStatus,
    pub uploaded_by: String,
    pub uploaded_at: NaiveDateTime,
}

/// Insert payload for an upload batch row
#[derive(Debug, Clone)]
pub struct NewUploadBatch {
    pub batch_id: String,
    pub file_name: String,
    pub file_type: SourceFormat,
    pub merchant_type: Option<String>,
    pub record_count: i64,
    pub status: BatchStatus,
    pub uploaded_by: String,
    pub uploaded_at: NaiveDateTime,
}

/// A persisted match between one EOD record and one e-merchant order
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationMatch {
    pub id: i64,
    pub eod_id: i64,
    pub emerchant_id: i64,
    pub match_score: i64,
    pub match_status: MatchStatus,
    pub matched_by: String,
    pub matched_at: NaiveDateTime,
    pub notes: Option<String>,
}

/// Insert payload for a reconciliation match
#[derive(Debug, Clone)]
pub struct NewReconciliationMatch {
    pub eod_id: i64,
    pub emerchant_id: i64,
    pub match_score: i64,
    pub matched_by: String,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_format_roundtrip() {
        assert_eq!("eod".parse::<SourceFormat>().unwrap(), SourceFormat::Eod);
        assert_eq!(
            "merchant".parse::<SourceFormat>().unwrap(),
            SourceFormat::Emerchant
        );
        assert_eq!(SourceFormat::Eod.batch_prefix(), "EOD");
        assert!("sftp".parse::<SourceFormat>().is_err());
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(
            "matched".parse::<ReconciliationStatus>().unwrap(),
            ReconciliationStatus::Matched
        );
        assert_eq!(
            "Confirmed".parse::<MatchStatus>().unwrap(),
            MatchStatus::Confirmed
        );
        assert_eq!(
            "FAILED".parse::<BatchStatus>().unwrap(),
            BatchStatus::Failed
        );
    }
}
