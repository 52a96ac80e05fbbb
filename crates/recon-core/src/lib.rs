//! Recon Core Library
//!
//! Shared functionality for the recon transaction reconciliation tool:
//! - Database access and migrations
//! - Spreadsheet readers and per-format normalizers for bank EOD and
//!   e-merchant gateway exports
//! - Field cleaners for currency text, dates, and card numbers
//! - Weighted fuzzy match scoring
//! - Greedy reconciliation engine with batch provenance

pub mod clean;
pub mod db;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod score;
pub mod sheet;

pub use db::{Database, InsertOutcome};
pub use engine::{
    Engine, EodSummary, EmerchantSummary, MatchedPair, ReconciliationReport, RunParams,
    RunSummary, DEFAULT_THRESHOLD,
};
pub use error::{Error, Result};
pub use ingest::{IngestReport, Ingestor};
pub use models::{
    BatchStatus, EmerchantTransaction, EodTransaction, MatchStatus, NewEmerchantTransaction,
    NewEodTransaction, NewReconciliationMatch, NewUploadBatch, Provenance, ReconciliationMatch,
    ReconciliationStatus, SourceFormat, UploadBatch,
};
pub use normalize::{IncompleteHeader, NormalizedSheet, RejectionCounts};
pub use score::{match_score, MatchCriteria, MAX_SCORE};
pub use sheet::{read_table, RawTable};
