//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `eod` - Bank/terminal settlement record operations
//! - `emerchant` - Gateway order operations
//! - `batches` - Upload batch provenance
//! - `matches` - Persisted reconciliation matches

use chrono::{NaiveDate, NaiveDateTime};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::Result;

mod batches;
mod emerchant;
mod eod;
mod matches;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// SQLite datetime storage format
pub(crate) const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of inserting a transaction row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row was inserted, contains the new row id
    Inserted(i64),
    /// Row collided with the table's natural key and was skipped
    Duplicate,
}

/// Parse a stored TEXT amount back into a Decimal inside a row mapper
pub(crate) fn decimal_column(idx: usize, s: String) -> rusqlite::Result<Decimal> {
    s.parse::<Decimal>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Optional TEXT amount column
pub(crate) fn opt_decimal_column(idx: usize, s: Option<String>) -> rusqlite::Result<Option<Decimal>> {
    s.map(|s| decimal_column(idx, s)).transpose()
}

/// Parse a stored "YYYY-MM-DD HH:MM:SS" datetime inside a row mapper
pub(crate) fn datetime_column(idx: usize, s: String) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&s, DATETIME_FMT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a stored "YYYY-MM-DD" date inside a row mapper
pub(crate) fn date_column(idx: usize, s: String) -> rusqlite::Result<NaiveDate> {
    s.parse::<NaiveDate>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn opt_date_column(idx: usize, s: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    s.map(|s| date_column(idx, s)).transpose()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool and run migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because each pooled
    /// connection would otherwise see its own empty in-memory database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!("/tmp/recon_test_{}_{}.db", std::process::id(), id);

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Store temp tables in memory
            PRAGMA temp_store = MEMORY;

            -- Bank/terminal end-of-day settlement records.
            -- Amounts are stored as TEXT and parsed back into exact
            -- decimals; REAL would lose cents.
            CREATE TABLE IF NOT EXISTS eod_transactions (
                id INTEGER PRIMARY KEY,
                terminal_name TEXT,
                tid TEXT,
                till_summary_no TEXT,
                till_closure_no TEXT,
                transaction_at DATETIME NOT NULL,
                card_type TEXT,
                card_number TEXT NOT NULL,
                receipt TEXT,
                ref_number TEXT,
                stan_no TEXT,
                acquirer_mid TEXT,
                acquirer_tid TEXT,
                approval_code TEXT,
                amount TEXT NOT NULL,
                raw_row TEXT,                  -- JSON of the original cells
                uploaded_by TEXT NOT NULL,
                batch_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                uploaded_at DATETIME NOT NULL,
                UNIQUE(tid, ref_number, transaction_at, amount)
            );

            CREATE INDEX IF NOT EXISTS idx_eod_ref_number ON eod_transactions(ref_number);
            CREATE INDEX IF NOT EXISTS idx_eod_transaction_at ON eod_transactions(transaction_at);
            CREATE INDEX IF NOT EXISTS idx_eod_batch ON eod_transactions(batch_id);
            CREATE INDEX IF NOT EXISTS idx_eod_uploader ON eod_transactions(uploaded_by);

            -- Gateway/e-commerce order records
            CREATE TABLE IF NOT EXISTS emerchant_transactions (
                id INTEGER PRIMARY KEY,
                merchant_code TEXT,
                store_id TEXT,
                order_id TEXT NOT NULL,
                transaction_date DATE NOT NULL,
                transaction_time TIME,
                amount TEXT NOT NULL,
                fee TEXT,
                net_amount TEXT,
                customer_email TEXT,
                payment_method TEXT,
                status TEXT,
                settlement_date DATE,
                reconciliation_status TEXT NOT NULL DEFAULT 'PENDING',
                raw_row TEXT,
                uploaded_by TEXT NOT NULL,
                batch_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                uploaded_at DATETIME NOT NULL,
                UNIQUE(order_id, transaction_date, amount)
            );

            CREATE INDEX IF NOT EXISTS idx_emerchant_order ON emerchant_transactions(order_id);
            CREATE INDEX IF NOT EXISTS idx_emerchant_date ON emerchant_transactions(transaction_date);
            CREATE INDEX IF NOT EXISTS idx_emerchant_status ON emerchant_transactions(reconciliation_status);
            CREATE INDEX IF NOT EXISTS idx_emerchant_batch ON emerchant_transactions(batch_id);
            CREATE INDEX IF NOT EXISTS idx_emerchant_uploader ON emerchant_transactions(uploaded_by);

            -- Upload batches (one row per ingestion call, success or not)
            CREATE TABLE IF NOT EXISTS upload_batches (
                id INTEGER PRIMARY KEY,
                batch_id TEXT NOT NULL UNIQUE,
                file_name TEXT NOT NULL,
                file_type TEXT NOT NULL,          -- eod, emerchant
                merchant_type TEXT,
                record_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,             -- completed, failed
                uploaded_by TEXT NOT NULL,
                uploaded_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_batches_uploader ON upload_batches(uploaded_by);
            CREATE INDEX IF NOT EXISTS idx_batches_uploaded_at ON upload_batches(uploaded_at);

            -- Persisted reconciliation matches awaiting review
            CREATE TABLE IF NOT EXISTS reconciliation_matches (
                id INTEGER PRIMARY KEY,
                eod_id INTEGER NOT NULL REFERENCES eod_transactions(id),
                emerchant_id INTEGER NOT NULL REFERENCES emerchant_transactions(id),
                match_score INTEGER NOT NULL,
                match_status TEXT NOT NULL DEFAULT 'pending',  -- pending, confirmed, rejected
                matched_by TEXT NOT NULL,
                matched_at DATETIME NOT NULL,
                notes TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_matches_eod ON reconciliation_matches(eod_id);
            CREATE INDEX IF NOT EXISTS idx_matches_emerchant ON reconciliation_matches(emerchant_id);
            CREATE INDEX IF NOT EXISTS idx_matches_status ON reconciliation_matches(match_status);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
