//! EOD settlement record operations

use chrono::NaiveDate;
use rusqlite::{params, Row};

use super::{datetime_column, decimal_column, Database, InsertOutcome, DATETIME_FMT};
use crate::error::Result;
use crate::models::{EodTransaction, NewEodTransaction, Provenance};

const EOD_COLUMNS: &str = "id, terminal_name, tid, till_summary_no, till_closure_no, \
     transaction_at, card_type, card_number, receipt, ref_number, stan_no, \
     acquirer_mid, acquirer_tid, approval_code, amount, \
     uploaded_by, batch_id, file_name, uploaded_at";

fn eod_from_row(row: &Row<'_>) -> rusqlite::Result<EodTransaction> {
    Ok(EodTransaction {
        id: row.get(0)?,
        terminal_name: row.get(1)?,
        tid: row.get(2)?,
        till_summary_no: row.get(3)?,
        till_closure_no: row.get(4)?,
        transaction_at: datetime_column(5, row.get(5)?)?,
        card_type: row.get(6)?,
        card_number: row.get(7)?,
        receipt: row.get(8)?,
        ref_number: row.get(9)?,
        stan_no: row.get(10)?,
        acquirer_mid: row.get(11)?,
        acquirer_tid: row.get(12)?,
        approval_code: row.get(13)?,
        amount: decimal_column(14, row.get(14)?)?,
        uploaded_by: row.get(15)?,
        batch_id: row.get(16)?,
        file_name: row.get(17)?,
        uploaded_at: datetime_column(18, row.get(18)?)?,
    })
}

impl Database {
    /// Insert an EOD record, skipping rows already present.
    ///
    /// Duplicates are detected by the natural key
    /// (tid, ref_number, transaction_at, amount).
    pub fn insert_eod(&self, tx: &NewEodTransaction, prov: &Provenance) -> Result<InsertOutcome> {
        let conn = self.conn()?;

        let changed = conn.execute(
            r#"
            INSERT OR IGNORE INTO eod_transactions
                (terminal_name, tid, till_summary_no, till_closure_no, transaction_at,
                 card_type, card_number, receipt, ref_number, stan_no,
                 acquirer_mid, acquirer_tid, approval_code, amount, raw_row,
                 uploaded_by, batch_id, file_name, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.terminal_name,
                tx.tid,
                tx.till_summary_no,
                tx.till_closure_no,
                tx.transaction_at.format(DATETIME_FMT).to_string(),
                tx.card_type,
                tx.card_number,
                tx.receipt,
                tx.ref_number,
                tx.stan_no,
                tx.acquirer_mid,
                tx.acquirer_tid,
                tx.approval_code,
                tx.amount.to_string(),
                tx.raw_row,
                prov.uploaded_by,
                prov.batch_id,
                prov.file_name,
                prov.uploaded_at.format(DATETIME_FMT).to_string(),
            ],
        )?;

        if changed == 1 {
            Ok(InsertOutcome::Inserted(conn.last_insert_rowid()))
        } else {
            Ok(InsertOutcome::Duplicate)
        }
    }

    /// List EOD records for one uploader within an optional date window
    /// (inclusive, on the transaction date). Ordered by insertion order.
    pub fn list_eod_in_range(
        &self,
        uploaded_by: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<EodTransaction>> {
        let conn = self.conn()?;

        let mut sql = format!(
            "SELECT {} FROM eod_transactions WHERE uploaded_by = ?",
            EOD_COLUMNS
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(uploaded_by.to_string())];

        if let Some(start) = start {
            sql.push_str(" AND date(transaction_at) >= ?");
            params.push(Box::new(start.to_string()));
        }
        if let Some(end) = end {
            sql.push_str(" AND date(transaction_at) <= ?");
            params.push(Box::new(end.to_string()));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), eod_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// List the most recent EOD records
    pub fn list_eod(&self, limit: i64) -> Result<Vec<EodTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM eod_transactions ORDER BY id DESC LIMIT ?",
            EOD_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit], eod_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn count_eod(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM eod_transactions", [], |row| row.get(0))?)
    }
}
