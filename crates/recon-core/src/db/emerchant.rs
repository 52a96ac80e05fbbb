//! E-merchant order operations

use chrono::NaiveDate;
use rusqlite::{params, Row};

use super::{
    date_column, datetime_column, decimal_column, opt_date_column, opt_decimal_column, Database,
    InsertOutcome, DATETIME_FMT,
};
use crate::error::{Error, Result};
use crate::models::{
    EmerchantTransaction, NewEmerchantTransaction, Provenance, ReconciliationStatus,
};

const EMERCHANT_COLUMNS: &str = "id, merchant_code, store_id, order_id, transaction_date, \
     transaction_time, amount, fee, net_amount, customer_email, payment_method, status, \
     settlement_date, reconciliation_status, uploaded_by, batch_id, file_name, uploaded_at";

fn emerchant_from_row(row: &Row<'_>) -> rusqlite::Result<EmerchantTransaction> {
    let status: String = row.get(13)?;
    let reconciliation_status = status.parse::<ReconciliationStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            13,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })?;

    let time: Option<String> = row.get(5)?;
    let transaction_time = time
        .map(|t| {
            t.parse::<chrono::NaiveTime>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()?;

    Ok(EmerchantTransaction {
        id: row.get(0)?,
        merchant_code: row.get(1)?,
        store_id: row.get(2)?,
        order_id: row.get(3)?,
        transaction_date: date_column(4, row.get(4)?)?,
        transaction_time,
        amount: decimal_column(6, row.get(6)?)?,
        fee: opt_decimal_column(7, row.get(7)?)?,
        net_amount: opt_decimal_column(8, row.get(8)?)?,
        customer_email: row.get(9)?,
        payment_method: row.get(10)?,
        status: row.get(11)?,
        settlement_date: opt_date_column(12, row.get(12)?)?,
        reconciliation_status,
        uploaded_by: row.get(14)?,
        batch_id: row.get(15)?,
        file_name: row.get(16)?,
        uploaded_at: datetime_column(17, row.get(17)?)?,
    })
}

impl Database {
    /// Insert an order record, skipping rows already present.
    ///
    /// Duplicates are detected by the natural key
    /// (order_id, transaction_date, amount). New rows always start in
    /// the PENDING reconciliation state.
    pub fn insert_emerchant(
        &self,
        tx: &NewEmerchantTransaction,
        prov: &Provenance,
    ) -> Result<InsertOutcome> {
        let conn = self.conn()?;

        let changed = conn.execute(
            r#"
            INSERT OR IGNORE INTO emerchant_transactions
                (merchant_code, store_id, order_id, transaction_date, transaction_time,
                 amount, fee, net_amount, customer_email, payment_method, status,
                 settlement_date, raw_row, uploaded_by, batch_id, file_name, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.merchant_code,
                tx.store_id,
                tx.order_id,
                tx.transaction_date.to_string(),
                tx.transaction_time.map(|t| t.format("%H:%M:%S").to_string()),
                tx.amount.to_string(),
                tx.fee.map(|d| d.to_string()),
                tx.net_amount.map(|d| d.to_string()),
                tx.customer_email,
                tx.payment_method,
                tx.status,
                tx.settlement_date.map(|d| d.to_string()),
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

    /// List order records for one uploader within an optional inclusive
    /// date window. Ordered by insertion order.
    pub fn list_emerchant_in_range(
        &self,
        uploaded_by: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<EmerchantTransaction>> {
        let conn = self.conn()?;

        let mut sql = format!(
            "SELECT {} FROM emerchant_transactions WHERE uploaded_by = ?",
            EMERCHANT_COLUMNS
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(uploaded_by.to_string())];

        if let Some(start) = start {
            sql.push_str(" AND transaction_date >= ?");
            params.push(Box::new(start.to_string()));
        }
        if let Some(end) = end {
            sql.push_str(" AND transaction_date <= ?");
            params.push(Box::new(end.to_string()));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), emerchant_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// List the most recent order records
    pub fn list_emerchant(&self, limit: i64) -> Result<Vec<EmerchantTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM emerchant_transactions ORDER BY id DESC LIMIT ?",
            EMERCHANT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit], emerchant_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Update one order's reconciliation state
    pub fn set_reconciliation_status(
        &self,
        id: i64,
        status: ReconciliationStatus,
    ) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE emerchant_transactions SET reconciliation_status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("emerchant transaction {}", id)));
        }
        Ok(())
    }

    pub fn count_emerchant(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM emerchant_transactions",
            [],
            |row| row.get(0),
        )?)
    }

    /// Count orders by reconciliation state
    pub fn count_emerchant_by_status(&self, status: ReconciliationStatus) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM emerchant_transactions WHERE reconciliation_status = ?",
            params![status.as_str()],
            |row| row.get(0),
        )?)
    }
}
