//! Upload batch provenance operations

use rusqlite::{params, OptionalExtension, Row};

use super::{datetime_column, Database, DATETIME_FMT};
use crate::error::Result;
use crate::models::{BatchStatus, NewUploadBatch, SourceFormat, UploadBatch};

const BATCH_COLUMNS: &str =
    "id, batch_id, file_name, file_type, merchant_type, record_count, status, uploaded_by, uploaded_at";

fn batch_from_row(row: &Row<'_>) -> rusqlite::Result<UploadBatch> {
    let file_type: String = row.get(3)?;
    let file_type = file_type.parse::<SourceFormat>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;

    let status: String = row.get(6)?;
    let status = status.parse::<BatchStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(UploadBatch {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        file_name: row.get(2)?,
        file_type,
        merchant_type: row.get(4)?,
        record_count: row.get(5)?,
        status,
        uploaded_by: row.get(7)?,
        uploaded_at: datetime_column(8, row.get(8)?)?,
    })
}

impl Database {
    /// Record one ingestion call (completed or failed)
    pub fn insert_batch(&self, batch: &NewUploadBatch) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO upload_batches
                (batch_id, file_name, file_type, merchant_type, record_count, status, uploaded_by, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                batch.batch_id,
                batch.file_name,
                batch.file_type.as_str(),
                batch.merchant_type,
                batch.record_count,
                batch.status.as_str(),
                batch.uploaded_by,
                batch.uploaded_at.format(DATETIME_FMT).to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List batches, most recent first
    pub fn list_batches(&self, limit: i64) -> Result<Vec<UploadBatch>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM upload_batches ORDER BY id DESC LIMIT ?",
            BATCH_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit], batch_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Look up one batch by its public batch id
    pub fn get_batch(&self, batch_id: &str) -> Result<Option<UploadBatch>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM upload_batches WHERE batch_id = ?",
                    BATCH_COLUMNS
                ),
                params![batch_id],
                batch_from_row,
            )
            .optional()?)
    }

    pub fn count_batches(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM upload_batches", [], |row| row.get(0))?)
    }
}
