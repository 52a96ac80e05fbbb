//! Reconciliation match operations

use chrono::Local;
use rusqlite::{params, Row};

use super::{datetime_column, Database, DATETIME_FMT};
use crate::error::{Error, Result};
use crate::models::{MatchStatus, NewReconciliationMatch, ReconciliationMatch};

const MATCH_COLUMNS: &str =
    "id, eod_id, emerchant_id, match_score, match_status, matched_by, matched_at, notes";

fn match_from_row(row: &Row<'_>) -> rusqlite::Result<ReconciliationMatch> {
    let status: String = row.get(4)?;
    let match_status = status.parse::<MatchStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(ReconciliationMatch {
        id: row.get(0)?,
        eod_id: row.get(1)?,
        emerchant_id: row.get(2)?,
        match_score: row.get(3)?,
        match_status,
        matched_by: row.get(5)?,
        matched_at: datetime_column(6, row.get(6)?)?,
        notes: row.get(7)?,
    })
}

impl Database {
    /// Persist one match in the pending review state
    pub fn insert_match(&self, m: &NewReconciliationMatch) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO reconciliation_matches
                (eod_id, emerchant_id, match_score, match_status, matched_by, matched_at, notes)
            VALUES (?, ?, ?, 'pending', ?, ?, ?)
            "#,
            params![
                m.eod_id,
                m.emerchant_id,
                m.match_score,
                m.matched_by,
                Local::now().naive_local().format(DATETIME_FMT).to_string(),
                m.notes,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List matches, most recent first
    pub fn list_matches(&self, limit: i64) -> Result<Vec<ReconciliationMatch>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reconciliation_matches ORDER BY id DESC LIMIT ?",
            MATCH_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit], match_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Review a pending match: pending -> confirmed or pending -> rejected.
    ///
    /// Already-reviewed matches are left untouched; re-reviewing is an
    /// error rather than a silent overwrite.
    pub fn set_match_status(&self, id: i64, status: MatchStatus) -> Result<()> {
        if status == MatchStatus::Pending {
            return Err(Error::InvalidData(
                "a match cannot be moved back to pending".to_string(),
            ));
        }

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE reconciliation_matches SET match_status = ? WHERE id = ? AND match_status = 'pending'",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("pending match {}", id)));
        }
        Ok(())
    }

    pub fn count_matches(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM reconciliation_matches",
            [],
            |row| row.get(0),
        )?)
    }
}
