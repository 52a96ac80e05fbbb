//! File ingestion: raw export bytes to stored canonical records
//!
//! One ingestion call covers exactly one file and produces exactly one
//! batch id. Structural failures (unreadable file, unusable header)
//! come back as a failed report rather than an error; only
//! infrastructure faults (database unavailable) propagate as `Err`.

use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{Database, InsertOutcome};
use crate::error::Result;
use crate::models::{BatchStatus, NewUploadBatch, Provenance, SourceFormat};
use crate::normalize::{normalize_emerchant, normalize_eod, RejectionCounts};
use crate::sheet::read_table;

/// Outcome of one ingestion call
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub success: bool,
    pub batch_id: String,
    /// Normalized candidate records (after row-level rejection)
    pub records_processed: usize,
    /// Rows actually written; processed minus duplicates
    pub records_saved: usize,
    pub duplicates_skipped: usize,
    pub rejections: RejectionCounts,
    /// Sum of the amounts of saved rows
    pub total_amount: Decimal,
    pub error: Option<String>,
}

impl IngestReport {
    fn failed(batch_id: String, error: String) -> Self {
        Self {
            success: false,
            batch_id,
            records_processed: 0,
            records_saved: 0,
            duplicates_skipped: 0,
            rejections: RejectionCounts::default(),
            total_amount: Decimal::ZERO,
            error: Some(error),
        }
    }
}

/// Generate a batch id: format prefix, upload timestamp, short random
/// suffix so two uploads in the same second stay distinct.
fn generate_batch_id(format: SourceFormat, uploaded_at: NaiveDateTime) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        format.batch_prefix(),
        uploaded_at.format("%Y%m%d%H%M%S"),
        &suffix[..8]
    )
}

/// Ingestion pipeline over one database
pub struct Ingestor<'a> {
    db: &'a Database,
}

impl<'a> Ingestor<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Ingest one export file.
    ///
    /// `merchant_type` only applies to the e-merchant format, where it
    /// becomes the default merchant code for rows that carry none.
    pub fn ingest(
        &self,
        bytes: &[u8],
        file_name: &str,
        format: SourceFormat,
        uploaded_by: &str,
        merchant_type: Option<&str>,
    ) -> Result<IngestReport> {
        let uploaded_at = Local::now().naive_local();
        let batch_id = generate_batch_id(format, uploaded_at);

        let table = match read_table(bytes, file_name) {
            Ok(table) => table,
            Err(e) => {
                warn!("Rejected {}: {}", file_name, e);
                return Ok(IngestReport::failed(batch_id, e.to_string()));
            }
        };

        let prov = Provenance {
            uploaded_by: uploaded_by.to_string(),
            batch_id: batch_id.clone(),
            file_name: file_name.to_string(),
            uploaded_at,
        };

        match format {
            SourceFormat::Eod => match normalize_eod(&table) {
                Ok(sheet) => self.save_eod(sheet.records, sheet.rejected, &prov, format, None),
                Err(e) => self.fail_batch(&prov, format, None, e.to_string()),
            },
            SourceFormat::Emerchant => match normalize_emerchant(&table, merchant_type) {
                Ok(sheet) => self.save_emerchant(
                    sheet.records,
                    sheet.rejected,
                    &prov,
                    format,
                    merchant_type,
                ),
                Err(e) => self.fail_batch(&prov, format, merchant_type, e.to_string()),
            },
        }
    }

    fn save_eod(
        &self,
        records: Vec<crate::models::NewEodTransaction>,
        rejections: RejectionCounts,
        prov: &Provenance,
        format: SourceFormat,
        merchant_type: Option<&str>,
    ) -> Result<IngestReport> {
        let mut saved = 0usize;
        let mut duplicates = 0usize;
        let mut total_amount = Decimal::ZERO;
        let processed = records.len();

        for record in &records {
            match self.db.insert_eod(record, prov) {
                Ok(InsertOutcome::Inserted(_)) => {
                    saved += 1;
                    total_amount += record.amount;
                }
                Ok(InsertOutcome::Duplicate) => duplicates += 1,
                Err(e) => warn!("Skipping unstorable row in {}: {}", prov.file_name, e),
            }
        }

        self.finish_batch(
            prov,
            format,
            merchant_type,
            processed,
            saved,
            duplicates,
            rejections,
            total_amount,
        )
    }

    fn save_emerchant(
        &self,
        records: Vec<crate::models::NewEmerchantTransaction>,
        rejections: RejectionCounts,
        prov: &Provenance,
        format: SourceFormat,
        merchant_type: Option<&str>,
    ) -> Result<IngestReport> {
        let mut saved = 0usize;
        let mut duplicates = 0usize;
        let mut total_amount = Decimal::ZERO;
        let processed = records.len();

        for record in &records {
            match self.db.insert_emerchant(record, prov) {
                Ok(InsertOutcome::Inserted(_)) => {
                    saved += 1;
                    total_amount += record.amount;
                }
                Ok(InsertOutcome::Duplicate) => duplicates += 1,
                Err(e) => warn!("Skipping unstorable row in {}: {}", prov.file_name, e),
            }
        }

        self.finish_batch(
            prov,
            format,
            merchant_type,
            processed,
            saved,
            duplicates,
            rejections,
            total_amount,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_batch(
        &self,
        prov: &Provenance,
        format: SourceFormat,
        merchant_type: Option<&str>,
        processed: usize,
        saved: usize,
        duplicates: usize,
        rejections: RejectionCounts,
        total_amount: Decimal,
    ) -> Result<IngestReport> {
        self.db.insert_batch(&NewUploadBatch {
            batch_id: prov.batch_id.clone(),
            file_name: prov.file_name.clone(),
            file_type: format,
            merchant_type: merchant_type.map(String::from),
            record_count: saved as i64,
            status: BatchStatus::Completed,
            uploaded_by: prov.uploaded_by.clone(),
            uploaded_at: prov.uploaded_at,
        })?;

        info!(
            "Ingested {} as batch {}: {} saved, {} duplicates, {} rejected",
            prov.file_name,
            prov.batch_id,
            saved,
            duplicates,
            rejections.total()
        );

        Ok(IngestReport {
            success: true,
            batch_id: prov.batch_id.clone(),
            records_processed: processed,
            records_saved: saved,
            duplicates_skipped: duplicates,
            rejections,
            total_amount,
            error: None,
        })
    }

    /// Record a structurally unusable file as a failed batch
    fn fail_batch(
        &self,
        prov: &Provenance,
        format: SourceFormat,
        merchant_type: Option<&str>,
        reason: String,
    ) -> Result<IngestReport> {
        self.db.insert_batch(&NewUploadBatch {
            batch_id: prov.batch_id.clone(),
            file_name: prov.file_name.clone(),
            file_type: format,
            merchant_type: merchant_type.map(String::from),
            record_count: 0,
            status: BatchStatus::Failed,
            uploaded_by: prov.uploaded_by.clone(),
            uploaded_at: prov.uploaded_at,
        })?;

        warn!("Batch {} failed: {}", prov.batch_id, reason);
        Ok(IngestReport::failed(prov.batch_id.clone(), reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReconciliationStatus;
    use rust_decimal_macros::dec;

    const EOD_CSV: &str = "\
Daily Settlement Report,,,,,,
Terminal Name,TID,Date of Transaction,Card Type,Card Number,Receipt,Ref Number,Amount (RM)
,,,,,,
Terminal Name,TID,Date of Transaction,Card Type,Card Number,Receipt,Ref Number,Amount (RM)
STORE ALPHA,T001,14/01/2024 15:04,Visa,4111111111111111,R12345678901,REF001,\"RM1,250.00\"
STORE ALPHA,T001,14/01/2024 16:30,Visa,4222222222222222,R22345678901,REF002,RM80.50
STORE BETA,T002,14/01/2024 17:10,Mastercard,5111111111111111,R32345678901,REF003,RM10.00
";

    const MERCHANT_CSV: &str = "\
Order ID,Date,Total,Merchant,Status
ORD-1,2024-01-14,100.00,ALPHA,PAID
ORD-2,2024-01-15,55.50,ALPHA,PAID
ORD-3,,12.00,ALPHA,PAID
";

    #[test]
    fn test_ingest_eod_file() {
        let db = Database::in_memory().unwrap();
        let ingestor = Ingestor::new(&db);

        let report = ingestor
            .ingest(EOD_CSV.as_bytes(), "settlement.csv", SourceFormat::Eod, "alice", None)
            .unwrap();

        assert!(report.success);
        assert!(report.batch_id.starts_with("EOD_"));
        assert_eq!(report.records_processed, 2);
        assert_eq!(report.records_saved, 2);
        assert_eq!(report.duplicates_skipped, 0);
        assert_eq!(report.rejections.non_visa, 1);
        assert_eq!(report.total_amount, dec!(1330.50));

        let batch = db.get_batch(&report.batch_id).unwrap().unwrap();
        assert_eq!(batch.status, BatchStatus::Completed);
        assert_eq!(batch.record_count, 2);
        assert_eq!(db.count_eod().unwrap(), 2);
    }

    #[test]
    fn test_reingesting_same_file_only_skips() {
        let db = Database::in_memory().unwrap();
        let ingestor = Ingestor::new(&db);

        let first = ingestor
            .ingest(EOD_CSV.as_bytes(), "settlement.csv", SourceFormat::Eod, "alice", None)
            .unwrap();
        let second = ingestor
            .ingest(EOD_CSV.as_bytes(), "settlement.csv", SourceFormat::Eod, "alice", None)
            .unwrap();

        assert!(second.success);
        assert_ne!(first.batch_id, second.batch_id);
        assert_eq!(second.records_saved, 0);
        assert_eq!(second.duplicates_skipped, 2);
        assert_eq!(second.total_amount, dec!(0));
        assert_eq!(db.count_eod().unwrap(), 2);
        // Both uploads are on record
        assert_eq!(db.count_batches().unwrap(), 2);
    }

    #[test]
    fn test_ingest_emerchant_file_with_default_merchant() {
        let db = Database::in_memory().unwrap();
        let ingestor = Ingestor::new(&db);

        let report = ingestor
            .ingest(
                MERCHANT_CSV.as_bytes(),
                "orders.csv",
                SourceFormat::Emerchant,
                "alice",
                Some("shopify"),
            )
            .unwrap();

        assert!(report.success);
        assert!(report.batch_id.starts_with("EMR_"));
        assert_eq!(report.records_saved, 2);
        assert_eq!(report.rejections.missing_required, 1);
        assert_eq!(report.total_amount, dec!(155.50));

        let rows = db.list_emerchant_in_range("alice", None, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .all(|r| r.reconciliation_status == ReconciliationStatus::Pending));
    }

    #[test]
    fn test_unusable_header_records_failed_batch() {
        let db = Database::in_memory().unwrap();
        let ingestor = Ingestor::new(&db);

        // No duplicated "Terminal Name" marker anywhere
        let report = ingestor
            .ingest(
                b"just,some,cells\n1,2,3\n",
                "settlement.csv",
                SourceFormat::Eod,
                "alice",
                None,
            )
            .unwrap();

        assert!(!report.success);
        assert!(report.error.is_some());
        assert_eq!(db.count_eod().unwrap(), 0);

        let batch = db.get_batch(&report.batch_id).unwrap().unwrap();
        assert_eq!(batch.status, BatchStatus::Failed);
        assert_eq!(batch.record_count, 0);
    }

    #[test]
    fn test_unsupported_extension_reports_without_batch() {
        let db = Database::in_memory().unwrap();
        let ingestor = Ingestor::new(&db);

        let report = ingestor
            .ingest(b"%PDF-1.4", "report.pdf", SourceFormat::Eod, "alice", None)
            .unwrap();

        assert!(!report.success);
        assert!(report.error.unwrap().contains("report.pdf"));
        // Nothing was readable, so no provenance row either
        assert_eq!(db.count_batches().unwrap(), 0);
    }

    #[test]
    fn test_batch_id_shape() {
        let at = chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let id = generate_batch_id(SourceFormat::Emerchant, at);
        assert!(id.starts_with("EMR_20240115093000_"));
        assert_eq!(id.len(), "EMR_20240115093000_".len() + 8);
    }
}
