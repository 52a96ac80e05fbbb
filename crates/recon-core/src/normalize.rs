//! Tabular normalizers for the two source formats
//!
//! Each normalizer turns a [`RawTable`] into canonical insert-ready
//! records plus per-reason rejection counts. Row-level problems (bad
//! dates, wrong card-number length, missing required fields) drop the
//! offending row and never abort the batch; only a structurally broken
//! file (missing header block) produces an error, and even that is a
//! value the ingestion layer turns into a failed-batch report.

use std::collections::HashMap;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::clean::{
    canonical_column, clean_amount, opt_text, parse_eod_datetime, parse_merchant_date,
    truncate_receipt, valid_card_number,
};
use crate::models::{NewEmerchantTransaction, NewEodTransaction};
use crate::sheet::RawTable;

/// EOD exports embed a duplicated two-line header block; the row of the
/// second marker occurrence is the authoritative header.
const EOD_HEADER_MARKER: &str = "Terminal Name";

/// Header markers are only searched within the leading rows of the file.
const HEADER_SCAN_ROWS: usize = 50;

/// The file is structurally unusable for this format. Not a fault: the
/// caller records a failed batch and moves on.
#[derive(Debug, Error)]
#[error("incomplete header: {reason}")]
pub struct IncompleteHeader {
    pub reason: String,
}

/// Per-reason counts of dropped rows, for observability only
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RejectionCounts {
    pub non_visa: usize,
    pub bad_card_number: usize,
    pub bad_date: usize,
    pub missing_required: usize,
}

impl RejectionCounts {
    pub fn total(&self) -> usize {
        self.non_visa + self.bad_card_number + self.bad_date + self.missing_required
    }
}

/// Output of one normalization pass
#[derive(Debug)]
pub struct NormalizedSheet<T> {
    pub records: Vec<T>,
    pub rejected: RejectionCounts,
}

/// Canonical-name -> cell-index lookup derived from a header row.
///
/// Columns whose derived name is "nan" or empty are dropped (artifacts
/// of blank header cells in these exports). First occurrence wins for
/// duplicated names.
fn header_map(cells: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, cell) in cells.iter().enumerate() {
        let name = canonical_column(cell);
        if name.is_empty() || name == "nan" {
            continue;
        }
        map.entry(name).or_insert(idx);
    }
    map
}

fn cell<'a>(row: &'a [String], cols: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    cols.get(name).and_then(|&idx| row.get(idx)).map(String::as_str)
}

/// Original cells as a JSON object keyed by canonical column name,
/// preserved alongside the canonical record for audit.
fn row_to_json(row: &[String], cols: &HashMap<String, usize>) -> String {
    let mut map = serde_json::Map::new();
    for (name, &idx) in cols {
        if let Some(value) = row.get(idx) {
            map.insert(name.clone(), Value::String(value.clone()));
        }
    }
    json!(map).to_string()
}

/// Normalize a bank/EOD settlement export.
///
/// Header discovery: scan at most the first 50 rows for two occurrences
/// of the "Terminal Name" marker (the second check case-insensitive,
/// matching the sloppier second header block these exports carry).
/// Fewer than two occurrences means the file is incomplete.
pub fn normalize_eod(
    table: &RawTable,
) -> std::result::Result<NormalizedSheet<NewEodTransaction>, IncompleteHeader> {
    let mut marker_rows = Vec::new();
    for (idx, row) in table.rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let row_text = row.join(" ");
        let hit = if marker_rows.is_empty() {
            row_text.contains(EOD_HEADER_MARKER)
        } else {
            row_text.to_lowercase().contains(&EOD_HEADER_MARKER.to_lowercase())
        };
        if hit {
            marker_rows.push(idx);
            if marker_rows.len() == 2 {
                break;
            }
        }
    }

    if marker_rows.len() < 2 {
        return Err(IncompleteHeader {
            reason: format!(
                "{}: expected two '{}' header rows, found {}",
                table.file_name,
                EOD_HEADER_MARKER,
                marker_rows.len()
            ),
        });
    }

    let header_row = marker_rows[1];
    let cols = header_map(&table.rows[header_row]);
    let has_card_type = cols.contains_key("card_type");

    let mut records = Vec::new();
    let mut rejected = RejectionCounts::default();

    for row in &table.rows[header_row + 1..] {
        // Hard filter: only Visa settlement lines are reconciled. Files
        // without a card_type column keep all rows.
        if has_card_type {
            let is_visa = cell(row, &cols, "card_type")
                .map(|v| v.trim().eq_ignore_ascii_case("visa"))
                .unwrap_or(false);
            if !is_visa {
                rejected.non_visa += 1;
                continue;
            }
        }

        let Some(transaction_at) =
            cell(row, &cols, "date_of_transaction").and_then(parse_eod_datetime)
        else {
            rejected.bad_date += 1;
            continue;
        };

        let Some(card_number) = cell(row, &cols, "card_number").and_then(valid_card_number)
        else {
            rejected.bad_card_number += 1;
            continue;
        };

        // Non-numeric bank amounts coerce to 0.00 rather than dropping
        // the row; the merchant pipeline does the opposite.
        let amount = cell(row, &cols, "amount_rm")
            .and_then(clean_amount)
            .unwrap_or(Decimal::ZERO);

        records.push(NewEodTransaction {
            terminal_name: cell(row, &cols, "terminal_name").and_then(opt_text),
            tid: cell(row, &cols, "tid").and_then(opt_text),
            till_summary_no: cell(row, &cols, "till_summary_no").and_then(opt_text),
            till_closure_no: cell(row, &cols, "till_closure_no").and_then(opt_text),
            transaction_at,
            card_type: cell(row, &cols, "card_type").and_then(opt_text),
            card_number,
            receipt: cell(row, &cols, "receipt")
                .and_then(opt_text)
                .map(|r| truncate_receipt(&r)),
            ref_number: cell(row, &cols, "ref_number").and_then(opt_text),
            stan_no: cell(row, &cols, "stan_no").and_then(opt_text),
            acquirer_mid: cell(row, &cols, "acquirer_mid").and_then(opt_text),
            acquirer_tid: cell(row, &cols, "acquirer_tid").and_then(opt_text),
            approval_code: cell(row, &cols, "approval_code").and_then(opt_text),
            amount,
            raw_row: Some(row_to_json(row, &cols)),
        });
    }

    debug!(
        "Normalized {} EOD rows from {} ({} rejected)",
        records.len(),
        table.file_name,
        rejected.total()
    );
    Ok(NormalizedSheet { records, rejected })
}

/// Column aliases seen across gateway export variants. Resolution never
/// overwrites a column that already carries the canonical name.
const MERCHANT_SYNONYMS: [(&str, &str); 12] = [
    ("date", "transaction_date"),
    ("order_date", "transaction_date"),
    ("tran_date", "transaction_date"),
    ("total", "amount"),
    ("order_total", "amount"),
    ("orderid", "order_id"),
    ("merchant", "merchant_code"),
    ("store", "store_id"),
    ("email", "customer_email"),
    ("payment", "payment_method"),
    ("fee_amount", "fee"),
    ("net", "net_amount"),
];

fn parse_merchant_time(raw: &str) -> Option<NaiveTime> {
    let s = raw.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Normalize a gateway/e-commerce order export.
///
/// This format carries its header in row 0; no marker search. Rows
/// missing any of {transaction_date, amount, order_id} after cleaning
/// are dropped, and non-numeric merchant amounts become null (dropping
/// the row) rather than coercing to 0.00 like the bank path.
pub fn normalize_emerchant(
    table: &RawTable,
    merchant_type: Option<&str>,
) -> std::result::Result<NormalizedSheet<NewEmerchantTransaction>, IncompleteHeader> {
    if table.is_empty() {
        return Err(IncompleteHeader {
            reason: format!("{}: file is empty", table.file_name),
        });
    }

    let mut cols = header_map(&table.rows[0]);
    for (alias, canonical) in MERCHANT_SYNONYMS {
        if !cols.contains_key(canonical) {
            if let Some(&idx) = cols.get(alias) {
                cols.insert(canonical.to_string(), idx);
            }
        }
    }

    let mut records = Vec::new();
    let mut rejected = RejectionCounts::default();

    for row in &table.rows[1..] {
        let date_raw = cell(row, &cols, "transaction_date").and_then(opt_text);
        let transaction_date = date_raw.as_deref().and_then(parse_merchant_date);
        let order_id = cell(row, &cols, "order_id").and_then(opt_text);
        let amount = cell(row, &cols, "amount").and_then(clean_amount);

        let (Some(transaction_date), Some(order_id), Some(amount)) =
            (transaction_date, order_id, amount)
        else {
            // A date that was present but unparseable is a data error;
            // everything else missing is a required-field drop.
            if date_raw.is_some() && transaction_date.is_none() {
                rejected.bad_date += 1;
            } else {
                rejected.missing_required += 1;
            }
            continue;
        };

        records.push(NewEmerchantTransaction {
            merchant_code: cell(row, &cols, "merchant_code")
                .and_then(opt_text)
                .or_else(|| merchant_type.map(str::to_string)),
            store_id: cell(row, &cols, "store_id").and_then(opt_text),
            order_id,
            transaction_date,
            transaction_time: cell(row, &cols, "transaction_time")
                .or_else(|| cell(row, &cols, "time"))
                .and_then(parse_merchant_time),
            amount,
            fee: cell(row, &cols, "fee").and_then(clean_amount),
            net_amount: cell(row, &cols, "net_amount").and_then(clean_amount),
            customer_email: cell(row, &cols, "customer_email").and_then(opt_text),
            payment_method: cell(row, &cols, "payment_method").and_then(opt_text),
            status: cell(row, &cols, "status").and_then(opt_text),
            settlement_date: cell(row, &cols, "settlement_date").and_then(parse_merchant_date),
            raw_row: Some(row_to_json(row, &cols)),
        });
    }

    debug!(
        "Normalized {} merchant rows from {} ({} rejected)",
        records.len(),
        table.file_name,
        rejected.total()
    );
    Ok(NormalizedSheet { records, rejected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::read_table;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    /// A representative EOD export: report banner, duplicated two-line
    /// header block, then data rows.
    fn eod_fixture() -> RawTable {
        let csv = "\
Acquirer Settlement Report,,,,,,,
Generated 15/01/2024,,,,,,,
Terminal Name,TID,Date of Transaction,Card Type,Card Number,Receipt,Ref Number,Amount (RM),
Terminal Name,TID,Date of Transaction,Card Type,Card Number,Receipt,Ref Number,Amount (RM),
STORE ALPHA,T001,14/01/2024 09:15,Visa,4111111111111111,R12345678901234,REF001,RM100.50,junk
STORE ALPHA,T001,14 Jan 2024 10:30:05,VISA,4222222222222222,R2,REF002,\"1,250.00\",
STORE ALPHA,T001,14/01/2024 11:00,Mastercard,4333333333333333,R3,REF003,RM50.00,
STORE ALPHA,T001,14/01/2024 11:30,Visa,123,R4,REF004,RM75.00,
STORE ALPHA,T001,not a date,Visa,4444444444444444,R5,REF005,RM80.00,
STORE ALPHA,T001,14/01/2024 12:00,visa,4555555555555555,R6,REF006,pending,
";
        read_table(csv.as_bytes(), "eod.csv").unwrap()
    }

    #[test]
    fn eod_header_discovery_and_filters() {
        let sheet = normalize_eod(&eod_fixture()).unwrap();

        // Kept: REF001, REF002, REF006. Dropped: mastercard, short card,
        // unparseable date.
        assert_eq!(sheet.records.len(), 3);
        assert_eq!(sheet.rejected.non_visa, 1);
        assert_eq!(sheet.rejected.bad_card_number, 1);
        assert_eq!(sheet.rejected.bad_date, 1);

        let first = &sheet.records[0];
        assert_eq!(first.amount, dec!(100.50));
        assert_eq!(first.card_number, "4111111111111111");
        assert_eq!(first.receipt.as_deref(), Some("R123456789"));
        assert_eq!(
            first.transaction_at.date(),
            NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()
        );

        // Second data row exercised the alternate datetime format and
        // thousands separator.
        assert_eq!(sheet.records[1].amount, dec!(1250.00));

        // Non-numeric bank amount coerces to 0.00, row kept.
        assert_eq!(sheet.records[2].amount, dec!(0.00));
    }

    #[test]
    fn eod_requires_two_header_markers() {
        let csv = "\
Terminal Name,TID,Amount (RM)
STORE,T001,RM10.00
";
        let table = read_table(csv.as_bytes(), "partial.csv").unwrap();
        let err = normalize_eod(&table).unwrap_err();
        assert!(err.reason.contains("found 1"));
    }

    #[test]
    fn eod_without_card_type_keeps_all_rows() {
        let csv = "\
Terminal Name,Date of Transaction,Card Number,Amount (RM)
Terminal Name,Date of Transaction,Card Number,Amount (RM)
STORE,14/01/2024 09:15,4111111111111111,RM10.00
STORE,14/01/2024 09:20,4222222222222222,RM20.00
";
        let table = read_table(csv.as_bytes(), "nocardtype.csv").unwrap();
        let sheet = normalize_eod(&table).unwrap();
        assert_eq!(sheet.records.len(), 2);
        assert_eq!(sheet.rejected.non_visa, 0);
    }

    #[test]
    fn eod_second_marker_check_is_case_insensitive() {
        let csv = "\
Terminal Name,TID,Date of Transaction,Card Number,Amount (RM)
TERMINAL NAME,TID,Date of Transaction,Card Number,Amount (RM)
STORE,T001,14/01/2024 09:15,4111111111111111,RM10.00
";
        let table = read_table(csv.as_bytes(), "case.csv").unwrap();
        let sheet = normalize_eod(&table).unwrap();
        assert_eq!(sheet.records.len(), 1);
    }

    #[test]
    fn merchant_synonyms_and_required_fields() {
        let csv = "\
Merchant,Store,OrderId,Date,Total,Fee Amount,Net,Email,Payment,Status
SHOPX,S1,ORD-1,2024-01-14,100.00,2.50,97.50,a@b.com,card,paid
SHOPX,S1,ORD-2,14/01/2024,not-a-number,,,b@c.com,card,paid
SHOPX,S1,,2024-01-14,50.00,,,c@d.com,card,paid
SHOPX,S1,ORD-4,garbage,50.00,,,d@e.com,card,paid
";
        let table = read_table(csv.as_bytes(), "orders.csv").unwrap();
        let sheet = normalize_emerchant(&table, None).unwrap();

        // ORD-2: non-numeric amount is null on the merchant path, which
        // drops the row. ORD-4: unparseable date. Blank order id dropped.
        assert_eq!(sheet.records.len(), 1);
        assert_eq!(sheet.rejected.missing_required, 2);
        assert_eq!(sheet.rejected.bad_date, 1);

        let rec = &sheet.records[0];
        assert_eq!(rec.order_id, "ORD-1");
        assert_eq!(rec.merchant_code.as_deref(), Some("SHOPX"));
        assert_eq!(rec.store_id.as_deref(), Some("S1"));
        assert_eq!(rec.amount, dec!(100.00));
        assert_eq!(rec.fee, Some(dec!(2.50)));
        assert_eq!(rec.net_amount, Some(dec!(97.50)));
        assert_eq!(rec.customer_email.as_deref(), Some("a@b.com"));
        assert_eq!(rec.payment_method.as_deref(), Some("card"));
    }

    #[test]
    fn merchant_synonym_never_overwrites_canonical() {
        // Both `amount` and `total` present: canonical wins.
        let csv = "\
order_id,transaction_date,amount,total
ORD-1,2024-01-14,10.00,99.99
";
        let table = read_table(csv.as_bytes(), "orders.csv").unwrap();
        let sheet = normalize_emerchant(&table, None).unwrap();
        assert_eq!(sheet.records[0].amount, dec!(10.00));
    }

    #[test]
    fn merchant_code_defaults_to_merchant_type() {
        let csv = "\
order_id,transaction_date,amount
ORD-1,2024-01-14,10.00
";
        let table = read_table(csv.as_bytes(), "orders.csv").unwrap();
        let sheet = normalize_emerchant(&table, Some("grabfood")).unwrap();
        assert_eq!(sheet.records[0].merchant_code.as_deref(), Some("grabfood"));
    }

    #[test]
    fn merchant_date_fallback_chain() {
        let csv = "\
order_id,transaction_date,amount
A,2024-01-14,1.00
B,14/01/2024,1.00
C,01/14/2024,1.00
D,20240114,1.00
E,14-Jan-2024,1.00
";
        let table = read_table(csv.as_bytes(), "orders.csv").unwrap();
        let sheet = normalize_emerchant(&table, None).unwrap();
        assert_eq!(sheet.records.len(), 5);
        let expected = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        for rec in &sheet.records {
            assert_eq!(rec.transaction_date, expected);
        }
    }

    #[test]
    fn merchant_empty_file_is_structural() {
        let table = RawTable {
            file_name: "empty.csv".into(),
            rows: Vec::new(),
        };
        assert!(normalize_emerchant(&table, None).is_err());
    }
}
