//! Raw spreadsheet reading
//!
//! Both source formats arrive as loosely-structured exports with no
//! guaranteed header row, so everything is read into an untyped cell
//! grid first and the per-format normalizers decide what the rows mean.

use std::io::Cursor;

use calamine::{Data, Reader, Xls, Xlsx};
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{Error, Result};

/// An ordered grid of untyped cell values. Ephemeral; exists only
/// between file read and normalization.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub file_name: String,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read raw bytes into a [`RawTable`], dispatching on file extension.
///
/// `.csv` is read headerless and flexible (rows may have ragged widths);
/// `.xlsx`/`.xls` take the first worksheet. Any other extension is
/// rejected before any parse attempt.
pub fn read_table(bytes: &[u8], file_name: &str) -> Result<RawTable> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    let rows = match ext.as_str() {
        "csv" => read_csv(bytes)?,
        "xlsx" => read_xlsx(bytes)?,
        "xls" => read_xls(bytes)?,
        _ => {
            return Err(Error::UnsupportedFormat(format!(
                "{}: expected .csv, .xlsx or .xls",
                file_name
            )))
        }
    };

    debug!("Read {} raw rows from {}", rows.len(), file_name);
    Ok(RawTable {
        file_name: file_name.to_string(),
        rows,
    })
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(rows)
}

fn read_xlsx(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Vec::new()),
    };
    Ok(range_to_rows(&range))
}

fn read_xls(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut workbook: Xls<_> = Xls::new(Cursor::new(bytes))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Vec::new()),
    };
    Ok(range_to_rows(&range))
}

fn range_to_rows(range: &calamine::Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_headerless_and_ragged() {
        let csv = "a,b,c\n1,2\nx,y,z,extra\n";
        let table = read_table(csv.as_bytes(), "export.csv").unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0], vec!["a", "b", "c"]);
        assert_eq!(table.rows[1], vec!["1", "2"]);
        assert_eq!(table.rows[2].len(), 4);
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = read_table(b"whatever", "export.pdf").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));

        let err = read_table(b"whatever", "no_extension").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_extension_check_is_case_insensitive() {
        let table = read_table(b"a,b\n", "EXPORT.CSV").unwrap();
        assert_eq!(table.rows.len(), 1);
    }
}
