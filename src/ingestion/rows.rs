//! Row materialization.

use tracing::warn;

use crate::error::IngestionError;
use crate::types::{Record, Row};

/// Turn data records (header excluded) into rows keyed by header name.
///
/// Shape policy for records whose width differs from the header:
///
/// - cells beyond the header width are dropped;
/// - header columns past the end of a short record are left out of the row (read as NULL).
///
/// Each ragged record is reported once, numbered from 1 in data order. When the header repeats a
/// name, the later cell wins.
pub fn materialize_rows(
    records: &[Record],
    header: &[String],
) -> (Vec<Row>, Vec<IngestionError>) {
    let mut diagnostics = Vec::new();
    let mut rows: Vec<Row> = Vec::with_capacity(records.len());

    for (idx, record) in records.iter().enumerate() {
        if record.len() != header.len() {
            diagnostics.push(IngestionError::RaggedRecord {
                record: idx + 1,
                expected: header.len(),
                found: record.len(),
            });
        }
        rows.push(
            header
                .iter()
                .zip(record.iter())
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
        );
    }

    if !diagnostics.is_empty() {
        warn!(
            ragged = diagnostics.len(),
            width = header.len(),
            "records with unexpected field counts"
        );
    }
    (rows, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn maps_header_names_to_cells() {
        let header = strings(&["id", "name"]);
        let records = vec![strings(&["1", "Alice"]), strings(&["2", "Bob"])];
        let (rows, diags) = materialize_rows(&records, &header);
        assert!(diags.is_empty());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), Some("1"));
        assert_eq!(rows[1].get("name"), Some("Bob"));
    }

    #[test]
    fn short_records_leave_columns_missing() {
        let header = strings(&["a", "b", "c"]);
        let (rows, diags) = materialize_rows(&[strings(&["1"])], &header);
        assert_eq!(rows[0].get("a"), Some("1"));
        assert_eq!(rows[0].get("b"), None);
        assert!(matches!(
            diags[..],
            [IngestionError::RaggedRecord {
                record: 1,
                expected: 3,
                found: 1
            }]
        ));
    }

    #[test]
    fn long_records_are_truncated() {
        let header = strings(&["a"]);
        let records = vec![strings(&["1"]), strings(&["2", "extra"])];
        let (rows, diags) = materialize_rows(&records, &header);
        assert_eq!(rows[1].len(), 1);
        assert_eq!(rows[1].get("a"), Some("2"));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].to_string().contains("record 2 has 2 fields"));
    }

    #[test]
    fn duplicate_header_later_cell_wins() {
        let header = strings(&["x", "x"]);
        let (rows, _) = materialize_rows(&[strings(&["first", "second"])], &header);
        assert_eq!(rows[0].get("x"), Some("second"));
    }
}
