//! Delimited-text parsing on top of the `csv` crate.

use tracing::warn;

use crate::error::IngestionError;
use crate::types::Record;

use super::dialect::Dialect;

/// Parse `text` into records using `dialect`.
///
/// Rules:
///
/// - Every record is returned, including the header; nothing is trimmed.
/// - Records may have differing field counts (shape is handled by the caller).
/// - On the first malformed record parsing stops and the records read so far are returned
///   together with the error. A record is malformed when its quoting is broken (see
///   [`find_quoting_fault`]) or when the reader fails on it.
pub fn parse_records(text: &str, dialect: &Dialect) -> (Vec<Record>, Option<IngestionError>) {
    let fault = find_quoting_fault(text, dialect);
    let end = fault.map_or(text.len(), |f| f.offset);
    let mut rdr = dialect.csv_reader_builder().from_reader(text[..end].as_bytes());
    let (records, err) = parse_records_from_reader(&mut rdr);
    if err.is_some() {
        return (records, err);
    }
    if let Some(f) = fault {
        warn!(
            record = f.record,
            line = f.line,
            reason = f.reason,
            "malformed quoting; keeping records parsed so far"
        );
    }
    (records, fault.map(IngestionError::from))
}

/// First record whose quoting is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotingFault {
    /// Byte offset where the record starts.
    pub offset: usize,
    /// 1-based record number, header included.
    pub record: usize,
    /// 1-based line the record starts on.
    pub line: usize,
    pub reason: &'static str,
}

impl From<QuotingFault> for IngestionError {
    fn from(f: QuotingFault) -> Self {
        IngestionError::Quoting {
            record: f.record,
            line: f.line,
            reason: f.reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    RecordStart,
    Comment,
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Find the first record with an unterminated quoted field, a quote inside an unquoted field,
/// or text after a closing quote.
///
/// The `csv` reader accepts all three and folds the rest of the record (or of the document)
/// into one cell, so they are checked here with the same record boundaries it uses: blank lines
/// and comment lines only count at the start of a record, and a doubled quote inside a quoted
/// field is an escaped quote.
pub fn find_quoting_fault(text: &str, dialect: &Dialect) -> Option<QuotingFault> {
    let mut state = ScanState::RecordStart;
    let mut record_start = 0;
    let mut record_line = 1;
    let mut record = 0;
    let mut line = 1;

    for (pos, &b) in text.as_bytes().iter().enumerate() {
        let terminator = b == b'\n' || b == b'\r';
        if state == ScanState::RecordStart {
            if terminator {
                line += usize::from(b == b'\n');
                continue;
            }
            if Some(b) == dialect.comment {
                state = ScanState::Comment;
                continue;
            }
            record_start = pos;
            record_line = line;
            record += 1;
            state = ScanState::FieldStart;
        }

        let fault = |reason| QuotingFault {
            offset: record_start,
            record,
            line: record_line,
            reason,
        };
        state = match state {
            ScanState::Comment if b == b'\n' => ScanState::RecordStart,
            ScanState::Comment => ScanState::Comment,
            ScanState::Quoted if b == dialect.quote => ScanState::QuoteInQuoted,
            ScanState::Quoted => ScanState::Quoted,
            _ if terminator => ScanState::RecordStart,
            _ if b == dialect.delimiter => ScanState::FieldStart,
            ScanState::FieldStart if b == dialect.quote => ScanState::Quoted,
            ScanState::QuoteInQuoted if b == dialect.quote => ScanState::Quoted,
            ScanState::QuoteInQuoted => {
                return Some(fault("unexpected character after a closing quote"));
            }
            _ if b == dialect.quote => return Some(fault("quote inside an unquoted field")),
            _ => ScanState::Unquoted,
        };
        line += usize::from(b == b'\n');
    }

    (state == ScanState::Quoted).then_some(QuotingFault {
        offset: record_start,
        record,
        line: record_line,
        reason: "unterminated quoted field",
    })
}

/// Parse records from an existing CSV reader.
pub fn parse_records_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
) -> (Vec<Record>, Option<IngestionError>) {
    let mut records: Vec<Record> = Vec::new();
    for result in rdr.records() {
        match result {
            Ok(record) => records.push(record.iter().map(str::to_owned).collect()),
            Err(e) => {
                // Report 1-based record numbers.
                warn!(
                    parsed = records.len(),
                    record = records.len() + 1,
                    error = %e,
                    "malformed record; keeping records parsed so far"
                );
                return (records, Some(IngestionError::Csv(e)));
            }
        }
    }
    (records, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comma() -> Dialect {
        Dialect::default()
    }

    #[test]
    fn parses_plain_records() {
        let (records, err) = parse_records("a,b\n1,2\n", &comma());
        assert!(err.is_none());
        assert_eq!(records, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn quoted_fields_keep_delimiters_newlines_and_quotes() {
        let text = "id,note\n1,\"x, y\"\n2,\"two\nlines\"\n3,\"say \"\"hi\"\"\"\n";
        let (records, err) = parse_records(text, &comma());
        assert!(err.is_none());
        assert_eq!(records[1][1], "x, y");
        assert_eq!(records[2][1], "two\nlines");
        assert_eq!(records[3][1], "say \"hi\"");
    }

    #[test]
    fn fields_are_not_trimmed() {
        let (records, _) = parse_records("a, b \n", &comma());
        assert_eq!(records[0], vec!["a", " b "]);
    }

    #[test]
    fn ragged_records_are_kept() {
        let (records, err) = parse_records("a,b,c\n1\n1,2,3,4\n", &comma());
        assert!(err.is_none());
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].len(), 1);
        assert_eq!(records[2].len(), 4);
    }

    #[test]
    fn custom_delimiter_and_comment() {
        let dialect = Dialect {
            delimiter: b'\t',
            quote: b'"',
            comment: Some(b'#'),
        };
        let (records, _) = parse_records("# generated\na\tb\n1\t2\n", &dialect);
        assert_eq!(records, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn unterminated_quote_stops_before_the_record() {
        let (records, err) = parse_records("id,name\n1,\"Ada\n2,Bob\n3,Cy\n", &comma());
        assert_eq!(records, vec![vec!["id", "name"]]);
        match err {
            Some(IngestionError::Quoting { record, line, reason }) => {
                assert_eq!((record, line), (2, 2));
                assert_eq!(reason, "unterminated quoted field");
            }
            other => panic!("expected a quoting error, got {other:?}"),
        }
    }

    #[test]
    fn bare_quote_in_unquoted_field() {
        let (records, err) = parse_records("a,b\n1,2\n5\"x,1\n6,2\n", &comma());
        assert_eq!(records, vec![vec!["a", "b"], vec!["1", "2"]]);
        assert!(matches!(
            err,
            Some(IngestionError::Quoting { record: 3, line: 3, .. })
        ));
    }

    #[test]
    fn text_after_closing_quote() {
        let (records, err) = parse_records("a,b\n\"x\"y,1\n", &comma());
        assert_eq!(records.len(), 1);
        assert!(matches!(
            err,
            Some(IngestionError::Quoting {
                reason: "unexpected character after a closing quote",
                ..
            })
        ));
    }

    #[test]
    fn quoting_fault_counts_lines_inside_quoted_fields() {
        let text = "# note \"unbalanced\n\na,b\n1,\"two\nlines\"\n2,x\"\n";
        let dialect = Dialect {
            comment: Some(b'#'),
            ..Dialect::default()
        };
        let fault = find_quoting_fault(text, &dialect).unwrap();
        assert_eq!((fault.record, fault.line), (3, 6));
        assert_eq!(&text[fault.offset..], "2,x\"\n");
    }

    #[test]
    fn well_formed_quoting_has_no_fault() {
        let text = "id,note\n1,\"x, y\"\n2,\"say \"\"hi\"\"\"\n3,\"\"\n";
        assert_eq!(find_quoting_fault(text, &comma()), None);
    }

    #[test]
    fn reader_errors_stop_parsing_and_keep_prefix() {
        // Invalid UTF-8 in the third record makes the string reader fail.
        let bytes: &[u8] = b"a,b\n1,2\n\xff,3\n4,5\n";
        let mut rdr = Dialect::default().csv_reader_builder().from_reader(bytes);
        let (records, err) = parse_records_from_reader(&mut rdr);
        assert_eq!(records, vec![vec!["a", "b"], vec!["1", "2"]]);
        assert!(matches!(err, Some(IngestionError::Csv(_))));
    }
}
