//! Discovery pipeline.
//!
//! Most callers should use [`crate::host::Plugin`], which runs [`discover_from_url`] once per
//! registration. The functions here can also be used directly:
//!
//! - [`discover_from_url`] fetches a resource over HTTP and discovers a table from it;
//! - [`discover_from_reader`] does the same for any [`Read`] source;
//! - [`discover_from_text`] skips the fetch and starts from text already in memory.
//!
//! None of them fail. Every problem met along the way is kept in [`Discovery::diagnostics`] and,
//! if an [`IngestionObserver`] is configured, reported to it; the worst case is an empty table.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use reqwest::blocking::Client;
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::error::{DiagnosticKind, IngestionError};
use crate::types::{RawDocument, Record, TableSchema};

use super::csv::parse_records;
use super::dialect::{DEFAULT_SAMPLE_RECORDS, DelimiterDetector, Dialect, quote_byte};
use super::fetch::{FetchOptions, fetch_url, read_bounded};
use super::header::{generated_header, validate_header};
use super::infer::infer_columns;
use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};
use super::rows::materialize_rows;

/// Name of the table exposed for a connection.
pub const DEFAULT_TABLE_NAME: &str = "http";

/// Options controlling discovery.
///
/// Use [`Default`] for common cases or [`IngestionOptions::from_config`] to honor a
/// [`ConnectionConfig`].
#[derive(Clone)]
pub struct IngestionOptions {
    /// Table name used in observer context.
    pub table_name: String,
    /// Fetch limits.
    pub fetch: FetchOptions,
    /// Delimiter override. `None` means detect it.
    pub separator: Option<u8>,
    /// Quote character for detection and parsing.
    pub quote: char,
    /// Comment character; lines starting with it are ignored.
    pub comment: Option<u8>,
    /// Whether the first record holds column names.
    pub has_header: bool,
    /// Discard all data when the header is invalid.
    pub strict_header: bool,
    /// Number of records sampled for delimiter detection.
    pub sample_records: usize,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("table_name", &self.table_name)
            .field("fetch", &self.fetch)
            .field("separator", &self.separator.map(char::from))
            .field("quote", &self.quote)
            .field("comment", &self.comment.map(char::from))
            .field("has_header", &self.has_header)
            .field("strict_header", &self.strict_header)
            .field("sample_records", &self.sample_records)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            fetch: FetchOptions::default(),
            separator: None,
            quote: '"',
            comment: None,
            has_header: true,
            strict_header: false,
            sample_records: DEFAULT_SAMPLE_RECORDS,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

impl IngestionOptions {
    /// Options reflecting a validated connection configuration.
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            fetch: config.fetch_options(),
            separator: config.separator_byte(),
            comment: config.comment_byte().ok().flatten(),
            has_header: config.header,
            strict_header: config.strict_header,
            ..Default::default()
        }
    }
}

/// Outcome of a discovery run.
#[derive(Debug)]
pub struct Discovery {
    /// Discovered columns and captured rows (possibly empty).
    pub schema: TableSchema,
    /// Dialect the text was parsed with.
    pub dialect: Dialect,
    /// Raw bytes read from the source.
    pub bytes_read: u64,
    /// Whether the source was read to its end.
    pub complete: bool,
    /// Everything that went wrong, in pipeline order.
    pub diagnostics: Vec<IngestionError>,
}

impl Discovery {
    /// `true` when no diagnostic was collected.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Diagnostics of one kind.
    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &IngestionError> {
        self.diagnostics.iter().filter(move |d| d.kind() == kind)
    }

    /// Highest severity among the diagnostics, if any.
    pub fn worst_severity(&self) -> Option<IngestionSeverity> {
        self.diagnostics.iter().map(severity_for_error).max()
    }
}

/// Fetch `url` with `client` and discover a table from the response body.
pub fn discover_from_url(client: &Client, url: &str, options: &IngestionOptions) -> Discovery {
    let (doc, diagnostics) = fetch_url(client, url, &options.fetch);
    finish(url, doc, diagnostics, options)
}

/// Read `source` (bounded by `options.fetch`) and discover a table from it.
///
/// `label` names the source in logs and observer context.
pub fn discover_from_reader<R: Read>(source: R, label: &str, options: &IngestionOptions) -> Discovery {
    let (doc, err) = read_bounded(source, &options.fetch);
    finish(label, doc, err.into_iter().collect(), options)
}

/// Discover a table from text already in memory. The text is used as is.
///
/// # Examples
///
/// ```rust
/// use url_table::ingestion::{discover_from_text, IngestionOptions};
/// use url_table::types::ColumnType;
///
/// let text = "id,name,joined\n1,Alice,2020-01-01\n2,Bob,2020-02-02\n";
/// let discovery = discover_from_text(text, &IngestionOptions::default());
///
/// let types: Vec<_> = discovery.schema.columns.iter().map(|c| c.column_type).collect();
/// assert_eq!(types, vec![ColumnType::Integer, ColumnType::String, ColumnType::Date]);
/// assert_eq!(discovery.schema.rows[1].get("name"), Some("Bob"));
/// ```
pub fn discover_from_text(text: &str, options: &IngestionOptions) -> Discovery {
    let doc = RawDocument {
        text: text.to_owned(),
        complete: true,
        bytes_read: text.len() as u64,
    };
    finish("<text>", doc, Vec::new(), options)
}

fn finish(
    source: &str,
    doc: RawDocument,
    mut diagnostics: Vec<IngestionError>,
    options: &IngestionOptions,
) -> Discovery {
    let ctx = IngestionContext {
        table: options.table_name.clone(),
        source: source.to_owned(),
    };

    let (dialect, schema) = build_schema(&doc.text, options, &mut diagnostics);
    let discovery = Discovery {
        schema,
        dialect,
        bytes_read: doc.bytes_read,
        complete: doc.complete,
        diagnostics,
    };

    if let Some(obs) = options.observer.as_ref() {
        report(obs.as_ref(), &ctx, &discovery, options.alert_at_or_above);
    }
    discovery
}

/// Detect, parse, validate, infer and materialize.
fn build_schema(
    text: &str,
    options: &IngestionOptions,
    diagnostics: &mut Vec<IngestionError>,
) -> (Dialect, TableSchema) {
    let dialect = choose_dialect(text, options, diagnostics);
    debug!(?dialect, "parsing");

    let (records, parse_err) = parse_records(text, &dialect);
    diagnostics.extend(parse_err);
    if records.is_empty() {
        return (dialect, TableSchema::empty());
    }

    let (header, data): (Vec<String>, &[Record]) = if options.has_header {
        let header = records[0].clone();
        if let Err(violation) = validate_header(&header) {
            diagnostics.push(violation.into());
            if options.strict_header {
                return (dialect, TableSchema::empty());
            }
        }
        (header, &records[1..])
    } else {
        let width = records.iter().map(Vec::len).max().unwrap_or(0);
        (generated_header(width), &records[..])
    };

    let (columns, inference_diags) = infer_columns(data, &header);
    diagnostics.extend(inference_diags);
    let (rows, shape_diags) = materialize_rows(data, &header);
    diagnostics.extend(shape_diags);

    debug!(columns = columns.len(), rows = rows.len(), "schema built");
    (dialect, TableSchema::new(columns, rows))
}

fn choose_dialect(
    text: &str,
    options: &IngestionOptions,
    diagnostics: &mut Vec<IngestionError>,
) -> Dialect {
    let comment = options.comment;
    if let Some(delimiter) = options.separator {
        let quote = quote_byte(options.quote).unwrap_or_else(|e| {
            diagnostics.push(e);
            Dialect::default().quote
        });
        return Dialect {
            delimiter,
            quote,
            comment,
        };
    }

    let detected = DelimiterDetector::new(options.sample_records)
        .with_comment(comment.map(char::from))
        .detect(text, options.quote);
    match Dialect::from_detection(&detected) {
        Ok(d) => Dialect { comment, ..d },
        Err(e) => {
            diagnostics.push(e);
            Dialect {
                comment,
                ..Dialect::default()
            }
        }
    }
}

fn report(
    obs: &dyn IngestionObserver,
    ctx: &IngestionContext,
    discovery: &Discovery,
    alert_at_or_above: IngestionSeverity,
) {
    for e in &discovery.diagnostics {
        let sev = severity_for_error(e);
        obs.on_diagnostic(ctx, sev, e);
        if sev >= alert_at_or_above {
            obs.on_alert(ctx, sev, e);
        }
    }
    obs.on_discovered(
        ctx,
        IngestionStats {
            bytes: discovery.bytes_read,
            columns: discovery.schema.columns.len(),
            rows: discovery.schema.row_count(),
            diagnostics: discovery.diagnostics.len(),
        },
    );
}

/// Severity of a diagnostic: transport failures are Critical, lost data is an Error,
/// reshaped or suspicious data is a Warning, and a defaulted column type is Info.
pub fn severity_for_error(e: &IngestionError) -> IngestionSeverity {
    match e {
        IngestionError::Http(_) | IngestionError::Status { .. } | IngestionError::Io(_) => {
            IngestionSeverity::Critical
        }
        IngestionError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
        IngestionError::Quoting { .. } | IngestionError::InvalidSeparator { .. } => {
            IngestionSeverity::Error
        }
        IngestionError::InvalidHeader(_) | IngestionError::RaggedRecord { .. } => {
            IngestionSeverity::Warning
        }
        IngestionError::AmbiguousColumn { .. } => IngestionSeverity::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;

    #[test]
    fn header_only_input_yields_string_columns_and_no_rows() {
        let d = discover_from_text("a,b\n", &IngestionOptions::default());
        assert_eq!(d.schema.columns.len(), 2);
        assert!(d.schema.columns.iter().all(|c| c.column_type == ColumnType::String));
        assert_eq!(d.schema.row_count(), 0);
        assert_eq!(d.diagnostics_of(DiagnosticKind::InferenceAmbiguity).count(), 2);
        assert_eq!(d.worst_severity(), Some(IngestionSeverity::Info));
    }

    #[test]
    fn empty_input_yields_empty_schema() {
        let d = discover_from_text("", &IngestionOptions::default());
        assert!(d.schema.columns.is_empty());
        assert!(d.is_clean());
    }

    #[test]
    fn separator_override_skips_detection() {
        let opts = IngestionOptions {
            separator: Some(b';'),
            ..Default::default()
        };
        // Detection would pick the comma.
        let d = discover_from_text("a,b;c\n1,2;3\n", &opts);
        assert_eq!(d.dialect.delimiter, b';');
        assert_eq!(d.schema.column_names().collect::<Vec<_>>(), vec!["a,b", "c"]);
    }

    #[test]
    fn non_ascii_quote_with_separator_override_is_reported() {
        let opts = IngestionOptions {
            separator: Some(b';'),
            quote: '«',
            ..Default::default()
        };
        let d = discover_from_text("a;b\n1;\"x;y\"\n", &opts);
        assert_eq!(d.dialect.quote, b'"');
        assert_eq!(d.schema.rows[0].get("b"), Some("x;y"));
        assert!(matches!(
            d.diagnostics[..],
            [IngestionError::InvalidSeparator { ref value, .. }] if value == "«"
        ));
    }

    #[test]
    fn invalid_header_is_reported_but_kept_by_default() {
        let d = discover_from_text("id,id\n1,2\n", &IngestionOptions::default());
        assert_eq!(d.schema.row_count(), 1);
        assert_eq!(d.schema.rows[0].get("id"), Some("2"));
        assert_eq!(d.diagnostics_of(DiagnosticKind::Validation).count(), 1);
    }

    #[test]
    fn strict_header_discards_data() {
        let opts = IngestionOptions {
            strict_header: true,
            ..Default::default()
        };
        let d = discover_from_text("id,\n1,2\n", &opts);
        assert!(d.schema.columns.is_empty());
        assert_eq!(d.schema.row_count(), 0);
        assert!(matches!(
            d.diagnostics[..],
            [IngestionError::InvalidHeader(crate::error::HeaderViolation::Empty { index: 1 })]
        ));
    }

    #[test]
    fn headerless_input_gets_generated_names() {
        let opts = IngestionOptions {
            has_header: false,
            ..Default::default()
        };
        let d = discover_from_text("1,x\n2,y,extra\n", &opts);
        assert_eq!(
            d.schema.column_names().collect::<Vec<_>>(),
            vec!["column_1", "column_2", "column_3"]
        );
        assert_eq!(d.schema.columns[0].column_type, ColumnType::Integer);
        assert_eq!(d.schema.row_count(), 2);
        assert_eq!(d.schema.rows[0].get("column_3"), None);
        assert_eq!(d.diagnostics_of(DiagnosticKind::Shape).count(), 1);
    }

    #[test]
    fn severities() {
        let ragged = IngestionError::RaggedRecord {
            record: 1,
            expected: 2,
            found: 1,
        };
        assert_eq!(severity_for_error(&ragged), IngestionSeverity::Warning);
        let io = IngestionError::Io(std::io::Error::other("reset"));
        assert_eq!(severity_for_error(&io), IngestionSeverity::Critical);
    }
}
