use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Error type describing everything that can go wrong while discovering a table.
///
/// Discovery itself never fails: these values are collected as diagnostics in
/// [`crate::ingestion::Discovery`] while the pipeline continues with partial (or empty) data.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("http status {status} from {url}")]
    Status { url: String, status: u16 },

    /// Read failure on the response body (or any other source reader).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited text.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A record with an unterminated quoted field or a stray quote. Parsing stops before it.
    #[error("malformed quoting in record {record} (line {line}): {reason}")]
    Quoting {
        record: usize,
        line: usize,
        reason: &'static str,
    },

    /// A configured or detected separator could not be turned into a single-byte delimiter.
    #[error("invalid separator {value:?}: {message}")]
    InvalidSeparator { value: String, message: String },

    /// The header record has an empty or repeated field name.
    #[error("invalid header: {0}")]
    InvalidHeader(#[from] HeaderViolation),

    /// A column had no values to infer from and was typed as STRING.
    #[error("column '{column}' has no values; typed as STRING")]
    AmbiguousColumn { column: String },

    /// A data record does not have the same number of fields as the header.
    #[error("record {record} has {found} fields, header has {expected}")]
    RaggedRecord {
        record: usize,
        expected: usize,
        found: usize,
    },
}

/// Why a header record was rejected. Indexes are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderViolation {
    #[error("empty value at field {index}")]
    Empty { index: usize },
    #[error("duplicate value at field {index}")]
    Duplicate { index: usize },
}

/// Error type returned when loading or validating a [`crate::config::ConnectionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A field is present but its value is unusable.
    #[error("invalid config field '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

/// Coarse classification of an [`IngestionError`], following the pipeline stage it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Network or read failure while fetching.
    Fetch,
    /// Malformed delimited text (bad quoting) or an unusable separator.
    Parse,
    /// Header with empty or duplicate names.
    Validation,
    /// Records whose width differs from the header.
    Shape,
    /// A column typed as STRING for lack of values.
    InferenceAmbiguity,
}

impl IngestionError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::Http(_) | Self::Status { .. } | Self::Io(_) => DiagnosticKind::Fetch,
            Self::Csv(_) | Self::Quoting { .. } | Self::InvalidSeparator { .. } => {
                DiagnosticKind::Parse
            }
            Self::InvalidHeader(_) => DiagnosticKind::Validation,
            Self::RaggedRecord { .. } => DiagnosticKind::Shape,
            Self::AmbiguousColumn { .. } => DiagnosticKind::InferenceAmbiguity,
        }
    }
}
