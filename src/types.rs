//! Core data model types for discovery.
//!
//! A fetch produces a [`RawDocument`], parsing turns it into [`Record`]s, and discovery captures
//! the result as a [`TableSchema`]: ordered [`ColumnDescriptor`]s plus immutable [`Row`]s.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// One parsed record: ordered string fields, read literally.
pub type Record = Vec<String>;

/// Text accumulated by the fetcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocument {
    /// Normalized text (LF line endings, valid UTF-8 only).
    pub text: String,
    /// `true` when the source was read to its end. When `false`, `text` has been cut back to
    /// the last complete line.
    pub complete: bool,
    /// Raw bytes pulled from the source before decoding.
    pub bytes_read: u64,
}

impl RawDocument {
    /// An empty document standing in for a source that could not be read at all.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            complete: true,
            bytes_read: 0,
        }
    }
}

/// Inferred logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    /// Every value contains a `YYYY-MM-DD` or `MM/DD/YYYY` substring.
    Date,
    /// Every value is an integer literal.
    Integer,
    /// Every value is a floating-point literal.
    Numeric,
    /// Anything else, and columns without values.
    String,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::Integer => "INTEGER",
            Self::Numeric => "NUMERIC",
            Self::String => "STRING",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named column with its inferred type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Column name, taken from the header record.
    pub name: String,
    /// Inferred type.
    pub column_type: ColumnType,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A materialized row: column name to raw cell text.
///
/// Cells stay strings; conversion to host types happens in [`crate::host`]. A column missing
/// from the map reads as NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row {
    values: BTreeMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value for `column`, replacing any earlier value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.values.insert(column.into(), value.into());
    }

    /// Raw value for `column`, if the record had a cell for it.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(column, value)` pairs in column-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Columns plus the rows captured at discovery time.
///
/// Rows are shared behind an [`Arc`] so a table can hand them to concurrent queries without
/// copying.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSchema {
    /// Ordered columns, in header order.
    pub columns: Vec<ColumnDescriptor>,
    /// Rows in parse order.
    pub rows: Arc<[Row]>,
}

impl TableSchema {
    /// Create a schema from columns and rows.
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }

    /// A schema with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}
