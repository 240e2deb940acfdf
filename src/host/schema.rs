//! Mapping of inferred column types onto the host's vocabulary.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::types::{ColumnDescriptor, ColumnType, Row};

use super::value::{HostValue, convert};

/// Column types understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostColumnType {
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Double,
    /// UTC timestamp.
    Timestamp,
    /// UTF-8 string.
    String,
}

impl From<ColumnType> for HostColumnType {
    fn from(t: ColumnType) -> Self {
        match t {
            ColumnType::Integer => Self::Int,
            ColumnType::Numeric => Self::Double,
            ColumnType::Date => Self::Timestamp,
            ColumnType::String => Self::String,
        }
    }
}

impl fmt::Display for HostColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "INT",
            Self::Double => "DOUBLE",
            Self::Timestamp => "TIMESTAMP",
            Self::String => "STRING",
        })
    }
}

/// Binding the host uses to pull a column's value out of a [`Row`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueAccessor {
    /// Identifier-safe key, unique within a table.
    pub key: String,
    /// Source column name, as used in [`Row`].
    pub field: String,
}

impl ValueAccessor {
    pub fn get<'r>(&self, row: &'r Row) -> Option<&'r str> {
        row.get(&self.field)
    }
}

/// A host-facing column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: HostColumnType,
    pub accessor: ValueAccessor,
}

impl ColumnDefinition {
    /// This column's value in `row`, converted to the column type. Missing or unconvertible
    /// cells are [`HostValue::Null`].
    pub fn value(&self, row: &Row) -> HostValue {
        convert(self.accessor.get(row), self.column_type)
    }
}

/// Build host column definitions, in order, from inferred descriptors.
///
/// A name given twice yields one column at its first position with the later type, since a row
/// holds one cell per name.
pub fn build_columns(descriptors: &[ColumnDescriptor]) -> Vec<ColumnDefinition> {
    let mut position: HashMap<&str, usize> = HashMap::with_capacity(descriptors.len());
    let mut used = HashSet::with_capacity(descriptors.len());
    let mut columns: Vec<ColumnDefinition> = Vec::with_capacity(descriptors.len());

    for d in descriptors {
        if let Some(&idx) = position.get(d.name.as_str()) {
            columns[idx].column_type = d.column_type.into();
            continue;
        }
        let base = sanitize_identifier(&d.name);
        let mut key = base.clone();
        let mut n = 2;
        while !used.insert(key.clone()) {
            key = format!("{base}_{n}");
            n += 1;
        }
        position.insert(d.name.as_str(), columns.len());
        columns.push(ColumnDefinition {
            name: d.name.clone(),
            column_type: d.column_type.into(),
            accessor: ValueAccessor {
                key,
                field: d.name.clone(),
            },
        });
    }
    columns
}

/// Identifier form of a column name: ASCII alphanumerics and `_` are kept, anything else
/// becomes `_`; a leading digit or an empty name gets a `_` prefix.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}
