//! Per-column type inference.
//!
//! Every value is classified into a [`TypeCandidates`] bitmask (could it be a date, an integer,
//! a number?). A column's mask is the intersection over its values, so one pass decides the
//! type and scanning stops as soon as nothing is left. The surviving candidates resolve in
//! priority order: DATE, INTEGER, NUMERIC, otherwise STRING.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::IngestionError;
use crate::types::{ColumnDescriptor, ColumnType, Record};

/// `YYYY-MM-DD` or `MM/DD/YYYY` anywhere in the value. ASCII digits only.
static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}|[0-9]{2}/[0-9]{2}/[0-9]{4}")
        .expect("date pattern is valid")
});

/// Set of types a value (or a whole column) is still compatible with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCandidates(u8);

impl TypeCandidates {
    pub const NONE: Self = Self(0);
    pub const DATE: Self = Self(0b001);
    pub const INTEGER: Self = Self(0b010);
    pub const NUMERIC: Self = Self(0b100);
    pub const ALL: Self = Self(0b111);

    /// Classify `value`, testing only the candidates still present in `within`.
    pub fn classify(value: &str, within: Self) -> Self {
        let mut out = Self::NONE;
        if within.contains(Self::DATE) && is_date_like(value) {
            out = out.union(Self::DATE);
        }
        if within.contains(Self::INTEGER) && parse_integer_literal(value).is_some() {
            out = out.union(Self::INTEGER);
        }
        if within.contains(Self::NUMERIC) && parse_float_literal(value).is_some() {
            out = out.union(Self::NUMERIC);
        }
        out
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Highest-priority type still possible.
    pub fn resolve(self) -> ColumnType {
        if self.contains(Self::DATE) {
            ColumnType::Date
        } else if self.contains(Self::INTEGER) {
            ColumnType::Integer
        } else if self.contains(Self::NUMERIC) {
            ColumnType::Numeric
        } else {
            ColumnType::String
        }
    }
}

/// Result of scanning one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnScan {
    /// Candidates shared by every value scanned.
    pub candidates: TypeCandidates,
    /// Number of values looked at before the scan finished or stopped early.
    pub values_seen: usize,
}

impl ColumnScan {
    /// The inferred type. A column without values is STRING.
    pub fn column_type(&self) -> ColumnType {
        if self.values_seen == 0 {
            ColumnType::String
        } else {
            self.candidates.resolve()
        }
    }
}

/// Scan column `column` of the data records (header excluded).
///
/// Records too short to have the column are skipped: a missing cell is neither evidence for
/// nor against a type.
pub fn scan_column(records: &[Record], column: usize) -> ColumnScan {
    let mut candidates = TypeCandidates::ALL;
    let mut values_seen = 0;
    for value in records.iter().filter_map(|r| r.get(column)) {
        values_seen += 1;
        candidates = candidates.intersect(TypeCandidates::classify(value, candidates));
        if candidates.is_empty() {
            break;
        }
    }
    ColumnScan {
        candidates,
        values_seen,
    }
}

/// Infer the type of column `column` of the data records.
pub fn infer_column_type(records: &[Record], column: usize) -> ColumnType {
    scan_column(records, column).column_type()
}

/// Infer a descriptor for every header column.
///
/// Columns without any value are typed STRING and reported as ambiguous. A repeated header name
/// gives one descriptor, at its first position, typed from its last column: materialized rows
/// keep the later cell.
pub fn infer_columns(
    records: &[Record],
    header: &[String],
) -> (Vec<ColumnDescriptor>, Vec<IngestionError>) {
    let mut diagnostics = Vec::new();
    let mut seen = HashSet::with_capacity(header.len());
    let columns = header
        .iter()
        .enumerate()
        .filter(|(_, name)| seen.insert(name.as_str()))
        .map(|(first, name)| {
            let idx = header.iter().rposition(|h| h == name).unwrap_or(first);
            let scan = scan_column(records, idx);
            if scan.values_seen == 0 {
                diagnostics.push(IngestionError::AmbiguousColumn {
                    column: name.clone(),
                });
            }
            let column_type = scan.column_type();
            debug!(column = %name, %column_type, values = scan.values_seen, "inferred column");
            ColumnDescriptor::new(name.clone(), column_type)
        })
        .collect();
    (columns, diagnostics)
}

/// `true` when `value` contains a date-like substring.
pub fn is_date_like(value: &str) -> bool {
    DATE_PATTERN.is_match(value)
}

/// Date-like substrings of `value`, left to right.
pub fn find_dates(value: &str) -> impl Iterator<Item = &str> {
    DATE_PATTERN.find_iter(value).map(|m| m.as_str())
}

/// Parse an integer literal.
///
/// Accepts an optional sign followed by decimal digits, a `0x`/`0o`/`0b` prefixed number, or a
/// legacy octal number with a leading `0`. Single underscores may separate digits (or follow a
/// base prefix). The value must fit in `i64`.
pub fn parse_integer_literal(value: &str) -> Option<i64> {
    let (negative, unsigned) = match value.as_bytes().first()? {
        b'+' => (false, &value[1..]),
        b'-' => (true, &value[1..]),
        _ => (false, value),
    };

    let (radix, digits, prefixed) = match unsigned.as_bytes() {
        [] => return None,
        [b'0', p, _, ..] if matches!(p.to_ascii_lowercase(), b'x' | b'o' | b'b') => {
            let radix = match p.to_ascii_lowercase() {
                b'x' => 16,
                b'o' => 8,
                _ => 2,
            };
            (radix, &unsigned[2..], true)
        }
        [b'0', ..] => (8, &unsigned[1..], true),
        _ => (10, unsigned, false),
    };

    let digits = strip_separators(digits, prefixed, |c| c.is_digit(radix))?;
    let magnitude = if digits.is_empty() {
        // Only reachable for a bare "0".
        0
    } else {
        i128::from_str_radix(&digits, radix).ok()?
    };
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

/// Parse a floating-point literal.
///
/// Uses `f64` syntax (so `inf`, `infinity` and `nan` are accepted) with single underscores
/// allowed between digits. Finite literals that overflow to infinity are rejected.
pub fn parse_float_literal(value: &str) -> Option<f64> {
    let cleaned: Cow<'_, str> = if value.contains('_') {
        Cow::Owned(strip_float_separators(value)?)
    } else {
        Cow::Borrowed(value)
    };
    let parsed: f64 = cleaned.parse().ok()?;
    if parsed.is_infinite() {
        let word = cleaned.trim_start_matches(['+', '-']).to_ascii_lowercase();
        if word != "inf" && word != "infinity" {
            return None;
        }
    }
    Some(parsed)
}

/// Remove digit-separating underscores from `digits`, checking every other character with
/// `is_digit`. `lead_ok` allows an underscore in first position (after a base prefix).
fn strip_separators(
    digits: &str,
    lead_ok: bool,
    is_digit: impl Fn(char) -> bool,
) -> Option<Cow<'_, str>> {
    if !digits.contains('_') {
        return digits.chars().all(&is_digit).then_some(Cow::Borrowed(digits));
    }
    let mut out = String::with_capacity(digits.len());
    let mut after_digit = lead_ok;
    for c in digits.chars() {
        if c == '_' {
            if !after_digit {
                return None;
            }
            after_digit = false;
        } else if is_digit(c) {
            out.push(c);
            after_digit = true;
        } else {
            return None;
        }
    }
    after_digit.then_some(Cow::Owned(out))
}

/// Underscores in a float are only allowed between two ASCII digits.
fn strip_float_separators(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.char_indices() {
        if c == '_' {
            let before = i.checked_sub(1).and_then(|j| bytes.get(j));
            let after = bytes.get(i + 1);
            if !(before.is_some_and(u8::is_ascii_digit) && after.is_some_and(u8::is_ascii_digit)) {
                return None;
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}
