//! Conversion of raw cell text into host values.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::ingestion::infer::{find_dates, parse_float_literal, parse_integer_literal};

use super::schema::HostColumnType;

/// A typed cell as handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HostValue {
    Null,
    Int(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    String(String),
}

/// Convert a raw cell for a column of type `ty`.
pub fn convert(raw: Option<&str>, ty: HostColumnType) -> HostValue {
    let Some(raw) = raw else {
        return HostValue::Null;
    };
    let converted = match ty {
        HostColumnType::Int => parse_integer_literal(raw).map(HostValue::Int),
        HostColumnType::Double => parse_float_literal(raw).map(HostValue::Double),
        HostColumnType::Timestamp => parse_timestamp(raw).map(HostValue::Timestamp),
        HostColumnType::String => Some(HostValue::String(raw.to_owned())),
    };
    converted.unwrap_or(HostValue::Null)
}

/// RFC 3339 values keep their time of day; otherwise the first `YYYY-MM-DD` or `MM/DD/YYYY`
/// substring that is a calendar date is taken at midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Some(ts.with_timezone(&Utc));
    }
    find_dates(raw).find_map(|date| {
        let format = if date.contains('-') { "%Y-%m-%d" } else { "%m/%d/%Y" };
        NaiveDate::parse_from_str(date, format)
            .ok()?
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
    })
}
