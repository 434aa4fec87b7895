//! Timestamp encoding for SQLite
//!
//! Timestamps are stored as RFC 3339 text with exactly three fractional digits
//! and a `Z` suffix, so string order equals time order.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

pub(crate) fn encode(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn decode(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|ts| ts.with_timezone(&Utc))
}

/// Read a timestamp column by name
pub(crate) fn column(row: &Row<'_>, name: &str) -> rusqlite::Result<DateTime<Utc>> {
    let idx = row.as_ref().column_index(name)?;
    let text: String = row.get(idx)?;
    decode(&text).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Current time truncated to the stored precision
pub(crate) fn now() -> DateTime<Utc> {
    let now = Utc::now();
    decode(&encode(&now)).unwrap_or(now)
}
