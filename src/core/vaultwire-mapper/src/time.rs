//! RFC3339 timestamps with nanosecond precision.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::MapperError;

/// Formats a timestamp as RFC3339 with nine fractional digits.
pub fn format(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parses an RFC3339 timestamp (any fractional precision, any offset) into UTC.
pub fn parse(input: &str) -> Result<DateTime<Utc>, MapperError> {
    DateTime::parse_from_rfc3339(input)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| MapperError::Format {
            value: format!("{:?}", input),
            reason: e.to_string(),
        })
}

/// Parses a wire value that must be a timestamp string.
pub fn parse_value(value: &Value) -> Result<DateTime<Utc>, MapperError> {
    match value {
        Value::String(s) => parse(s),
        other => Err(MapperError::Format {
            value: other.to_string(),
            reason: "expected an RFC3339 string".into(),
        }),
    }
}
