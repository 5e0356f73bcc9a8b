//! RFC3339 timestamp checks shared by the health, logging and routing
//! contracts.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use thiserror::Error;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Why a timestamp was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("must use RFC3339 date-time format")]
    MissingSeparator,
    #[error("is not a valid RFC3339 date-time")]
    Unparseable,
    #[error("must include timezone (Z or +/-HH:MM)")]
    MissingTimezone,
}

/// Parse `value` as an RFC3339 date-time with an explicit offset.
pub fn parse_rfc3339(value: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
    if !value.contains('T') {
        return Err(TimestampError::MissingSeparator);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed);
    }
    // minute precision with an offset is still explicit enough
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M%:z") {
        return Ok(parsed);
    }
    let naive = NAIVE_FORMATS
        .iter()
        .any(|format| NaiveDateTime::parse_from_str(value, format).is_ok());
    if naive {
        Err(TimestampError::MissingTimezone)
    } else {
        Err(TimestampError::Unparseable)
    }
}

/// Message for `field` when `value` is not an acceptable timestamp
pub fn check_field(field: &str, value: &str) -> Option<String> {
    parse_rfc3339(value)
        .err()
        .map(|err| format!("{} {}", field, err))
}
