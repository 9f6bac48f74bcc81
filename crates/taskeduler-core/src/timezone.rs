use crate::error::CoreError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Parse an IANA timezone name
pub fn parse_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone.trim())
        .map_err(|_| CoreError::InvalidTimezone(format!("'{}' is not an IANA timezone name", timezone)))
}

/// Validate IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<(), CoreError> {
    parse_timezone(timezone).map(|_| ())
}

/// Format datetime in the given timezone, e.g. "2025-03-12 09:00 CET"
pub fn format_in_timezone(datetime: DateTime<Utc>, timezone: &Tz) -> String {
    datetime
        .with_timezone(timezone)
        .format("%Y-%m-%d %H:%M %Z")
        .to_string()
}
