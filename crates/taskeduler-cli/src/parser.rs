use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_english::{parse_date_string, Dialect};
use chrono_tz::Tz;

/// Parses a natural-language moment ("tomorrow", "next friday", "2025-03-01")
/// relative to `now`, read as local time in `timezone`.
pub fn parse_moment(input: &str, now: DateTime<Utc>, timezone: &Tz) -> Result<DateTime<Utc>> {
    parse_date_string(input, now.with_timezone(timezone), Dialect::Uk)
        .map(|local| local.with_timezone(&Utc))
        .map_err(|e| anyhow::anyhow!("Failed to parse date '{}': {}", input, e))
}
