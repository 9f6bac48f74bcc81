use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Symbolic recurrence unit driving how far ahead the next candidate is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    Daily,
    Hourly,
    Minutely,
}

impl Frequency {
    pub const ALL: [Frequency; 6] = [
        Frequency::Yearly,
        Frequency::Monthly,
        Frequency::Weekly,
        Frequency::Daily,
        Frequency::Hourly,
        Frequency::Minutely,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Yearly => "yearly",
            Frequency::Monthly => "monthly",
            Frequency::Weekly => "weekly",
            Frequency::Daily => "daily",
            Frequency::Hourly => "hourly",
            Frequency::Minutely => "minutely",
        }
    }

    /// Sorted names of every recognized frequency.
    pub fn valid_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Self::ALL.iter().map(Frequency::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Length of one step starting from the given local calendar date.
    ///
    /// Sub-daily frequencies ignore the date. `Yearly` is 366 days when the
    /// year-long span starting at `date` crosses a 29 February. `Monthly` is the
    /// length of `date`'s month, clamped so the step never skips past the last
    /// day of the following month.
    pub fn is_sub_daily(&self) -> bool {
        matches!(self, Frequency::Hourly | Frequency::Minutely)
    }

    pub fn step_from(&self, date: NaiveDate) -> Duration {
        match self {
            Frequency::Yearly => Duration::days(year_step_days(date)),
            Frequency::Monthly => Duration::days(month_step_days(date)),
            Frequency::Weekly => Duration::weeks(1),
            Frequency::Daily => Duration::days(1),
            Frequency::Hourly => Duration::hours(1),
            Frequency::Minutely => Duration::minutes(1),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yearly" => Ok(Frequency::Yearly),
            "monthly" => Ok(Frequency::Monthly),
            "weekly" => Ok(Frequency::Weekly),
            "daily" => Ok(Frequency::Daily),
            "hourly" => Ok(Frequency::Hourly),
            "minutely" => Ok(Frequency::Minutely),
            _ => Err(CoreError::UnsupportedFrequency {
                value: s.to_string(),
                valid: Frequency::valid_names(),
            }),
        }
    }
}

/// Computes the naive next candidate after `base` for the given frequency.
///
/// Calendar facts are read from `base`'s local date in its own timezone; the
/// step itself is an absolute duration.
///
/// # Panics
/// If the result falls outside the range chrono can represent. Use
/// [`checked_add_delta`] near the end of time.
pub fn add_delta<Tz: TimeZone>(base: &DateTime<Tz>, frequency: Frequency) -> DateTime<Tz> {
    let step = frequency.step_from(base.date_naive());
    base.clone() + step
}

pub fn checked_add_delta<Tz: TimeZone>(
    base: &DateTime<Tz>,
    frequency: Frequency,
) -> Option<DateTime<Tz>> {
    let step = frequency.step_from(base.date_naive());
    base.clone().checked_add_signed(step)
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        _ => 28,
    }
}

fn year_step_days(date: NaiveDate) -> i64 {
    // The next 29 February on or after `date` decides the span length.
    let leap_day_year = if (date.month(), date.day()) <= (2, 28) {
        date.year()
    } else {
        date.year() + 1
    };
    if is_leap_year(leap_day_year) {
        366
    } else {
        365
    }
}

fn month_step_days(date: NaiveDate) -> i64 {
    let current = days_in_month(date.year(), date.month());
    let (next_year, next_month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    let following = days_in_month(next_year, next_month);
    i64::from(current - date.day() + date.day().min(following))
}
