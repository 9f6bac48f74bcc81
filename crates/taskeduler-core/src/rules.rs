use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::CoreError;

/// Window scanned when checking that a rule set can ever be satisfied.
/// Every weekday/month/day-of-month combination, 29 February included,
/// occurs within 28 consecutive years starting at a leap year.
const SATISFIABILITY_WINDOW_YEARS: i32 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Weekdays,
    Months,
    MonthDays,
    ExcludedDates,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::Weekdays => "weekdays",
            RuleKind::Months => "months",
            RuleKind::MonthDays => "month_days",
            RuleKind::ExcludedDates => "excluded_dates",
        };
        f.write_str(name)
    }
}

/// A single constraint on the calendar date of a candidate execution.
///
/// An empty parameter set places no restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionRule {
    /// Allowed weekdays, 0 = Monday through 6 = Sunday.
    Weekdays(BTreeSet<u32>),
    /// Allowed months, 1 through 12.
    Months(BTreeSet<u32>),
    /// Allowed days of the month, 1 through 31.
    MonthDays(BTreeSet<u32>),
    /// Dates on which nothing may run.
    ExcludedDates(BTreeSet<NaiveDate>),
}

impl ExecutionRule {
    pub fn weekdays<I: IntoIterator<Item = i64>>(values: I) -> Result<Self, CoreError> {
        Ok(ExecutionRule::Weekdays(checked_set(RuleKind::Weekdays, values, 0, 6)?))
    }

    pub fn months<I: IntoIterator<Item = i64>>(values: I) -> Result<Self, CoreError> {
        Ok(ExecutionRule::Months(checked_set(RuleKind::Months, values, 1, 12)?))
    }

    pub fn month_days<I: IntoIterator<Item = i64>>(values: I) -> Result<Self, CoreError> {
        Ok(ExecutionRule::MonthDays(checked_set(RuleKind::MonthDays, values, 1, 31)?))
    }

    pub fn excluded_dates<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        ExecutionRule::ExcludedDates(dates.into_iter().collect())
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            ExecutionRule::Weekdays(_) => RuleKind::Weekdays,
            ExecutionRule::Months(_) => RuleKind::Months,
            ExecutionRule::MonthDays(_) => RuleKind::MonthDays,
            ExecutionRule::ExcludedDates(_) => RuleKind::ExcludedDates,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        match self {
            ExecutionRule::Weekdays(set)
            | ExecutionRule::Months(set)
            | ExecutionRule::MonthDays(set) => set.is_empty(),
            ExecutionRule::ExcludedDates(dates) => dates.is_empty(),
        }
    }

    pub fn accepts(&self, date: NaiveDate) -> bool {
        match self {
            ExecutionRule::Weekdays(days) => {
                days.is_empty() || days.contains(&date.weekday().num_days_from_monday())
            }
            ExecutionRule::Months(months) => months.is_empty() || months.contains(&date.month()),
            ExecutionRule::MonthDays(days) => days.is_empty() || days.contains(&date.day()),
            ExecutionRule::ExcludedDates(dates) => !dates.contains(&date),
        }
    }
}

impl fmt::Display for ExecutionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = match self {
            ExecutionRule::Weekdays(days) => days
                .iter()
                .filter_map(|d| Weekday::try_from(*d as u8).ok())
                .map(|d| d.to_string())
                .collect(),
            ExecutionRule::Months(set) | ExecutionRule::MonthDays(set) => {
                set.iter().map(|v| v.to_string()).collect()
            }
            ExecutionRule::ExcludedDates(dates) => dates.iter().map(|d| d.to_string()).collect(),
        };
        let prefix = if self.kind() == RuleKind::ExcludedDates { "not " } else { "" };
        write!(f, "{}={}{}", self.kind(), prefix, values.join(","))
    }
}

fn checked_set<I: IntoIterator<Item = i64>>(
    kind: RuleKind,
    values: I,
    min: i64,
    max: i64,
) -> Result<BTreeSet<u32>, CoreError> {
    values
        .into_iter()
        .map(|value| {
            if (min..=max).contains(&value) {
                Ok(value as u32)
            } else {
                Err(CoreError::InvalidRule(format!(
                    "{} value {} is outside {}..={}",
                    kind, value, min, max
                )))
            }
        })
        .collect()
}

/// Plain key/value form of a rule set, as supplied by a task definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    pub weekdays: Option<Vec<i64>>,
    pub months: Option<Vec<i64>>,
    pub month_days: Option<Vec<i64>>,
    pub excluded_dates: Option<Vec<NaiveDate>>,
}

/// Conjunction of execution rules evaluated against a candidate's local date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRuleSet {
    rules: Vec<ExecutionRule>,
}

impl ExecutionRuleSet {
    /// A rule set that accepts every datetime.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Builds a rule set, failing if no calendar date could ever satisfy it.
    pub fn new(rules: Vec<ExecutionRule>) -> Result<Self, CoreError> {
        let set = Self { rules };
        set.ensure_satisfiable()?;
        Ok(set)
    }

    pub fn from_config(config: &RuleConfig) -> Result<Self, CoreError> {
        let mut rules = Vec::new();
        if let Some(weekdays) = &config.weekdays {
            rules.push(ExecutionRule::weekdays(weekdays.iter().copied())?);
        }
        if let Some(months) = &config.months {
            rules.push(ExecutionRule::months(months.iter().copied())?);
        }
        if let Some(days) = &config.month_days {
            rules.push(ExecutionRule::month_days(days.iter().copied())?);
        }
        if let Some(dates) = &config.excluded_dates {
            rules.push(ExecutionRule::excluded_dates(dates.iter().copied()));
        }
        Self::new(rules)
    }

    pub fn rules(&self) -> &[ExecutionRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.iter().all(ExecutionRule::is_unrestricted)
    }

    /// Returns whether every rule accepts the candidate's local date.
    pub fn check<Tz: TimeZone>(&self, candidate: &DateTime<Tz>) -> bool {
        self.accepts_date(candidate.date_naive())
    }

    /// Returns `start` when it is compliant. Searching further is the
    /// scheduler's job, since it depends on the frequency.
    pub fn next_compliant_date<Tz: TimeZone>(&self, start: DateTime<Tz>) -> Option<DateTime<Tz>> {
        if self.check(&start) {
            Some(start)
        } else {
            None
        }
    }

    fn accepts_date(&self, date: NaiveDate) -> bool {
        self.rules.iter().all(|rule| rule.accepts(date))
    }

    fn ensure_satisfiable(&self) -> Result<(), CoreError> {
        if self.is_empty() {
            return Ok(());
        }
        // Exclusions are finite, so they never make an infinite calendar empty.
        let inclusive: Vec<&ExecutionRule> = self
            .rules
            .iter()
            .filter(|rule| rule.kind() != RuleKind::ExcludedDates)
            .collect();

        let Some(mut date) = NaiveDate::from_ymd_opt(2000, 1, 1) else {
            return Ok(());
        };
        let end = date + Duration::days(i64::from(SATISFIABILITY_WINDOW_YEARS) * 366);
        while date < end {
            if inclusive.iter().all(|rule| rule.accepts(date)) {
                return Ok(());
            }
            date += Duration::days(1);
        }
        Err(CoreError::InvalidRule(format!(
            "no calendar date satisfies [{}]",
            self
        )))
    }
}

impl fmt::Display for ExecutionRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active: Vec<String> = self
            .rules
            .iter()
            .filter(|rule| !rule.is_unrestricted())
            .map(|rule| rule.to_string())
            .collect();
        if active.is_empty() {
            f.write_str("any day")
        } else {
            f.write_str(&active.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at_noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    mod execution_rule_tests {
        use super::*;

        #[test]
        fn test_weekdays_accepts_listed_days() {
            // 2025-03-10 is a Monday.
            let rule = ExecutionRule::weekdays([0, 4]).unwrap();
            assert!(rule.accepts(date(2025, 3, 10)));
            assert!(!rule.accepts(date(2025, 3, 11)));
            assert!(rule.accepts(date(2025, 3, 14)));
        }

        #[rstest]
        #[case(-1)]
        #[case(7)]
        fn test_weekdays_out_of_range(#[case] value: i64) {
            let result = ExecutionRule::weekdays([1, value]);
            assert!(matches!(result, Err(CoreError::InvalidRule(ref msg)) if msg.contains("weekdays")));
        }

        #[rstest]
        #[case(ExecutionRule::months([0]))]
        #[case(ExecutionRule::months([13]))]
        #[case(ExecutionRule::month_days([0]))]
        #[case(ExecutionRule::month_days([32]))]
        fn test_out_of_range_parameters(#[case] result: Result<ExecutionRule, CoreError>) {
            assert!(matches!(result, Err(CoreError::InvalidRule(_))));
        }

        #[test]
        fn test_empty_parameters_accept_everything() {
            let rules = [
                ExecutionRule::weekdays(Vec::new()).unwrap(),
                ExecutionRule::months(Vec::new()).unwrap(),
                ExecutionRule::month_days(Vec::new()).unwrap(),
                ExecutionRule::excluded_dates(Vec::new()),
            ];
            for rule in &rules {
                assert!(rule.is_unrestricted());
                assert!(rule.accepts(date(2025, 7, 4)));
            }
        }

        #[test]
        fn test_excluded_dates() {
            let rule = ExecutionRule::excluded_dates([date(2025, 12, 25)]);
            assert!(!rule.accepts(date(2025, 12, 25)));
            assert!(rule.accepts(date(2025, 12, 26)));
        }

        #[test]
        fn test_display() {
            assert_eq!(ExecutionRule::weekdays([4, 0]).unwrap().to_string(), "weekdays=Mon,Fri");
            assert_eq!(ExecutionRule::months([12]).unwrap().to_string(), "months=12");
            assert_eq!(
                ExecutionRule::excluded_dates([date(2025, 1, 1)]).to_string(),
                "excluded_dates=not 2025-01-01"
            );
        }
    }

    mod rule_set_tests {
        use super::*;

        #[test]
        fn test_all_rules_must_accept() {
            let set = ExecutionRuleSet::new(vec![
                ExecutionRule::weekdays([0]).unwrap(),
                ExecutionRule::months([3]).unwrap(),
            ])
            .unwrap();
            assert!(set.check(&at_noon(2025, 3, 10)));
            // Monday, but April.
            assert!(!set.check(&at_noon(2025, 4, 7)));
            // March, but Tuesday.
            assert!(!set.check(&at_noon(2025, 3, 11)));
        }

        #[test]
        fn test_next_compliant_date_returns_start_only_when_compliant() {
            let set = ExecutionRuleSet::new(vec![ExecutionRule::weekdays([0]).unwrap()]).unwrap();
            let monday = at_noon(2025, 3, 10);
            let tuesday = at_noon(2025, 3, 11);
            assert_eq!(set.next_compliant_date(monday), Some(monday));
            assert_eq!(set.next_compliant_date(tuesday), None);
        }

        #[test]
        fn test_unsatisfiable_combination_rejected() {
            let result = ExecutionRuleSet::new(vec![
                ExecutionRule::months([2]).unwrap(),
                ExecutionRule::month_days([30, 31]).unwrap(),
            ]);
            assert!(matches!(result, Err(CoreError::InvalidRule(ref msg)) if msg.contains("no calendar date")));
        }

        #[test]
        fn test_leap_day_combination_accepted() {
            let set = ExecutionRuleSet::new(vec![
                ExecutionRule::months([2]).unwrap(),
                ExecutionRule::month_days([29]).unwrap(),
                ExecutionRule::weekdays([6]).unwrap(),
            ]);
            assert!(set.is_ok());
        }

        #[test]
        fn test_check_uses_local_date() {
            let set = ExecutionRuleSet::new(vec![ExecutionRule::weekdays([0]).unwrap()]).unwrap();
            // Tuesday 02:00 UTC is still Monday evening in New York.
            let instant = Utc.with_ymd_and_hms(2025, 3, 11, 2, 0, 0).unwrap();
            let tz: chrono_tz::Tz = "America/New_York".parse().unwrap();
            assert!(!set.check(&instant));
            assert!(set.check(&instant.with_timezone(&tz)));
        }

        #[test]
        fn test_from_config() {
            let config = RuleConfig {
                weekdays: Some(vec![0, 2, 4]),
                months: None,
                month_days: None,
                excluded_dates: Some(vec![date(2025, 3, 10)]),
            };
            let set = ExecutionRuleSet::from_config(&config).unwrap();
            assert_eq!(set.rules().len(), 2);
            assert!(!set.check(&at_noon(2025, 3, 10)));
            assert!(set.check(&at_noon(2025, 3, 12)));
            assert_eq!(set.to_string(), "weekdays=Mon,Wed,Fri; excluded_dates=not 2025-03-10");
        }

        #[test]
        fn test_from_config_reports_invalid_weekday() {
            let config = RuleConfig {
                weekdays: Some(vec![9]),
                ..Default::default()
            };
            let err = ExecutionRuleSet::from_config(&config).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Invalid execution rule: weekdays value 9 is outside 0..=6"
            );
        }

        #[test]
        fn test_empty_config_is_unrestricted() {
            let set = ExecutionRuleSet::from_config(&RuleConfig::default()).unwrap();
            assert!(set.is_empty());
            assert_eq!(set.to_string(), "any day");
        }

        #[test]
        fn test_rule_config_deserializes() {
            let config: RuleConfig = serde_json::from_str(
                r#"{"weekdays": [0, 1], "excluded_dates": ["2025-12-25"]}"#,
            )
            .unwrap();
            assert_eq!(config.weekdays, Some(vec![0, 1]));
            assert_eq!(config.excluded_dates, Some(vec![date(2025, 12, 25)]));
            assert!(config.months.is_none());
        }
    }

    proptest! {
        #[test]
        fn prop_empty_rule_set_accepts_everything(secs in 0i64..7_258_118_400i64) {
            let candidate = DateTime::from_timestamp(secs, 0).unwrap();
            prop_assert!(ExecutionRuleSet::unrestricted().check(&candidate));
        }
    }
}
