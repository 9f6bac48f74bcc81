use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::CoreError;
use crate::frequency::{checked_add_delta, Frequency};
use crate::rules::ExecutionRuleSet;

/// Upper bound on frequency steps taken while looking for a compliant candidate.
const MAX_ADVANCE_STEPS: usize = 1_000_000;

/// Upper bound on days searched when seeding the first execution.
const MAX_SEED_DAYS: i64 = 366 * 28;

/// Longest single timer armed while waiting for a deadline.
const MAX_SLEEP_CHUNK: Duration = Duration::from_secs(24 * 60 * 60);

/// Why [`Scheduler::sleep_until_execution`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// The deadline was reached and the following one is already computed.
    Due,
    /// The cancellation token fired first. Scheduler state is unchanged.
    Cancelled,
}

/// Produces successive rule-compliant execution times for one task.
///
/// Responsibilities:
/// 1. Seed the first deadline from the clock
/// 2. Step the deadline forward by the frequency until the rule set accepts it
/// 3. Wait for the deadline without blocking cancellation
#[derive(Debug, Clone)]
pub struct Scheduler {
    frequency: Frequency,
    rule_set: ExecutionRuleSet,
    /// Rules and calendar arithmetic are evaluated in this zone
    timezone: Tz,
    clock: Arc<dyn Clock>,
    next_execution: DateTime<Utc>,
}

impl Scheduler {
    /// Creates a scheduler whose first deadline is the first compliant instant
    /// at or after `clock.now()`, stepped once more if that instant is `now`
    /// itself so the first deadline is always in the future.
    ///
    /// # Behavior
    /// - Daily with no rules at T0 seeds T0 + 1 day
    /// - Weekly restricted to Mondays at a Wednesday T0 seeds the following
    ///   Monday at the same time of day
    /// - Hourly or minutely with a rule that rejects today seeds local
    ///   midnight of the next compliant day
    pub fn new(
        frequency: Frequency,
        rule_set: ExecutionRuleSet,
        timezone: Tz,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CoreError> {
        let now = clock.now();
        let mut scheduler = Self {
            frequency,
            rule_set,
            timezone,
            clock,
            next_execution: now,
        };
        scheduler.reseed()?;
        Ok(scheduler)
    }

    /// Recomputes the first deadline from the current clock reading,
    /// discarding the old one.
    pub fn reseed(&mut self) -> Result<DateTime<Utc>, CoreError> {
        let now = self.clock.now();
        let seed = first_compliant_at_or_after(&self.rule_set, self.frequency, &self.timezone, now)?;
        self.next_execution = seed;
        if seed == now {
            self.calculate_next_execution()?;
        }

        debug!(
            frequency = %self.frequency,
            rules = %self.rule_set,
            timezone = %self.timezone,
            next_execution = %self.next_execution,
            "scheduler seeded"
        );
        Ok(self.next_execution)
    }

    /// Shorthand for a UTC scheduler on the system clock.
    pub fn with_system_clock(
        frequency: Frequency,
        rule_set: ExecutionRuleSet,
    ) -> Result<Self, CoreError> {
        Self::new(frequency, rule_set, Tz::UTC, Arc::new(SystemClock))
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn rule_set(&self) -> &ExecutionRuleSet {
        &self.rule_set
    }

    pub fn timezone(&self) -> &Tz {
        &self.timezone
    }

    pub fn next_execution(&self) -> DateTime<Utc> {
        self.next_execution
    }

    /// Advances `next_execution` to the next compliant candidate and returns it.
    ///
    /// The result is strictly later than the previous value.
    pub fn calculate_next_execution(&mut self) -> Result<DateTime<Utc>, CoreError> {
        let start = self.next_execution.with_timezone(&self.timezone);
        let mut candidate = start.clone();

        for _ in 0..MAX_ADVANCE_STEPS {
            candidate = match checked_add_delta(&candidate, self.frequency) {
                Some(next) => next,
                None => break,
            };
            if self.rule_set.check(&candidate) {
                self.next_execution = candidate.with_timezone(&Utc);
                trace!(next_execution = %self.next_execution, "next execution calculated");
                return Ok(self.next_execution);
            }
        }

        Err(CoreError::NoCompliantExecution(format!(
            "{} steps from {} never satisfy [{}]",
            self.frequency, start, self.rule_set
        )))
    }

    /// The upcoming `count` executions, starting with the current deadline,
    /// without touching this scheduler's state.
    pub fn preview(&self, count: usize) -> Result<Vec<DateTime<Utc>>, CoreError> {
        let mut cursor = self.clone();
        let mut executions = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 {
                cursor.calculate_next_execution()?;
            }
            executions.push(cursor.next_execution);
        }
        Ok(executions)
    }

    /// Time left until the current deadline, zero if it has passed.
    pub fn time_until_next(&self) -> Duration {
        (self.next_execution - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Waits until the current deadline, then computes the following one.
    ///
    /// The wait is computed once from the clock and is interrupted as soon as
    /// `cancel` fires. Backwards clock adjustments during the wait are not
    /// corrected. Deadlines that passed while the caller was busy are
    /// skipped: the next deadline is always after `clock.now()`, so a backlog
    /// fires once.
    pub async fn sleep_until_execution(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Wakeup, CoreError> {
        let mut remaining = self.time_until_next();
        trace!(deadline = %self.next_execution, wait_secs = remaining.as_secs(), "sleeping");

        loop {
            let chunk = remaining.min(MAX_SLEEP_CHUNK);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(Wakeup::Cancelled),
                _ = tokio::time::sleep(chunk) => {}
            }
            remaining -= chunk;
            if remaining.is_zero() {
                break;
            }
        }

        self.calculate_next_execution()?;
        self.skip_missed()?;
        Ok(Wakeup::Due)
    }

    /// Steps past every deadline at or before `clock.now()`.
    fn skip_missed(&mut self) -> Result<(), CoreError> {
        let now = self.clock.now();
        let mut skipped = 0u64;
        while self.next_execution <= now {
            self.calculate_next_execution()?;
            skipped += 1;
        }
        if skipped > 0 {
            warn!(
                frequency = %self.frequency,
                skipped,
                next_execution = %self.next_execution,
                "skipped missed executions"
            );
        }
        Ok(())
    }
}

fn first_compliant_at_or_after(
    rule_set: &ExecutionRuleSet,
    frequency: Frequency,
    timezone: &Tz,
    start: DateTime<Utc>,
) -> Result<DateTime<Utc>, CoreError> {
    let local = start.with_timezone(timezone);
    if let Some(found) = rule_set.next_compliant_date(local) {
        return Ok(found.with_timezone(&Utc));
    }

    // Sub-daily tasks run all day long, so the first slot is the start of
    // the day; longer steps keep the time of day of `start`.
    let mut date = local.date_naive();
    for day in 1..=MAX_SEED_DAYS {
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
        let candidate = if frequency.is_sub_daily() {
            start_of_day(date, timezone)
        } else {
            start.checked_add_signed(ChronoDuration::days(day))
        };
        let Some(candidate) = candidate else { break };
        if let Some(found) = rule_set.next_compliant_date(candidate.with_timezone(timezone)) {
            return Ok(found.with_timezone(&Utc));
        }
    }
    Err(CoreError::NoCompliantExecution(format!(
        "no day within {} days of {} satisfies [{}]",
        MAX_SEED_DAYS, start, rule_set
    )))
}

/// First instant of `date` in `timezone`, past any DST gap at midnight.
fn start_of_day(date: NaiveDate, timezone: &Tz) -> Option<DateTime<Utc>> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=24 * 60)
        .map(|minutes| midnight + ChronoDuration::minutes(minutes))
        .find_map(|local| timezone.from_local_datetime(&local).earliest())
        .map(|found| found.with_timezone(&Utc))
}
