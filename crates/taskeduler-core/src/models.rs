use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::CoreError;
use crate::frequency::Frequency;
use crate::job::{JobArgs, TaskSource};
use crate::rules::{ExecutionRuleSet, RuleConfig};
use crate::scheduler::Scheduler;
use crate::task::Task;
use crate::timezone::parse_timezone;

/// Plain description of one scheduled task, as read from a configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TaskDefinition {
    /// One of yearly, monthly, weekly, daily, hourly, minutely
    pub frequency: String,
    #[serde(default)]
    pub rules: RuleConfig,
    /// IANA name; the host's default timezone applies when absent
    #[serde(default)]
    pub timezone: Option<String>,
    /// Name resolved through a [`TaskSource`]
    pub entrypoint: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

/// Validated scheduling inputs of a [`TaskDefinition`].
#[derive(Debug, Clone)]
pub struct ScheduleSpec {
    pub frequency: Frequency,
    pub rule_set: ExecutionRuleSet,
    pub timezone: Tz,
}

impl ScheduleSpec {
    pub fn scheduler(&self, clock: Arc<dyn Clock>) -> Result<Scheduler, CoreError> {
        Scheduler::new(self.frequency, self.rule_set.clone(), self.timezone, clock)
    }
}

impl TaskDefinition {
    pub fn new(frequency: impl Into<String>, entrypoint: impl Into<String>) -> Self {
        Self {
            frequency: frequency.into(),
            rules: RuleConfig::default(),
            timezone: None,
            entrypoint: entrypoint.into(),
            args: Vec::new(),
            kwargs: Map::new(),
        }
    }

    pub fn job_args(&self) -> JobArgs {
        JobArgs::new(self.args.clone(), self.kwargs.clone())
    }

    /// Parses frequency, rules and timezone without resolving the entrypoint.
    pub fn schedule_spec(&self, default_timezone: &Tz) -> Result<ScheduleSpec, CoreError> {
        let frequency: Frequency = self.frequency.parse()?;
        let rule_set = ExecutionRuleSet::from_config(&self.rules)?;
        let timezone = match &self.timezone {
            Some(name) => parse_timezone(name)?,
            None => *default_timezone,
        };
        Ok(ScheduleSpec {
            frequency,
            rule_set,
            timezone,
        })
    }

    /// Builds an unstarted [`Task`] from this definition.
    ///
    /// # Behavior
    /// - Configuration errors surface before any job is resolved
    /// - The scheduler is seeded from `clock` now and again when the task starts
    pub fn build(
        &self,
        source: &dyn TaskSource,
        clock: Arc<dyn Clock>,
        default_timezone: &Tz,
    ) -> Result<Task, CoreError> {
        let spec = self.schedule_spec(default_timezone)?;
        let job = source.resolve(&self.entrypoint)?;
        let scheduler = spec.scheduler(clock)?;
        Ok(Task::new(job, self.job_args(), scheduler))
    }
}
