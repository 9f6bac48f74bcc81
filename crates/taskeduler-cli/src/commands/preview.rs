use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use taskeduler_core::clock::{Clock, ManualClock, SystemClock};
use taskeduler_core::error::CoreError;

use crate::cli::PreviewCommand;
use crate::config::Config;
use crate::parser::parse_moment;
use crate::views::table::display_preview;

/// Upcoming executions of a configured task, seeded at `from` or now.
pub fn preview_executions(
    config: &Config,
    task: &str,
    count: usize,
    from: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(chrono_tz::Tz, Vec<DateTime<Utc>>)> {
    if count == 0 {
        return Err(CoreError::InvalidInput("--count must be at least 1".to_string()).into());
    }
    let definition = config
        .task(task)
        .ok_or_else(|| CoreError::TaskNotFound(task.to_string()))?;
    let default_tz = config.scheduler.timezone()?;
    let spec = definition
        .schedule_spec(&default_tz)
        .with_context(|| format!("Invalid task definition '{}'", task))?;

    let clock: Arc<dyn Clock> = match from {
        Some(input) => Arc::new(ManualClock::new(parse_moment(input, now, &spec.timezone)?)),
        None => Arc::new(SystemClock),
    };
    let scheduler = spec
        .scheduler(clock)
        .with_context(|| format!("Task '{}' cannot be scheduled", task))?;
    let executions = scheduler.preview(count)?;
    Ok((spec.timezone, executions))
}

pub fn preview_task(command: PreviewCommand, config: &Config) -> Result<()> {
    let (timezone, executions) = preview_executions(
        config,
        &command.task,
        command.count,
        command.from.as_deref(),
        Utc::now(),
    )?;
    display_preview(&command.task, &executions, &timezone);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use chrono::{Datelike, Weekday};
    use taskeduler_core::models::TaskDefinition;

    fn config_with(name: &str, definition: TaskDefinition) -> Config {
        let mut config = Config {
            scheduler: SchedulerConfig {
                default_timezone: "UTC".to_string(),
                heartbeat_secs: 60,
            },
            ..Default::default()
        };
        config.tasks.insert(name.to_string(), definition);
        config
    }

    #[test]
    fn test_preview_weekly_mondays() {
        let mut definition = TaskDefinition::new("weekly", "log");
        definition.rules.weekdays = Some(vec![0]);
        let config = config_with("standup", definition);

        let (tz, executions) =
            preview_executions(&config, "standup", 3, None, Utc::now()).unwrap();
        assert_eq!(tz, chrono_tz::Tz::UTC);
        assert_eq!(executions.len(), 3);
        assert!(executions.iter().all(|e| e.weekday() == Weekday::Mon));
        assert!(executions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_preview_unknown_task() {
        let config = config_with("standup", TaskDefinition::new("daily", "log"));
        let err = preview_executions(&config, "missing", 3, None, Utc::now()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_preview_zero_count() {
        let config = config_with("standup", TaskDefinition::new("daily", "log"));
        assert!(preview_executions(&config, "standup", 0, None, Utc::now()).is_err());
    }

    #[test]
    fn test_preview_from_natural_date() {
        let config = config_with("standup", TaskDefinition::new("daily", "log"));
        let now = Utc::now();
        let (_, executions) =
            preview_executions(&config, "standup", 2, Some("tomorrow"), now).unwrap();
        assert!(executions[0] > now + chrono::Duration::hours(12));
    }
}
