use anyhow::{bail, Result};
use chrono_tz::Tz;
use std::sync::Arc;
use taskeduler_core::clock::{Clock, SystemClock};
use taskeduler_core::job::TaskSource;
use taskeduler_core::models::TaskDefinition;

use crate::cli::ListCommand;
use crate::config::Config;
use crate::jobs::builtin_registry;
use crate::views::table::{display_tasks, ViewTask};

pub fn list_tasks(_command: ListCommand, config: &Config) -> Result<()> {
    let default_tz = config.scheduler.timezone()?;
    let registry = builtin_registry();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let view_tasks: Vec<ViewTask> = config
        .tasks
        .iter()
        .map(|(name, definition)| view_task(name, definition, &registry, clock.clone(), &default_tz))
        .collect();

    display_tasks(&view_tasks);

    match view_tasks
        .iter()
        .find_map(|view| view.next_execution.as_ref().err().map(|err| (&view.name, err)))
    {
        Some((name, err)) => bail!("Invalid task definition '{}': {}", name, err),
        None => Ok(()),
    }
}

fn view_task(
    name: &str,
    definition: &TaskDefinition,
    source: &dyn TaskSource,
    clock: Arc<dyn Clock>,
    default_tz: &Tz,
) -> ViewTask {
    let spec = definition.schedule_spec(default_tz).ok();
    let next_execution = definition
        .build(source, clock, default_tz)
        .map(|task| task.next_execution())
        .map_err(|err| err.to_string());

    ViewTask {
        name: name.to_string(),
        frequency: definition.frequency.clone(),
        rules: spec
            .as_ref()
            .map_or_else(|| "-".to_string(), |spec| spec.rule_set.to_string()),
        timezone: spec.map(|spec| spec.timezone),
        entrypoint: definition.entrypoint.clone(),
        next_execution,
    }
}
