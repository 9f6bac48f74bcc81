use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;
use std::sync::Arc;
use taskeduler_core::clock::{Clock, SystemClock};
use taskeduler_core::error::CoreError;
use taskeduler_core::manager::TaskManager;
use taskeduler_core::timezone::format_in_timezone;
use tracing::info;

use crate::cli::RunCommand;
use crate::config::Config;
use crate::jobs::builtin_registry;

/// Registers the selected tasks with `manager`, returning their names.
pub async fn register_tasks(
    manager: &TaskManager,
    config: &Config,
    only: &[String],
) -> Result<Vec<String>> {
    if let Some(unknown) = only.iter().find(|name| !config.tasks.contains_key(*name)) {
        return Err(CoreError::TaskNotFound(unknown.clone()).into());
    }

    let default_tz = config.scheduler.timezone()?;
    let registry = builtin_registry();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut registered = Vec::new();
    for (name, definition) in &config.tasks {
        if !only.is_empty() && !only.contains(name) {
            continue;
        }
        let task = definition
            .build(&registry, clock.clone(), &default_tz)
            .with_context(|| format!("Invalid task definition '{}'", name))?;
        manager.add_task(name, task, false).await?;
        registered.push(name.clone());
    }
    Ok(registered)
}

pub async fn run_tasks(command: RunCommand, config: &Config) -> Result<()> {
    let manager = TaskManager::with_heartbeat(config.scheduler.heartbeat());
    let registered = match register_tasks(&manager, config, &command.only).await {
        Ok(names) => names,
        Err(err) => {
            manager.shutdown().await;
            return Err(err);
        }
    };
    if registered.is_empty() {
        bail!("No tasks configured");
    }

    let default_tz = config.scheduler.timezone()?;
    for info in manager.snapshot().await {
        println!(
            "{} {} next at {}",
            "✓".green(),
            info.name.bold(),
            format_in_timezone(info.next_execution, &default_tz)
        );
    }

    manager.start()?;
    info!(tasks = registered.len(), "scheduler running, press Ctrl-C to stop");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            info!("interrupt received, shutting down");
        }
        _ = manager.wait() => {}
    }

    manager.shutdown().await;
    println!("Stopped {} task(s).", registered.len());
    Ok(())
}
