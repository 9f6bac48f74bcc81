use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use taskeduler_core::job::{Job, JobArgs, JobRegistry};
use tokio::process::Command;
use tracing::{debug, info};

/// Logs `kwargs.message`, or the positional args joined by spaces.
#[derive(Debug, Default)]
pub struct LogJob;

#[async_trait]
impl Job for LogJob {
    async fn run(&self, args: &JobArgs) -> Result<()> {
        info!(message = %log_message(args), "log job");
        Ok(())
    }
}

fn log_message(args: &JobArgs) -> String {
    if let Some(message) = args.kwarg_str("message") {
        return message.to_string();
    }
    args.args
        .iter()
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `kwargs.command` through `sh -c`; positional args become `$1`, `$2`, ...
#[derive(Debug, Default)]
pub struct ShellJob;

#[async_trait]
impl Job for ShellJob {
    async fn run(&self, args: &JobArgs) -> Result<()> {
        let Some(command) = args.kwarg_str("command") else {
            bail!("shell job requires a 'command' keyword argument");
        };

        let mut process = Command::new("sh");
        process.arg("-c").arg(command).arg("taskeduler");
        for value in &args.args {
            match value {
                Value::String(s) => process.arg(s),
                other => process.arg(other.to_string()),
            };
        }

        let output = process
            .output()
            .await
            .with_context(|| format!("failed to spawn shell for '{}'", command))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(command, stdout = %stdout.trim_end(), "shell job output");
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "'{}' exited with {}: {}",
                command,
                output.status,
                stderr.trim_end()
            );
        }
        Ok(())
    }
}

/// Registry of the jobs shipped with the binary.
pub fn builtin_registry() -> JobRegistry {
    let mut registry = JobRegistry::new();
    registry
        .register("log", Arc::new(LogJob))
        .register("shell", Arc::new(ShellJob));
    registry
}
