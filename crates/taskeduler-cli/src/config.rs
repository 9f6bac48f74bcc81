use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use taskeduler_core::models::TaskDefinition;
use taskeduler_core::timezone::{parse_timezone, validate_timezone};

pub const ENV_PREFIX: &str = "TASKEDULER_";

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskDefinition>,
}

/// Host-wide scheduling settings
#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Timezone for tasks that do not name one (IANA format)
    pub default_timezone: String,
    /// Interval between keep-alive heartbeats, in seconds
    pub heartbeat_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_timezone: detect_system_timezone(),
            heartbeat_secs: 60,
        }
    }
}

impl SchedulerConfig {
    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.default_timezone)
            .context("Invalid [scheduler] default_timezone")
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}

impl Config {
    /// Merges the TOML file at `path` with `TASKEDULER_` environment
    /// variables; nested keys use a double underscore
    /// (`TASKEDULER_SCHEDULER__DEFAULT_TIMEZONE`).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("Configuration file '{}' not found", path.display());
        }
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load configuration from '{}'", path.display()))
    }

    pub fn task(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.get(name)
    }
}

/// Detects the system timezone, falling back to UTC if detection fails
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if !tz.is_empty() && validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    if let Ok(tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    "UTC".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_tasks_and_scheduler_settings() {
        let file = write_config(
            r#"
            [scheduler]
            default_timezone = "Europe/Berlin"
            heartbeat_secs = 30

            [tasks.backup]
            frequency = "weekly"
            entrypoint = "shell"
            rules = { weekdays = [0] }
            kwargs = { command = "echo backup" }

            [tasks.greet]
            frequency = "daily"
            entrypoint = "log"
            args = ["hello"]
            "#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.scheduler.default_timezone, "Europe/Berlin");
        assert_eq!(config.scheduler.heartbeat(), Duration::from_secs(30));
        assert_eq!(config.tasks.len(), 2);

        let backup = config.task("backup").unwrap();
        assert_eq!(backup.frequency, "weekly");
        assert_eq!(backup.rules.weekdays, Some(vec![0]));
        assert_eq!(backup.job_args().kwarg_str("command"), Some("echo backup"));
    }

    #[test]
    fn test_scheduler_section_is_optional() {
        let file = write_config(
            r#"
            [tasks.greet]
            frequency = "hourly"
            entrypoint = "log"
            "#,
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.scheduler.heartbeat_secs, 60);
        assert!(config.scheduler.timezone().is_ok());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_unknown_task_key_is_an_error() {
        let file = write_config(
            r#"
            [tasks.greet]
            frequency = "hourly"
            entrypoint = "log"
            priority = "high"
            "#,
        );
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_invalid_default_timezone() {
        let scheduler = SchedulerConfig {
            default_timezone: "Nowhere/Special".to_string(),
            heartbeat_secs: 60,
        };
        assert!(scheduler.timezone().is_err());
    }

    #[test]
    fn test_detected_timezone_is_valid() {
        assert!(validate_timezone(&detect_system_timezone()).is_ok());
    }
}
