#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test harness for running CLI commands against a temporary config file
pub struct CliTestHarness {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl CliTestHarness {
    /// Create a harness whose config file holds `toml`
    pub fn with_config(toml: &str) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let config_path = temp_dir.path().join("taskeduler.toml");
        std::fs::write(&config_path, toml).expect("Failed to write config file");

        Self {
            temp_dir,
            config_path,
        }
    }

    /// Create a harness with the sample tasks
    pub fn new() -> Self {
        Self::with_config(TestFixtures::sample_config())
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskeduler").expect("Failed to find taskeduler binary");
        cmd.arg("--config").arg(&self.config_path);
        cmd.current_dir(self.temp_dir.path());
        cmd.env("TASKEDULER_SCHEDULER__DEFAULT_TIMEZONE", "UTC");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }
}

/// Common test fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub fn sample_config() -> &'static str {
        r#"
[scheduler]
heartbeat_secs = 5

[tasks.standup]
frequency = "weekly"
entrypoint = "log"
rules = { weekdays = [0] }
kwargs = { message = "standup" }

[tasks.backup]
frequency = "daily"
entrypoint = "shell"
timezone = "Europe/Berlin"
rules = { weekdays = [0, 1, 2, 3, 4] }
kwargs = { command = "true" }
"#
    }

    pub fn invalid_entrypoint_config() -> &'static str {
        r#"
[tasks.broken]
frequency = "daily"
entrypoint = "python"
"#
    }

    pub fn invalid_frequency_config() -> &'static str {
        r#"
[tasks.broken]
frequency = "fortnightly"
entrypoint = "log"
"#
    }

    pub fn empty_config() -> &'static str {
        "[scheduler]\nheartbeat_secs = 5\n"
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    /// Predicate to check if output contains task table headers
    pub fn has_task_table_headers() -> impl Predicate<str> {
        predicate::str::contains("Name")
            .and(predicate::str::contains("Frequency"))
            .and(predicate::str::contains("Next Execution"))
    }

    /// Predicate to check if output indicates an error
    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error").or(predicate::str::contains("error"))
    }
}
