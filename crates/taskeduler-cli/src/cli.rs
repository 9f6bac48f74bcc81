use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Runs recurring jobs on calendar-aware schedules
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "taskeduler.toml")]
    pub config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run every configured task until interrupted
    Run(RunCommand),
    /// List configured tasks and their next execution
    List(ListCommand),
    /// Show upcoming executions of one task
    Preview(PreviewCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct RunCommand {
    /// Only run these tasks (default: all)
    #[arg(long = "only", num_args = 1..)]
    pub only: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {}

#[derive(Parser, Debug, Clone)]
pub struct PreviewCommand {
    /// The name of the task
    pub task: String,
    /// How many executions to show
    #[arg(short = 'n', long, default_value_t = 5)]
    pub count: usize,
    /// Compute from this moment instead of now
    #[arg(long, help = "Start time (e.g., 'tomorrow', '2025-03-01 09:00', 'next monday')")]
    pub from: Option<String>,
}
