//! # Taskeduler Core Library
//!
//! In-process scheduling of recurring jobs with calendar-aware frequencies,
//! declarative execution rules and supervised task loops.
//!
//! ## Features
//!
//! - **Calendar-Aware Frequencies**: Yearly and monthly steps follow leap years
//!   and month lengths, shorter frequencies are fixed durations
//! - **Execution Rules**: Restrict runs to weekdays, months or days of the month,
//!   and skip explicit dates
//! - **Timezone Awareness**: Rules are evaluated on the local date of an IANA zone
//! - **Supervised Tasks**: Every task runs on its own tokio task; failures and
//!   panics are logged and never end the loop
//! - **Prompt Cancellation**: Stopping a task interrupts even a multi-day sleep
//! - **Pluggable Jobs**: Entrypoints resolve through a [`TaskSource`]
//!
//! ## Core Modules
//!
//! - [`frequency`]: Frequencies and calendar arithmetic
//! - [`rules`]: Execution rules and rule sets
//! - [`scheduler`]: Next-execution calculation and cancellable waiting
//! - [`task`]: A job bound to its scheduler and execution loop
//! - [`manager`]: Named task registry and supervision
//! - [`loop_manager`]: Host keep-alive loop
//! - [`job`]: Job trait and entrypoint resolution
//! - [`models`]: Serializable task definitions
//! - [`clock`]: Real and manual clocks
//! - [`timezone`]: Timezone utilities and validation
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskeduler_core::{
//!     clock::SystemClock, job::job_fn, manager::TaskManager,
//!     models::TaskDefinition, JobRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut registry = JobRegistry::new();
//!     registry.register("hello", job_fn(|_args| async {
//!         println!("hello");
//!         Ok(())
//!     }));
//!
//!     let mut definition = TaskDefinition::new("weekly", "hello");
//!     definition.rules.weekdays = Some(vec![0]);
//!     let task = definition.build(&registry, Arc::new(SystemClock), &chrono_tz::Tz::UTC)?;
//!
//!     let manager = TaskManager::new();
//!     manager.add_task("monday-hello", task, false).await?;
//!     manager.start()?;
//!     manager.wait().await;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod error;
pub mod frequency;
pub mod job;
pub mod loop_manager;
pub mod manager;
pub mod models;
pub mod rules;
pub mod scheduler;
pub mod task;
pub mod timezone;

pub use error::CoreError;
pub use frequency::Frequency;
pub use job::{Job, JobArgs, JobRegistry, TaskSource};
pub use manager::TaskManager;
pub use rules::{ExecutionRule, ExecutionRuleSet};
pub use scheduler::Scheduler;
pub use task::Task;
