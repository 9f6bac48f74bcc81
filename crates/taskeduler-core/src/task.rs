use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::job::{Job, JobArgs};
use crate::scheduler::{Scheduler, Wakeup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    Stopped,
}

#[derive(Debug, Default)]
struct TaskStats {
    runs: AtomicU64,
    failures: AtomicU64,
}

/// A job bound to its own scheduler, executed repeatedly on one tokio task.
///
/// Lifecycle: `Created` → [`Task::start`] → `Running` → [`Task::stop`] → `Stopped`.
/// Dropping a running task cancels its loop without waiting for it.
pub struct Task {
    id: Uuid,
    name: Option<String>,
    job: Arc<dyn Job>,
    args: Arc<JobArgs>,
    /// Moved into the execution unit on start
    pending: Option<(Scheduler, watch::Sender<DateTime<Utc>>)>,
    next_execution: watch::Receiver<DateTime<Utc>>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    stats: Arc<TaskStats>,
    state: TaskState,
}

impl Task {
    pub fn new(job: Arc<dyn Job>, args: JobArgs, scheduler: Scheduler) -> Self {
        let (tx, rx) = watch::channel(scheduler.next_execution());
        Self {
            id: Uuid::now_v7(),
            name: None,
            job,
            args: Arc::new(args),
            pending: Some((scheduler, tx)),
            next_execution: rx,
            cancel: CancellationToken::new(),
            handle: None,
            stats: Arc::new(TaskStats::default()),
            state: TaskState::Created,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The name given at start, `None` while still `Created`.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
            && self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// The deadline the task is currently waiting for.
    pub fn next_execution(&self) -> DateTime<Utc> {
        *self.next_execution.borrow()
    }

    /// Completed invocations, failed ones included.
    pub fn runs(&self) -> u64 {
        self.stats.runs.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.stats.failures.load(Ordering::SeqCst)
    }

    /// Spawns the execution unit on the current tokio runtime.
    ///
    /// The scheduler is reseeded from its clock first, so a task built well
    /// before it is started does not begin with a stale deadline.
    pub fn start(&mut self, name: &str) -> Result<(), CoreError> {
        if self.state != TaskState::Created {
            return Err(CoreError::InvalidInput(format!(
                "task '{}' cannot be started from state {:?}",
                name, self.state
            )));
        }
        let runtime = Handle::try_current()
            .map_err(|e| CoreError::Runtime(format!("cannot start task '{}': {}", name, e)))?;
        let Some((mut scheduler, next_tx)) = self.pending.take() else {
            return Err(CoreError::InvalidInput(format!(
                "task '{}' has no scheduler to run",
                name
            )));
        };
        if let Err(err) = scheduler.reseed() {
            self.pending = Some((scheduler, next_tx));
            return Err(err);
        }
        next_tx.send_replace(scheduler.next_execution());

        let worker = TaskWorker {
            name: name.to_string(),
            id: self.id,
            job: self.job.clone(),
            args: self.args.clone(),
            cancel: self.cancel.clone(),
            next_tx,
            stats: self.stats.clone(),
        };
        info!(
            task = name,
            task_id = %self.id,
            frequency = %scheduler.frequency(),
            next_execution = %scheduler.next_execution(),
            "task started"
        );
        self.handle = Some(runtime.spawn(worker.run(scheduler)));
        self.name = Some(name.to_string());
        self.state = TaskState::Running;
        Ok(())
    }

    /// Cancels the loop and waits for it to exit.
    ///
    /// An invocation already in flight finishes first; none starts afterwards.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                error!(
                    task = self.name.as_deref().unwrap_or_default(),
                    task_id = %self.id,
                    error = %err,
                    "task loop ended abnormally"
                );
            }
        }
        if self.state == TaskState::Running {
            info!(
                task = self.name.as_deref().unwrap_or_default(),
                task_id = %self.id,
                runs = self.runs(),
                failures = self.failures(),
                "task stopped"
            );
        }
        self.state = TaskState::Stopped;
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("next_execution", &self.next_execution())
            .field("runs", &self.runs())
            .field("failures", &self.failures())
            .finish()
    }
}

/// State owned by a running task's loop.
struct TaskWorker {
    name: String,
    id: Uuid,
    job: Arc<dyn Job>,
    args: Arc<JobArgs>,
    cancel: CancellationToken,
    next_tx: watch::Sender<DateTime<Utc>>,
    stats: Arc<TaskStats>,
}

impl TaskWorker {
    async fn run(self, mut scheduler: Scheduler) {
        loop {
            let scheduled_for = scheduler.next_execution();
            match scheduler.sleep_until_execution(&self.cancel).await {
                Ok(Wakeup::Due) => {}
                Ok(Wakeup::Cancelled) => break,
                Err(err) => {
                    error!(
                        task = %self.name,
                        task_id = %self.id,
                        scheduled_for = %scheduled_for,
                        error = %err,
                        "task schedule exhausted, no further runs"
                    );
                    break;
                }
            }
            self.next_tx.send_replace(scheduler.next_execution());
            self.execute(scheduled_for).await;
        }
        debug!(task = %self.name, task_id = %self.id, "task loop exited");
    }

    /// Runs the job once on its own tokio task so a panic stays contained.
    async fn execute(&self, scheduled_for: DateTime<Utc>) {
        let job = self.job.clone();
        let args = self.args.clone();
        let started = tokio::time::Instant::now();

        let outcome = tokio::spawn(async move { job.run(&args).await }).await;
        self.stats.runs.fetch_add(1, Ordering::SeqCst);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(())) => {
                debug!(
                    task = %self.name,
                    task_id = %self.id,
                    scheduled_for = %scheduled_for,
                    elapsed_ms,
                    "task run completed"
                );
            }
            Ok(Err(err)) => {
                self.stats.failures.fetch_add(1, Ordering::SeqCst);
                error!(
                    task = %self.name,
                    task_id = %self.id,
                    scheduled_for = %scheduled_for,
                    elapsed_ms,
                    error = %format!("{err:#}"),
                    "task run failed"
                );
            }
            Err(join_err) if join_err.is_panic() => {
                self.stats.failures.fetch_add(1, Ordering::SeqCst);
                error!(
                    task = %self.name,
                    task_id = %self.id,
                    scheduled_for = %scheduled_for,
                    "task run panicked"
                );
            }
            Err(join_err) => {
                self.stats.failures.fetch_add(1, Ordering::SeqCst);
                warn!(
                    task = %self.name,
                    task_id = %self.id,
                    scheduled_for = %scheduled_for,
                    error = %join_err,
                    "task run was cancelled"
                );
            }
        }
    }
}
