use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::loop_manager::LoopManager;
use crate::task::{Task, TaskState};

/// Point-in-time view of a registered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub name: String,
    pub id: Uuid,
    pub state: TaskState,
    pub next_execution: DateTime<Utc>,
    pub runs: u64,
    pub failures: u64,
}

impl TaskInfo {
    fn of(name: &str, task: &Task) -> Self {
        Self {
            name: name.to_string(),
            id: task.id(),
            state: task.state(),
            next_execution: task.next_execution(),
            runs: task.runs(),
            failures: task.failures(),
        }
    }
}

/// TaskManager: registry and supervisor of every named task in a process.
///
/// Responsibilities:
/// 1. Keep task names unique, replacing a task only when asked to
/// 2. Start a task when it is registered and stop it when it is removed
/// 3. Serialize every registry mutation behind one lock
/// 4. Own the [`LoopManager`] that keeps the host alive
///
/// Stopping a task waits for its in-flight invocation. Lookups never wait on
/// that: the map itself is only locked briefly, while `mutations` is held for
/// the whole of an add, remove or shutdown.
pub struct TaskManager {
    mutations: Mutex<()>,
    tasks: Mutex<HashMap<String, Task>>,
    loop_manager: LoopManager,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::with_loop_manager(LoopManager::default())
    }

    pub fn with_heartbeat(heartbeat: Duration) -> Self {
        Self::with_loop_manager(LoopManager::new(heartbeat))
    }

    pub fn with_loop_manager(loop_manager: LoopManager) -> Self {
        Self {
            mutations: Mutex::new(()),
            tasks: Mutex::new(HashMap::new()),
            loop_manager,
        }
    }

    /// Registers `task` under `name` and starts it.
    ///
    /// # Behavior
    /// - Name taken and `override_existing` false: fails with
    ///   `TaskAlreadyExists`, the running task is untouched
    /// - Name taken and `override_existing` true: the old task is stopped and
    ///   removed before the new one starts
    /// - A start failure leaves the new task unregistered
    ///
    /// A job must not replace its own task: stopping it waits for the very
    /// invocation making the call.
    pub async fn add_task(
        &self,
        name: &str,
        mut task: Task,
        override_existing: bool,
    ) -> Result<(), CoreError> {
        if task.state() != TaskState::Created {
            return Err(CoreError::InvalidInput(format!(
                "task for '{}' must be freshly created, found {:?}",
                name,
                task.state()
            )));
        }

        let _mutation = self.mutations.lock().await;
        let replaced = {
            let mut tasks = self.tasks.lock().await;
            if tasks.contains_key(name) && !override_existing {
                warn!(task = name, "rejected duplicate task registration");
                return Err(CoreError::TaskAlreadyExists(name.to_string()));
            }
            tasks.remove(name)
        };
        if let Some(mut existing) = replaced {
            existing.stop().await;
            info!(task = name, old_task_id = %existing.id(), new_task_id = %task.id(), "replacing task");
        }

        task.start(name)?;
        self.tasks.lock().await.insert(name.to_string(), task);
        Ok(())
    }

    /// Stops the named task, waiting for its loop to exit, and unregisters it.
    ///
    /// The name disappears from lookups before the stop completes. A job
    /// must not remove its own task: stopping it waits for the very
    /// invocation making the call.
    pub async fn remove_task(&self, name: &str) -> Result<(), CoreError> {
        let _mutation = self.mutations.lock().await;
        let mut task = self
            .tasks
            .lock()
            .await
            .remove(name)
            .ok_or_else(|| CoreError::TaskNotFound(name.to_string()))?;
        task.stop().await;
        info!(task = name, task_id = %task.id(), "task removed");
        Ok(())
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.tasks.lock().await.contains_key(name)
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }

    /// Registered names, sorted.
    pub async fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn next_execution(&self, name: &str) -> Result<DateTime<Utc>, CoreError> {
        self.task_info(name).await.map(|info| info.next_execution)
    }

    pub async fn task_info(&self, name: &str) -> Result<TaskInfo, CoreError> {
        let tasks = self.tasks.lock().await;
        tasks
            .get(name)
            .map(|task| TaskInfo::of(name, task))
            .ok_or_else(|| CoreError::TaskNotFound(name.to_string()))
    }

    /// Info for every registered task, sorted by name.
    pub async fn snapshot(&self) -> Vec<TaskInfo> {
        let tasks = self.tasks.lock().await;
        let mut infos: Vec<TaskInfo> = tasks
            .iter()
            .map(|(name, task)| TaskInfo::of(name, task))
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Starts the supervision loop that keeps the host alive.
    pub fn start(&self) -> Result<(), CoreError> {
        self.loop_manager.start()
    }

    /// Stops the supervision loop. Registered tasks keep running.
    pub async fn stop(&self) {
        self.loop_manager.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.loop_manager.is_running()
    }

    /// Resolves once the supervision loop has been stopped.
    pub async fn wait(&self) {
        self.loop_manager.wait().await;
    }

    /// Stops and unregisters every task, then stops the supervision loop.
    pub async fn shutdown(&self) {
        let _mutation = self.mutations.lock().await;
        let drained: Vec<Task> = self.tasks.lock().await.drain().map(|(_, task)| task).collect();
        let count = drained.len();
        for mut task in drained {
            task.stop().await;
        }
        self.loop_manager.stop().await;
        info!(tasks = count, "task manager shut down");
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
