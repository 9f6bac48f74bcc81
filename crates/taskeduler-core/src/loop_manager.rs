use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::CoreError;

pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(60);

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Keeps the host alive with an idle supervision loop, independent of any
/// task's schedule. The loop only waits on its cancellation token and emits a
/// periodic heartbeat.
pub struct LoopManager {
    heartbeat: Duration,
    running: Mutex<Option<RunningLoop>>,
}

impl LoopManager {
    pub fn new(heartbeat: Duration) -> Self {
        Self {
            heartbeat,
            running: Mutex::new(None),
        }
    }

    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    /// Spawns the idle loop. A no-op if it is already running.
    pub fn start(&self) -> Result<(), CoreError> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return Ok(());
        }
        let runtime = Handle::try_current()
            .map_err(|e| CoreError::Runtime(format!("cannot start loop manager: {}", e)))?;

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(idle_loop(cancel.clone(), self.heartbeat));
        *running = Some(RunningLoop { cancel, handle });
        Ok(())
    }

    /// Cancels the idle loop and waits for it to exit.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(RunningLoop { cancel, handle }) = running {
            cancel.cancel();
            if let Err(err) = handle.await {
                error!(error = %err, "loop manager ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Resolves once the loop has been stopped, immediately if it is not running.
    pub async fn wait(&self) {
        let cancel = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|r| r.cancel.clone());
        if let Some(cancel) = cancel {
            cancel.cancelled().await;
        }
    }
}

impl Default for LoopManager {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT)
    }
}

impl Drop for LoopManager {
    fn drop(&mut self) {
        if let Some(running) = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            running.cancel.cancel();
        }
    }
}

async fn idle_loop(cancel: CancellationToken, heartbeat: Duration) {
    info!(heartbeat_secs = heartbeat.as_secs(), "loop manager started");
    let mut beats: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(heartbeat) => {
                beats += 1;
                debug!(beats, "loop manager heartbeat");
            }
        }
    }
    info!(beats, "loop manager stopped");
}
