//! Invocable work and the capability that resolves it by name.
//!
//! The scheduler core only ever sees an `Arc<dyn Job>`; how a job is found
//! (compiled in, registered by a host, loaded from elsewhere) is behind
//! [`TaskSource`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::CoreError;

/// Positional and keyword arguments bound to a job at definition time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobArgs {
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl JobArgs {
    pub fn new(args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Self { args, kwargs }
    }

    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    pub fn kwarg_str(&self, key: &str) -> Option<&str> {
        self.kwargs.get(key).and_then(Value::as_str)
    }
}

/// Work performed on every scheduled execution.
///
/// An `Err` (or a panic) is reported by the owning task and never stops it.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    async fn run(&self, args: &JobArgs) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into a [`Job`].
pub struct FnJob<F> {
    f: F,
}

impl<F> fmt::Debug for FnJob<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnJob").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Job for FnJob<F>
where
    F: Fn(JobArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn run(&self, args: &JobArgs) -> anyhow::Result<()> {
        (self.f)(args.clone()).await
    }
}

/// Wraps an async closure as a shareable job handle.
pub fn job_fn<F, Fut>(f: F) -> Arc<dyn Job>
where
    F: Fn(JobArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnJob { f })
}

/// Maps an entrypoint name to an invocable job handle.
pub trait TaskSource: Send + Sync {
    fn resolve(&self, entrypoint: &str) -> Result<Arc<dyn Job>, CoreError>;
}

/// In-memory [`TaskSource`] populated by the host application.
#[derive(Default, Clone)]
pub struct JobRegistry {
    jobs: HashMap<String, Arc<dyn Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a job under `entrypoint`, replacing any previous one.
    pub fn register(&mut self, entrypoint: impl Into<String>, job: Arc<dyn Job>) -> &mut Self {
        self.jobs.insert(entrypoint.into(), job);
        self
    }

    pub fn contains(&self, entrypoint: &str) -> bool {
        self.jobs.contains_key(entrypoint)
    }

    /// Registered entrypoints, sorted.
    pub fn entrypoints(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.jobs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRegistry")
            .field("entrypoints", &self.entrypoints())
            .finish()
    }
}

impl TaskSource for JobRegistry {
    fn resolve(&self, entrypoint: &str) -> Result<Arc<dyn Job>, CoreError> {
        self.jobs
            .get(entrypoint)
            .cloned()
            .ok_or_else(|| CoreError::JobNotFound(entrypoint.to_string()))
    }
}
