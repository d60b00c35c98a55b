//! The series builder.
//!
//! A [`Series`] collects tasks in order and, when run, executes them one
//! after another. The completion handler fires exactly once, with every
//! task's value in registration order or with the first failure.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::info_span;

use crate::config::{AbandonPolicy, SeriesConfig};
use crate::core::result::AsyncResult;
use crate::core::task::{AsyncTask, Task, TaskError};
use crate::core::types::RunId;

use super::driver::{self, Driver};
use super::spawn::Spawned;

/// Create an empty series.
pub fn series<T>() -> Series<T> {
    Series::new()
}

/// Builder for a sequence of tasks run one after another.
///
/// `run` consumes the builder, so a series can only be run once and no task
/// can be added after it starts.
///
/// # Example
///
/// ```
/// use petit_series::{series, task_fn};
///
/// series()
///     .task(task_fn("load_config", |done| done.succeed("config")))
///     .task(task_fn("connect", |done| done.succeed("connection")))
///     .run(|outcome| {
///         assert_eq!(outcome.result(), Some(&vec!["config", "connection"]));
///     });
/// ```
pub struct Series<T> {
    run_id: RunId,
    name: Option<String>,
    abandon: AbandonPolicy,
    tasks: Vec<Arc<dyn Task<T>>>,
}

impl<T> Series<T> {
    /// Create an empty series with default settings.
    pub fn new() -> Self {
        Self::with_config(SeriesConfig::default())
    }

    /// Create an empty series from configuration.
    pub fn with_config(config: SeriesConfig) -> Self {
        Self {
            run_id: RunId::new(),
            name: config.name,
            abandon: config.abandon,
            tasks: Vec::new(),
        }
    }

    /// Builder: label the run in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder: set how abandoned completions are handled.
    pub fn on_abandon(mut self, policy: AbandonPolicy) -> Self {
        self.abandon = policy;
        self
    }

    /// Append a task.
    pub fn task<S>(mut self, task: S) -> Self
    where
        S: Task<T> + 'static,
    {
        self.tasks.push(Arc::new(task));
        self
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if no task is registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Identifier recorded on this run's tracing span.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Label recorded on this run's tracing span.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Abandoned-completion handling for this run.
    pub fn abandon_policy(&self) -> AbandonPolicy {
        self.abandon
    }

    /// Run every task in order and report the outcome to `handler`.
    ///
    /// With no tasks registered the handler is called before `run` returns.
    /// Otherwise it is called from whichever thread delivers the final
    /// completion.
    pub fn run<F>(self, handler: F)
    where
        F: FnOnce(AsyncResult<Vec<T>>) + Send + 'static,
    {
        let span = info_span!(
            "series_run",
            run = %self.run_id,
            name = self.name.as_deref().unwrap_or("series"),
            task_count = self.tasks.len(),
        );
        driver::start(Driver::new(
            self.tasks,
            Box::new(handler),
            self.abandon,
            span,
        ));
    }
}

impl<T> Series<T>
where
    T: Send + 'static,
{
    /// Append an async task, spawned on the tokio runtime current at the time
    /// of this call.
    pub fn spawn<A>(self, task: A) -> Self
    where
        A: AsyncTask<T>,
    {
        self.task(Spawned::new(task))
    }

    /// Run the series and wait for its outcome.
    ///
    /// Resolves to `Failed(TaskError::Incomplete)` if the series can never
    /// report, which only happens when a task abandons its completion under
    /// [`AbandonPolicy::Stall`].
    pub async fn execute(self) -> AsyncResult<Vec<T>> {
        let (tx, rx) = oneshot::channel();
        self.run(move |outcome| {
            let _ = tx.send(outcome);
        });
        rx.await.unwrap_or(AsyncResult::Failed(TaskError::Incomplete))
    }
}

impl<T> Default for Series<T> {
    fn default() -> Self {
        Self::new()
    }
}
