//! Task traits and error types.
//!
//! A [`Task`] is the unit of work a series runs. It receives a one-shot
//! [`Completion`] and must report exactly one outcome through it, either
//! before `run` returns or later from any thread.
//!
//! [`AsyncTask`] is the `async fn` flavour; it is bridged onto a tokio
//! runtime by [`Spawned`](crate::execution::Spawned).

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::execution::Completion;

/// Errors a task can report, plus the failure kinds the series itself
/// produces.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task execution failed with a message.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The task dropped its completion without reporting an outcome.
    #[error("task {index} ('{task}') dropped its completion without reporting an outcome")]
    Abandoned { index: usize, task: String },

    /// An async task panicked while running on the runtime.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The runtime aborted an async task before it finished.
    #[error("task was aborted by the runtime")]
    Aborted,

    /// An async task was registered outside of a tokio runtime.
    #[error("no tokio runtime available to run the task")]
    NoRuntime,

    /// The series was dropped before its completion handler could fire.
    #[error("series ended without reporting an outcome")]
    Incomplete,

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    /// Check if this error reports a task breaking the completion contract
    /// rather than a failure of the work itself.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, TaskError::Abandoned { .. })
    }
}

/// A unit of work that reports its outcome through a callback.
///
/// # Example
///
/// ```
/// use petit_series::{Completion, Task};
///
/// struct LoadConfig;
///
/// impl Task<String> for LoadConfig {
///     fn name(&self) -> &str {
///         "load_config"
///     }
///
///     fn run(&self, done: Completion<String>) {
///         done.succeed("debug = true".to_string());
///     }
/// }
/// ```
pub trait Task<T>: Send + Sync {
    /// Name used in logs and protocol-violation errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Start the work. `done` must be completed exactly once.
    fn run(&self, done: Completion<T>);
}

impl<T, S> Task<T> for Arc<S>
where
    S: Task<T> + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, done: Completion<T>) {
        (**self).run(done)
    }
}

impl<T, S> Task<T> for Box<S>
where
    S: Task<T> + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, done: Completion<T>) {
        (**self).run(done)
    }
}

/// A [`Task`] backed by a closure. Created with [`task_fn`].
pub struct TaskFn<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a task.
///
/// ```
/// use petit_series::{series, task_fn};
///
/// series()
///     .task(task_fn("connect", |done| done.succeed(8080)))
///     .run(|outcome| assert_eq!(outcome.result(), Some(&vec![8080])));
/// ```
pub fn task_fn<T, F>(name: impl Into<String>, f: F) -> TaskFn<F>
where
    F: Fn(Completion<T>) + Send + Sync,
{
    TaskFn {
        name: name.into(),
        f,
    }
}

impl<T, F> Task<T> for TaskFn<F>
where
    F: Fn(Completion<T>) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, done: Completion<T>) {
        (self.f)(done)
    }
}

/// A unit of work written as an `async fn`.
///
/// # Example
///
/// ```ignore
/// use petit_series::{AsyncTask, TaskError};
/// use async_trait::async_trait;
///
/// struct Connect {
///     addr: String,
/// }
///
/// #[async_trait]
/// impl AsyncTask<u16> for Connect {
///     fn name(&self) -> &str {
///         "connect"
///     }
///
///     async fn execute(&self) -> Result<u16, TaskError> {
///         let port = self.addr.rsplit(':').next().unwrap_or("80");
///         port.parse().map_err(|e| TaskError::Other(Box::new(e)))
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncTask<T>: Send + Sync + 'static {
    /// Name used in logs and protocol-violation errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Run the work to completion.
    async fn execute(&self) -> Result<T, TaskError>;
}

/// An [`AsyncTask`] backed by a closure returning a future. Created with
/// [`async_fn`].
pub struct AsyncFn<F> {
    name: String,
    f: F,
}

/// Wrap a future-producing closure as an async task.
pub fn async_fn<T, F, Fut>(name: impl Into<String>, f: F) -> AsyncFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
{
    AsyncFn {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<T, F, Fut> AsyncTask<T> for AsyncFn<F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<T, TaskError> {
        (self.f)().await
    }
}
