//! Bridge from [`AsyncTask`] to the callback-style [`Task`].

use std::any::Any;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use crate::core::task::{AsyncTask, Task, TaskError};

use super::driver::Completion;

/// Runs an [`AsyncTask`] on a tokio runtime and reports its result to the
/// series.
///
/// A panic inside the task is reported as [`TaskError::Panicked`] and a task
/// cancelled by the runtime as [`TaskError::Aborted`]. A task created outside
/// of any runtime fails with [`TaskError::NoRuntime`] when run.
pub struct Spawned<A> {
    task: Arc<A>,
    handle: Option<Handle>,
}

impl<A> Spawned<A> {
    /// Wrap `task`, capturing the runtime current at the time of the call.
    pub fn new(task: A) -> Self {
        Self {
            task: Arc::new(task),
            handle: Handle::try_current().ok(),
        }
    }

    /// Wrap `task` to run on the given runtime.
    pub fn on(handle: Handle, task: A) -> Self {
        Self {
            task: Arc::new(task),
            handle: Some(handle),
        }
    }
}

impl<T, A> Task<T> for Spawned<A>
where
    T: Send + 'static,
    A: AsyncTask<T>,
{
    fn name(&self) -> &str {
        AsyncTask::<T>::name(&*self.task)
    }

    fn run(&self, done: Completion<T>) {
        let Some(handle) = &self.handle else {
            done.fail(TaskError::NoRuntime);
            return;
        };

        let task = Arc::clone(&self.task);
        let join = handle.spawn(async move { AsyncTask::<T>::execute(&*task).await });

        let guard = AbortOnDrop(Some(done));
        handle.spawn(async move {
            let result = match join.await {
                Ok(result) => result,
                Err(err) if err.is_panic() => {
                    Err(TaskError::Panicked(panic_message(err.into_panic())))
                }
                Err(err) => {
                    debug!(error = %err, "async task cancelled");
                    Err(TaskError::Aborted)
                }
            };
            guard.complete_result(result);
        });
    }
}

/// Owns a completion inside the watcher future. Reports `Aborted` if the
/// runtime drops the watcher before the task finished.
struct AbortOnDrop<T>(Option<Completion<T>>);

impl<T> AbortOnDrop<T> {
    fn complete_result(mut self, result: Result<T, TaskError>) {
        if let Some(done) = self.0.take() {
            done.complete_result(result);
        }
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        if let Some(done) = self.0.take() {
            debug!(index = done.index(), "async task dropped by its runtime");
            done.fail(TaskError::Aborted);
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
