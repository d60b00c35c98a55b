//! Outcome type passed to every completion callback.
//!
//! An [`AsyncResult`] is either a success payload or a failure cause. The
//! two are mutually exclusive and exhaustive, so accessors for the "wrong"
//! side return `None` instead of panicking.

use super::task::TaskError;

/// Outcome of a task or of a whole series run.
#[derive(Debug)]
pub enum AsyncResult<T> {
    /// The work completed with a value.
    Succeeded(T),
    /// The work failed with a cause.
    Failed(TaskError),
}

impl<T> AsyncResult<T> {
    /// Returns `true` if this is a success.
    pub fn succeeded(&self) -> bool {
        matches!(self, AsyncResult::Succeeded(_))
    }

    /// Returns `true` if this is a failure.
    pub fn failed(&self) -> bool {
        !self.succeeded()
    }

    /// The success value, or `None` on failure.
    pub fn result(&self) -> Option<&T> {
        match self {
            AsyncResult::Succeeded(value) => Some(value),
            AsyncResult::Failed(_) => None,
        }
    }

    /// The failure cause, or `None` on success.
    pub fn cause(&self) -> Option<&TaskError> {
        match self {
            AsyncResult::Succeeded(_) => None,
            AsyncResult::Failed(cause) => Some(cause),
        }
    }

    /// Consume and return the success value, discarding any cause.
    pub fn into_value(self) -> Option<T> {
        match self {
            AsyncResult::Succeeded(value) => Some(value),
            AsyncResult::Failed(_) => None,
        }
    }

    /// Consume and return the failure cause, discarding any value.
    pub fn into_cause(self) -> Option<TaskError> {
        match self {
            AsyncResult::Succeeded(_) => None,
            AsyncResult::Failed(cause) => Some(cause),
        }
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> Result<T, TaskError> {
        self.into()
    }

    /// Transform the success value, leaving a failure untouched.
    pub fn map<U, F>(self, f: F) -> AsyncResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            AsyncResult::Succeeded(value) => AsyncResult::Succeeded(f(value)),
            AsyncResult::Failed(cause) => AsyncResult::Failed(cause),
        }
    }
}

impl<T> From<Result<T, TaskError>> for AsyncResult<T> {
    fn from(result: Result<T, TaskError>) -> Self {
        match result {
            Ok(value) => AsyncResult::Succeeded(value),
            Err(cause) => AsyncResult::Failed(cause),
        }
    }
}

impl<T> From<AsyncResult<T>> for Result<T, TaskError> {
    fn from(outcome: AsyncResult<T>) -> Self {
        match outcome {
            AsyncResult::Succeeded(value) => Ok(value),
            AsyncResult::Failed(cause) => Err(cause),
        }
    }
}
