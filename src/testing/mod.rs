//! Testing utilities for users of the series library.
//!
//! This module provides fake tasks with observable behaviour and a recorder
//! for completion handlers:
//!
//! - [`SucceedingTask`]: Succeeds immediately with a fixed value
//! - [`FailingTask`]: Fails immediately with a fixed message
//! - [`DeferredTask`]: Parks its completion until the test fires it
//! - [`ThreadedTask`]: Succeeds from a separate thread after a delay
//! - [`AbandoningTask`]: Drops its completion without reporting
//! - [`OutcomeRecorder`]: Captures every outcome a handler receives
//!
//! All fakes are cheap to clone; clones share their counters, so a test can
//! keep one handle and register another with the series.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::result::AsyncResult;
use crate::core::task::{Task, TaskError};
use crate::execution::Completion;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A task that succeeds immediately with a clone of its value.
///
/// # Example
///
/// ```
/// use petit_series::series;
/// use petit_series::testing::{OutcomeRecorder, SucceedingTask};
///
/// let task = SucceedingTask::new("task1", "Task 1");
/// let recorder = OutcomeRecorder::new();
///
/// series().task(task.clone()).run(recorder.handler());
///
/// assert_eq!(task.run_count(), 1);
/// assert_eq!(recorder.single().unwrap().result(), Some(&vec!["Task 1"]));
/// ```
#[derive(Clone)]
pub struct SucceedingTask<T> {
    name: String,
    value: T,
    runs: Arc<AtomicUsize>,
}

impl<T> SucceedingTask<T> {
    /// Create a task that always succeeds with `value`.
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times this task has been run.
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Value reported on success.
    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T> Task<T> for SucceedingTask<T>
where
    T: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, done: Completion<T>) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        done.succeed(self.value.clone());
    }
}

/// A task that fails immediately with [`TaskError::ExecutionFailed`].
///
/// It can stand in for a task of any value type.
#[derive(Clone)]
pub struct FailingTask {
    name: String,
    message: String,
    runs: Arc<AtomicUsize>,
}

impl FailingTask {
    /// Create a task that always fails with `message`.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times this task has been run.
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl<T> Task<T> for FailingTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, done: Completion<T>) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        done.fail(TaskError::ExecutionFailed(self.message.clone()));
    }
}

/// A task that holds on to its completion until the test reports for it.
///
/// Useful for checking that nothing downstream starts while a task is still
/// pending.
pub struct DeferredTask<T> {
    name: String,
    parked: Arc<Mutex<Option<Completion<T>>>>,
    runs: Arc<AtomicUsize>,
}

impl<T> DeferredTask<T> {
    /// Create a deferred task.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parked: Arc::new(Mutex::new(None)),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times this task has been run.
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Check if a completion is waiting to be fired.
    pub fn is_parked(&self) -> bool {
        lock(&self.parked).is_some()
    }

    /// Report success for the parked completion.
    ///
    /// Returns `false` if nothing was parked.
    pub fn succeed(&self, value: T) -> bool {
        self.complete(AsyncResult::Succeeded(value))
    }

    /// Report failure for the parked completion.
    ///
    /// Returns `false` if nothing was parked.
    pub fn fail(&self, cause: TaskError) -> bool {
        self.complete(AsyncResult::Failed(cause))
    }

    fn complete(&self, outcome: AsyncResult<T>) -> bool {
        // Fired outside the lock: the series may run this task again.
        let parked = lock(&self.parked).take();
        match parked {
            Some(done) => {
                done.complete(outcome);
                true
            }
            None => false,
        }
    }
}

impl<T> Clone for DeferredTask<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            parked: Arc::clone(&self.parked),
            runs: Arc::clone(&self.runs),
        }
    }
}

impl<T> Task<T> for DeferredTask<T>
where
    T: Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, done: Completion<T>) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        *lock(&self.parked) = Some(done);
    }
}

/// A task that succeeds from a freshly spawned thread after a delay.
#[derive(Clone)]
pub struct ThreadedTask<T> {
    name: String,
    value: T,
    delay: Duration,
    runs: Arc<AtomicUsize>,
}

impl<T> ThreadedTask<T> {
    /// Create a task that reports `value` from another thread after `delay`.
    pub fn new(name: impl Into<String>, value: T, delay: Duration) -> Self {
        Self {
            name: name.into(),
            value,
            delay,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times this task has been run.
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl<T> Task<T> for ThreadedTask<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, done: Completion<T>) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let value = self.value.clone();
        let delay = self.delay;
        thread::spawn(move || {
            thread::sleep(delay);
            done.succeed(value);
        });
    }
}

/// A task that drops its completion without reporting an outcome.
#[derive(Clone)]
pub struct AbandoningTask {
    name: String,
    runs: Arc<AtomicUsize>,
}

impl AbandoningTask {
    /// Create an abandoning task.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times this task has been run.
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl<T> Task<T> for AbandoningTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, done: Completion<T>) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        drop(done);
    }
}

struct Recorded<T> {
    calls: usize,
    outcomes: Vec<AsyncResult<Vec<T>>>,
}

/// Records the outcomes delivered to completion handlers.
///
/// Each call to [`handler`](Self::handler) yields a fresh handler feeding
/// the same recorder.
pub struct OutcomeRecorder<T> {
    state: Arc<(Mutex<Recorded<T>>, Condvar)>,
}

impl<T> OutcomeRecorder<T> {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            state: Arc::new((
                Mutex::new(Recorded {
                    calls: 0,
                    outcomes: Vec::new(),
                }),
                Condvar::new(),
            )),
        }
    }

    /// Create a completion handler that records into this recorder.
    pub fn handler(&self) -> impl FnOnce(AsyncResult<Vec<T>>) + Send + 'static + use<T>
    where
        T: Send + 'static,
    {
        let state = Arc::clone(&self.state);
        move |outcome| {
            let (recorded, signal) = &*state;
            let mut recorded = lock(recorded);
            recorded.calls += 1;
            recorded.outcomes.push(outcome);
            signal.notify_all();
        }
    }

    /// Get the number of times a handler has been called.
    pub fn call_count(&self) -> usize {
        lock(&self.state.0).calls
    }

    /// Take the outcome if exactly one handler call was recorded.
    pub fn single(&self) -> Option<AsyncResult<Vec<T>>> {
        let mut recorded = lock(&self.state.0);
        if recorded.calls == 1 {
            recorded.outcomes.pop()
        } else {
            None
        }
    }

    /// Take every recorded outcome.
    pub fn take_all(&self) -> Vec<AsyncResult<Vec<T>>> {
        std::mem::take(&mut lock(&self.state.0).outcomes)
    }

    /// Block until at least `calls` handler calls were recorded.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub fn wait_for_calls(&self, calls: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (recorded, signal) = &*self.state;
        let mut guard = lock(recorded);
        while guard.calls < calls {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            guard = signal
                .wait_timeout(guard, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

impl<T> Default for OutcomeRecorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for OutcomeRecorder<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}
