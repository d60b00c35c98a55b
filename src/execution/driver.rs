//! Series execution driver.
//!
//! The driver walks the registered tasks one at a time. It is a trampoline:
//! a completion that fires while the task's `run` call is still on the stack
//! is parked and picked up by the dispatch loop, and a completion that fires
//! later resumes the loop on whichever thread delivered it. Either way the
//! stack depth stays constant no matter how long the series is.
//!
//! Driver state sits behind a mutex that is never held while user code
//! (a task's `run` or the completion handler) executes.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{Span, debug, warn};

use crate::config::AbandonPolicy;
use crate::core::result::AsyncResult;
use crate::core::task::{Task, TaskError};

/// Callback receiving the final outcome of a series.
pub(crate) type Handler<T> = Box<dyn FnOnce(AsyncResult<Vec<T>>) + Send>;

type Shared<T> = Arc<Mutex<Driver<T>>>;

enum Phase<T> {
    /// A task's `run` is on the stack. An outcome delivered now is parked.
    Dispatching(Option<AsyncResult<T>>),
    /// Waiting for a completion from outside the dispatch loop.
    Suspended,
    Finished,
}

/// What the dispatch loop does next, decided under the lock and carried
/// out after releasing it.
enum Next<T> {
    Dispatch(Arc<dyn Task<T>>, usize),
    Finish(Handler<T>, AsyncResult<Vec<T>>),
    Idle,
}

/// State of one in-flight series run.
pub(crate) struct Driver<T> {
    tasks: Vec<Arc<dyn Task<T>>>,
    results: Vec<T>,
    index: usize,
    phase: Phase<T>,
    handler: Option<Handler<T>>,
    abandon: AbandonPolicy,
    span: Span,
    started: Instant,
}

impl<T> Driver<T> {
    pub(crate) fn new(
        tasks: Vec<Arc<dyn Task<T>>>,
        handler: Handler<T>,
        abandon: AbandonPolicy,
        span: Span,
    ) -> Self {
        let capacity = tasks.len();
        Self {
            tasks,
            results: Vec::with_capacity(capacity),
            index: 0,
            phase: Phase::Suspended,
            handler: Some(handler),
            abandon,
            span,
            started: Instant::now(),
        }
    }

    /// Start the task at the cursor, or finish if none is left.
    fn next(&mut self) -> Next<T> {
        match self.tasks.get(self.index) {
            Some(task) => {
                self.phase = Phase::Dispatching(None);
                Next::Dispatch(Arc::clone(task), self.index)
            }
            None => {
                let results = mem::take(&mut self.results);
                self.finish(AsyncResult::Succeeded(results))
            }
        }
    }

    /// Fold the current task's outcome into the run.
    fn settle(&mut self, outcome: AsyncResult<T>) -> Next<T> {
        match outcome {
            AsyncResult::Succeeded(value) => {
                debug!(parent: &self.span, index = self.index, "task succeeded");
                self.results.push(value);
                self.index += 1;
                self.next()
            }
            AsyncResult::Failed(cause) => {
                debug!(
                    parent: &self.span,
                    index = self.index,
                    error = %cause,
                    skipped = self.tasks.len() - self.index - 1,
                    "task failed"
                );
                self.results.clear();
                self.finish(AsyncResult::Failed(cause))
            }
        }
    }

    fn finish(&mut self, outcome: AsyncResult<Vec<T>>) -> Next<T> {
        self.phase = Phase::Finished;
        self.tasks.clear();
        debug!(
            parent: &self.span,
            success = outcome.succeeded(),
            results = outcome.result().map_or(0, Vec::len),
            duration_ms = %self.started.elapsed().as_millis(),
            "series finished"
        );
        match self.handler.take() {
            Some(handler) => Next::Finish(handler, outcome),
            None => Next::Idle,
        }
    }

    fn task_name(&self, index: usize) -> String {
        self.tasks
            .get(index)
            .map(|task| task.name().to_string())
            .unwrap_or_default()
    }
}

fn lock<T>(shared: &Shared<T>) -> MutexGuard<'_, Driver<T>> {
    // State is only mutated between user callbacks, so a poisoned lock still
    // holds a consistent driver.
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Begin executing a series.
pub(crate) fn start<T>(driver: Driver<T>) {
    debug!(parent: &driver.span, task_count = driver.tasks.len(), "series started");
    let shared = Arc::new(Mutex::new(driver));
    let next = lock(&shared).next();
    drive(&shared, next);
}

fn drive<T>(shared: &Shared<T>, mut next: Next<T>) {
    let span = lock(shared).span.clone();
    let _entered = span.enter();

    loop {
        match next {
            Next::Dispatch(task, index) => {
                debug!(index, task = task.name(), "dispatching task");
                task.run(Completion::new(Arc::clone(shared), index));

                let mut guard = lock(shared);
                let driver = &mut *guard;
                next = match mem::replace(&mut driver.phase, Phase::Suspended) {
                    Phase::Dispatching(Some(outcome)) => driver.settle(outcome),
                    Phase::Dispatching(None) => {
                        debug!(index, "task pending, suspending series");
                        return;
                    }
                    // Only this loop moves the phase on while `run` is on the stack.
                    other => {
                        debug_assert!(false, "phase changed during dispatch of task {index}");
                        driver.phase = other;
                        return;
                    }
                };
            }
            Next::Finish(handler, outcome) => {
                handler(outcome);
                return;
            }
            Next::Idle => return,
        }
    }
}

fn deliver<T>(shared: &Shared<T>, index: usize, outcome: AsyncResult<T>) {
    let next = {
        let mut guard = lock(shared);
        let driver = &mut *guard;
        let outcome = match &mut driver.phase {
            Phase::Dispatching(slot @ None) => {
                *slot = Some(outcome);
                return;
            }
            Phase::Suspended => outcome,
            // Each completion reports at most once.
            Phase::Dispatching(Some(_)) | Phase::Finished => {
                debug_assert!(false, "second outcome delivered for task {index}");
                warn!(parent: &driver.span, index, "late completion ignored");
                return;
            }
        };
        driver.settle(outcome)
    };
    drive(shared, next);
}

fn abandon<T>(shared: &Shared<T>, index: usize) {
    let (policy, task, span) = {
        let driver = lock(shared);
        (driver.abandon, driver.task_name(index), driver.span.clone())
    };
    warn!(
        parent: &span,
        index,
        task = %task,
        policy = ?policy,
        "task dropped its completion without reporting an outcome"
    );
    match policy {
        AbandonPolicy::Fail => deliver(
            shared,
            index,
            AsyncResult::Failed(TaskError::Abandoned { index, task }),
        ),
        AbandonPolicy::Stall => {}
    }
}

/// One-shot callback handed to a [`Task`].
///
/// Every reporting method consumes the completion, so a task cannot report
/// twice. Dropping a completion without reporting is handled according to
/// the series' [`AbandonPolicy`].
///
/// `Completion<T>` is `Send` whenever `T` is, so it can be moved to another
/// thread or runtime and fired from there.
pub struct Completion<T> {
    shared: Option<Shared<T>>,
    index: usize,
}

impl<T> Completion<T> {
    fn new(shared: Shared<T>, index: usize) -> Self {
        Self {
            shared: Some(shared),
            index,
        }
    }

    /// Position of the task this completion belongs to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Report success.
    pub fn succeed(self, value: T) {
        self.complete(AsyncResult::Succeeded(value));
    }

    /// Report failure.
    pub fn fail(self, cause: impl Into<TaskError>) {
        self.complete(AsyncResult::Failed(cause.into()));
    }

    /// Report the outcome of a fallible computation.
    pub fn complete_result(self, result: Result<T, TaskError>) {
        self.complete(result.into());
    }

    /// Report an outcome.
    pub fn complete(mut self, outcome: AsyncResult<T>) {
        if let Some(shared) = self.shared.take() {
            deliver(&shared, self.index, outcome);
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            abandon(&shared, self.index);
        }
    }
}

impl<T> std::fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("index", &self.index)
            .field("pending", &self.shared.is_some())
            .finish()
    }
}
