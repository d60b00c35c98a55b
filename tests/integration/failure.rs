//! Failure handling integration tests.
//!
//! Tests that the first failure ends the series and is reported unchanged.

use petit_series::testing::{DeferredTask, FailingTask, OutcomeRecorder, SucceedingTask};
use petit_series::{Completion, TaskError, series, task_fn};
use std::fmt;

use crate::common::{LoggedTask, RunLog, init_test_logging};

#[derive(Debug)]
struct MigrationError {
    version: u32,
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "migration {} failed", self.version)
    }
}

impl std::error::Error for MigrationError {}

#[test]
fn test_failure_stops_remaining_tasks() {
    init_test_logging();
    let log = RunLog::new();
    let broken = FailingTask::new("open_database", "connection refused");
    let recorder = OutcomeRecorder::new();

    series()
        .task(LoggedTask::new("load_config", &log))
        .task(broken.clone())
        .task(LoggedTask::new("bind_listener", &log))
        .run(recorder.handler());

    assert_eq!(log.entries(), vec!["load_config"]);
    assert_eq!(broken.run_count(), 1);
    assert_eq!(recorder.call_count(), 1);

    let outcome = recorder.single().unwrap();
    assert!(outcome.failed());
    assert!(outcome.result().is_none());
    assert_eq!(
        outcome.cause().unwrap().to_string(),
        "execution failed: connection refused"
    );
}

#[test]
fn test_custom_error_is_downcastable() {
    init_test_logging();
    let recorder = OutcomeRecorder::<()>::new();

    series()
        .task(task_fn("migrate", |done: Completion<()>| {
            let err: Box<dyn std::error::Error + Send + Sync> =
                Box::new(MigrationError { version: 7 });
            done.fail(err);
        }))
        .run(recorder.handler());

    let cause = recorder.single().unwrap().into_cause().unwrap();
    let TaskError::Other(inner) = cause else {
        panic!("expected TaskError::Other");
    };
    let migration = inner.downcast_ref::<MigrationError>().unwrap();
    assert_eq!(migration.version, 7);
}

#[test]
fn test_failure_in_last_task() {
    init_test_logging();
    let first = SucceedingTask::new("first", 1);
    let last = FailingTask::new("last", "nope");
    let recorder = OutcomeRecorder::new();

    series()
        .task(first.clone())
        .task(last.clone())
        .run(recorder.handler());

    assert_eq!(first.run_count(), 1);
    assert_eq!(last.run_count(), 1);
    assert!(recorder.single().unwrap().failed());
}

#[test]
fn test_deferred_failure_skips_downstream() {
    init_test_logging();
    let pending = DeferredTask::<i32>::new("pending");
    let after = SucceedingTask::new("after", 2);
    let recorder = OutcomeRecorder::new();

    series()
        .task(SucceedingTask::new("before", 0))
        .task(pending.clone())
        .task(after.clone())
        .run(recorder.handler());

    assert!(pending.is_parked());
    assert_eq!(recorder.call_count(), 0);

    pending.fail(TaskError::ExecutionFailed("timed out".to_string()));

    assert_eq!(after.run_count(), 0);
    assert_eq!(recorder.call_count(), 1);
    assert!(matches!(
        recorder.single().unwrap().into_cause(),
        Some(TaskError::ExecutionFailed(msg)) if msg == "timed out"
    ));
}

#[tokio::test]
async fn test_execute_returns_first_failure() {
    init_test_logging();

    let outcome = series::<u8>()
        .task(FailingTask::new("a", "first"))
        .task(FailingTask::new("b", "second"))
        .execute()
        .await;

    assert_eq!(
        outcome.into_result().unwrap_err().to_string(),
        "execution failed: first"
    );
}
