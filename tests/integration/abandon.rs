//! Abandoned completion integration tests.
//!
//! Tests that a task dropping its completion without reporting is handled
//! according to the configured policy.

use petit_series::testing::{AbandoningTask, OutcomeRecorder, SucceedingTask};
use petit_series::{AbandonPolicy, Completion, Series, SeriesConfig, TaskError, series, task_fn};
use std::thread;
use std::time::Duration;

use crate::common::init_test_logging;

#[test]
fn test_abandon_fails_series_by_default() {
    init_test_logging();
    let dropper = AbandoningTask::new("forgetful");
    let after = SucceedingTask::new("after", 1);
    let recorder = OutcomeRecorder::new();

    series()
        .task(SucceedingTask::new("before", 0))
        .task(dropper.clone())
        .task(after.clone())
        .run(recorder.handler());

    assert_eq!(dropper.run_count(), 1);
    assert_eq!(after.run_count(), 0);
    assert_eq!(recorder.call_count(), 1);

    match recorder.single().unwrap().into_cause() {
        Some(TaskError::Abandoned { index, task }) => {
            assert_eq!(index, 1);
            assert_eq!(task, "forgetful");
        }
        other => panic!("expected Abandoned, got {:?}", other),
    }
}

#[test]
fn test_abandon_on_other_thread_fails_series() {
    init_test_logging();
    let recorder = OutcomeRecorder::<u8>::new();

    series()
        .task(task_fn("lost", |done: Completion<u8>| {
            thread::spawn(move || drop(done));
        }))
        .run(recorder.handler());

    assert!(recorder.wait_for_calls(1, Duration::from_secs(10)));
    let cause = recorder.single().unwrap().into_cause().unwrap();
    assert!(cause.is_protocol_violation());
}

#[test]
fn test_stall_policy_from_config() {
    init_test_logging();
    let config = SeriesConfig::from_yaml("abandon: stall").unwrap();
    let after = SucceedingTask::new("after", 1);
    let recorder = OutcomeRecorder::new();

    Series::with_config(config)
        .task(AbandoningTask::new("forgetful"))
        .task(after.clone())
        .run(recorder.handler());

    assert_eq!(after.run_count(), 0);
    assert_eq!(recorder.call_count(), 0);
}

#[tokio::test]
async fn test_stalled_execute_resolves_incomplete() {
    init_test_logging();

    let outcome = series::<u8>()
        .on_abandon(AbandonPolicy::Stall)
        .task(AbandoningTask::new("forgetful"))
        .execute()
        .await;

    assert!(matches!(outcome.into_cause(), Some(TaskError::Incomplete)));
}
