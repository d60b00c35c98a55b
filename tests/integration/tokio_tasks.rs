//! Async task integration tests.
//!
//! Tests that async tasks spawned on a tokio runtime feed the series like
//! callback tasks do.

use async_trait::async_trait;
use petit_series::testing::SucceedingTask;
use petit_series::{AsyncTask, Spawned, TaskError, async_fn, series};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::common::init_test_logging;

/// Async task that appends its name to a shared log after sleeping.
struct Step {
    name: String,
    delay: Duration,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl AsyncTask<usize> for Step {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<usize, TaskError> {
        tokio::time::sleep(self.delay).await;
        let mut log = self.log.lock().await;
        log.push(self.name.clone());
        Ok(log.len())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_steps_run_sequentially() {
    init_test_logging();
    let log = Arc::new(Mutex::new(Vec::new()));
    let step = |name: &str, ms: u64| Step {
        name: name.to_string(),
        delay: Duration::from_millis(ms),
        log: Arc::clone(&log),
    };

    let outcome = series()
        .spawn(step("download", 20))
        .spawn(step("verify", 5))
        .spawn(step("install", 1))
        .execute()
        .await;

    assert_eq!(outcome.into_value(), Some(vec![1, 2, 3]));
    assert_eq!(*log.lock().await, vec!["download", "verify", "install"]);
}

#[tokio::test]
async fn test_async_and_callback_tasks_mix() {
    init_test_logging();

    let outcome = series()
        .task(SucceedingTask::new("sync", 1u64))
        .spawn(async_fn("async", || async { Ok(2u64) }))
        .task(SucceedingTask::new("sync_again", 3u64))
        .execute()
        .await;

    assert_eq!(outcome.into_value(), Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn test_async_failure_short_circuits() {
    init_test_logging();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);

    let outcome = series::<u8>()
        .spawn(async_fn("fails", || async {
            Err(TaskError::ExecutionFailed("disk full".to_string()))
        }))
        .spawn(async_fn("never", move || {
            counted.fetch_add(1, Ordering::SeqCst);
            async { Ok(1) }
        }))
        .execute()
        .await;

    assert!(outcome.failed());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_async_tasks_with_paused_clock() {
    init_test_logging();

    let outcome = series()
        .spawn(async_fn("wait_a", || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok('a')
        }))
        .spawn(async_fn("wait_b", || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok('b')
        }))
        .execute()
        .await;

    assert_eq!(outcome.into_value(), Some(vec!['a', 'b']));
}

#[test]
fn test_spawned_on_background_runtime() {
    init_test_logging();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let handle = runtime.handle().clone();

    let outcome = runtime.block_on(async move {
        series()
            .task(Spawned::on(
                handle,
                async_fn("remote", || async {
                    tokio::task::yield_now().await;
                    Ok(String::from("ok"))
                }),
            ))
            .execute()
            .await
    });

    assert_eq!(outcome.into_value(), Some(vec![String::from("ok")]));
}
