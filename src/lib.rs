//! Run callback-style tasks one after another and collect their results.
//!
//! A [`Series`] starts each task only after the previous one has reported
//! success. The completion handler receives every value in registration order,
//! or the first failure, exactly once.
//!
//! ```
//! use petit_series::{series, task_fn};
//!
//! series()
//!     .task(task_fn("read", |done| done.succeed(1)))
//!     .task(task_fn("parse", |done| done.succeed(2)))
//!     .run(|outcome| assert_eq!(outcome.into_value(), Some(vec![1, 2])));
//! ```

pub mod config;
pub mod core;
pub mod execution;
pub mod testing;

pub use config::{AbandonPolicy, ConfigError, SeriesConfig};
pub use core::result::AsyncResult;
pub use core::task::{AsyncFn, AsyncTask, Task, TaskError, TaskFn, async_fn, task_fn};
pub use core::types::RunId;
pub use execution::{Completion, Series, Spawned, series};
