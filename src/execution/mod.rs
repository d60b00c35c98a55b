//! Series execution engine.
//!
//! This module runs registered tasks strictly one after another, collects
//! their values in order, and stops at the first failure.

mod driver;
mod series;
mod spawn;

pub use driver::Completion;
pub use series::{Series, series};
pub use spawn::Spawned;
