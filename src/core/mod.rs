//! Core building blocks: tasks, outcomes and identifiers.

pub mod result;
pub mod task;
pub mod types;
