//! Configuration loading and parsing.
//!
//! This module provides YAML-based settings for a series.

mod error;
mod yaml;

pub use error::ConfigError;
pub use yaml::{AbandonPolicy, SeriesConfig};
