//! YAML configuration parsing.
//!
//! A series can be labelled and told how to treat a task that drops its
//! completion without reporting:
//!
//! ```yaml
//! name: startup
//! abandon: fail   # or: stall
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::ConfigError;

/// What a series does when a task drops its [`Completion`] unfired.
///
/// [`Completion`]: crate::execution::Completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonPolicy {
    /// Fail the series with [`TaskError::Abandoned`](crate::TaskError::Abandoned).
    #[default]
    Fail,

    /// Leave the series stalled. The handler is dropped without being called.
    Stall,
}

/// Settings applied to a series before it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeriesConfig {
    /// Label recorded on the run's tracing span.
    pub name: Option<String>,
    /// Handling of abandoned completions.
    pub abandon: AbandonPolicy,
}

impl SeriesConfig {
    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: SeriesConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::FileReadError {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let config: SeriesConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::YamlFileError {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "series name must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}
