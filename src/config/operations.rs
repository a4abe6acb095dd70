//! Config loading, validation, and derived values.

use super::model::Config;
use crate::error::{Result, StatelockError};
use crate::locks::Backoff;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            StatelockError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path`, falling back to defaults if the file is missing.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit, not a mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml).map_err(|e| {
            StatelockError::UserError(format!("failed to parse config YAML: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            StatelockError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values.
    ///
    /// - `state_file` must be non-empty
    /// - `backoff_initial_ms` must be positive
    /// - `backoff_max_ms` must be at least `backoff_initial_ms`
    pub fn validate(&self) -> Result<()> {
        if self.state_file.trim().is_empty() {
            return Err(StatelockError::UserError(
                "config validation failed: state_file must not be empty".to_string(),
            ));
        }

        if self.backoff_initial_ms == 0 {
            return Err(StatelockError::UserError(
                "config validation failed: backoff_initial_ms must be greater than 0".to_string(),
            ));
        }

        if self.backoff_max_ms < self.backoff_initial_ms {
            return Err(StatelockError::UserError(format!(
                "config validation failed: backoff_max_ms ({}) must be at least backoff_initial_ms ({})",
                self.backoff_max_ms, self.backoff_initial_ms
            )));
        }

        Ok(())
    }

    /// The lock retry window.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// The backoff between lock attempts.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.backoff_initial_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }
}
