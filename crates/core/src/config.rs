// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler configuration
//!
//! Loaded from TOML. Durations use humantime notation (`"100ms"`, `"5m"`).
//!
//! ```toml
//! min_check_delay = "250ms"
//! max_check_delay = "1m"
//! max_resends = 3
//! max_batch_size = 50
//! read_operation = "fetch"
//! ```

use crate::calculator::CheckBounds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for the scheduler and client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Lower clamp for the delay between checks
    #[serde(with = "humantime_serde")]
    pub min_check_delay: Duration,
    /// Delay used when nothing is due sooner
    #[serde(with = "humantime_serde")]
    pub max_check_delay: Duration,
    /// Resends allowed after the first send times out; unbounded when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_resends: Option<u32>,
    /// Keys per operation call; larger batches are split
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<usize>,
    /// Operation used for requirement-driven reads
    pub read_operation: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let bounds = CheckBounds::default();
        Self {
            min_check_delay: bounds.min,
            max_check_delay: bounds.max,
            max_resends: None,
            max_batch_size: None,
            read_operation: "read".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded scheduler config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_check_delay > self.max_check_delay {
            return Err(ConfigError::Invalid(format!(
                "min_check_delay ({:?}) exceeds max_check_delay ({:?})",
                self.min_check_delay, self.max_check_delay
            )));
        }
        if self.max_batch_size == Some(0) {
            return Err(ConfigError::Invalid(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        if self.read_operation.is_empty() {
            return Err(ConfigError::Invalid(
                "read_operation must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_bounds(&self) -> CheckBounds {
        CheckBounds {
            min: self.min_check_delay,
            max: self.max_check_delay,
        }
    }

    /// Whether a record sent `attempts` times may go out again
    pub fn allows_resend(&self, attempts: u32) -> bool {
        self.max_resends
            .map_or(true, |cap| attempts.saturating_sub(1) < cap)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
