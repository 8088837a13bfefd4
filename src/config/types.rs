// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration sections.
//!
//! ```text
//! Config: GlobalConfig  [global]   logging
//!         SessionConfig [session]  run mode, device, watchdogs, repeat
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::logging::LogLevel;
use crate::run::ids::{DESKTOP_DEVICE_TYPE, NORMAL_RUN_MODE};

/// Global configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Log level for console output (0-6).
    pub output_log_level: LogLevel,
    /// Log level for file output (0-6).
    pub file_log_level: LogLevel,
    /// Path to log file. No file logging when unset.
    pub log_file: Option<PathBuf>,
    /// Trace state machine transitions regardless of the console level.
    pub state_trace: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            output_log_level: LogLevel::INFO,
            file_log_level: LogLevel::TRACE,
            log_file: None,
            state_trace: false,
        }
    }
}

/// Defaults for sessions started by `runctl run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Run mode used for factory matching.
    pub run_mode: String,
    /// Device type used for factory matching.
    pub device_type: String,
    /// Start watchdog for the main worker, in milliseconds. 0 disables it.
    pub start_timeout_ms: u64,
    /// Stop watchdog for the main worker, in milliseconds. 0 disables it.
    pub stop_timeout_ms: u64,
    /// Whether the main worker's stop ends the whole session.
    pub essential_main_worker: bool,
    /// Number of runs. Runs after the first re-start the same session.
    pub repeat: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            run_mode: NORMAL_RUN_MODE.to_string(),
            device_type: DESKTOP_DEVICE_TYPE.to_string(),
            start_timeout_ms: 0,
            stop_timeout_ms: 5000,
            essential_main_worker: true,
            repeat: 1,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub const fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Checks values serde cannot reject on its own.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an empty run mode or a zero
    /// repeat count.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.run_mode.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                section: "session".to_string(),
                key: "run_mode".to_string(),
                message: "run mode must not be empty".to_string(),
            });
        }
        if self.repeat == 0 {
            return Err(ConfigError::InvalidValue {
                section: "session".to_string(),
                key: "repeat".to_string(),
                message: "repeat must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
