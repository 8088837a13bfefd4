// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration management for runctl.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! Priority (low -> high)
//! 1. defaults
//! 2. runctl.toml (cwd, optional)
//! 3. --config (repeatable)
//! 4. RUNCTL_* env vars
//! 5. CLI overrides
//! ```
//!
//! # Environment Variable Mapping
//!
//! ```text
//! RUNCTL_GLOBAL__STATE_TRACE=true       -> global.state_trace = true
//! RUNCTL_SESSION__STOP_TIMEOUT_MS=1000  -> session.stop_timeout_ms = 1000
//! RUNCTL_SESSION__DEVICE_TYPE=Desktop   -> session.device_type = "Desktop"
//! ```

pub mod loader;
pub mod types;


use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

use loader::ConfigLoader;
use types::{GlobalConfig, SessionConfig};

/// Name of the optional configuration file looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = "runctl.toml";

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "RUNCTL";

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Global options.
    pub global: GlobalConfig,
    /// Session defaults.
    pub session: SessionConfig,
}

impl Config {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use runctl::config::Config;
    ///
    /// let config = Config::builder()
    ///     .add_toml_file_optional("runctl.toml")
    ///     .with_env_prefix("RUNCTL")
    ///     .build()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn builder() -> ConfigLoader {
        ConfigLoader::new()
    }

    /// Load configuration from a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// does not match the `Config` structure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().add_toml_file(path).build()
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML or does not match the
    /// `Config` structure.
    pub fn parse(content: &str) -> Result<Self> {
        Self::builder().add_toml_str(content).build()
    }

    /// Validate values the type system does not cover.
    ///
    /// # Errors
    ///
    /// Returns the first invalid `[session]` value.
    pub fn validate(&self) -> Result<()> {
        self.session.validate()?;
        Ok(())
    }

    /// Format configuration options for display.
    ///
    /// One `key = value` line per option, sorted by key, values aligned.
    #[must_use]
    pub fn format_options(&self) -> Vec<String> {
        let mut options = BTreeMap::new();
        self.format_global_options(&mut options);
        self.format_session_options(&mut options);

        let max_key_len = options.keys().map(String::len).max().unwrap_or(0);

        options
            .into_iter()
            .map(|(key, value)| format!("{key:<max_key_len$} = {value}"))
            .collect()
    }

    fn format_global_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "global.output_log_level".into(),
            self.global.output_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.file_log_level".into(),
            self.global.file_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.log_file".into(),
            self.global
                .log_file
                .as_ref()
                .map_or_else(String::new, |p| p.display().to_string()),
        );
        options.insert(
            "global.state_trace".into(),
            self.global.state_trace.to_string(),
        );
    }

    fn format_session_options(&self, options: &mut BTreeMap<String, String>) {
        let s = &self.session;
        options.insert("session.run_mode".into(), s.run_mode.clone());
        options.insert("session.device_type".into(), s.device_type.clone());
        options.insert(
            "session.start_timeout_ms".into(),
            s.start_timeout_ms.to_string(),
        );
        options.insert(
            "session.stop_timeout_ms".into(),
            s.stop_timeout_ms.to_string(),
        );
        options.insert(
            "session.essential_main_worker".into(),
            s.essential_main_worker.to_string(),
        );
        options.insert("session.repeat".into(), s.repeat.to_string());
    }
}
