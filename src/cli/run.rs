// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! `run` command arguments.
//!
//! ```text
//! runctl run --pre-launch "make" --stop-timeout 2000 -- ./app --flag
//!            \_____ start dependency ____/            \__ main worker __/
//! ```

use clap::Args;
use std::path::PathBuf;

use crate::config::types::SessionConfig;

/// Arguments for the `run` command.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Run mode id used to select the worker factory.
    #[arg(short = 'm', long = "mode", value_name = "ID")]
    pub mode: Option<String>,

    /// Device type id used to select the worker factory.
    #[arg(short = 'd', long = "device", value_name = "TYPE")]
    pub device: Option<String>,

    /// Working directory of the program.
    #[arg(long = "cwd", value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Sets an environment variable for the program. Can be repeated.
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_env_assignment, action = clap::ArgAction::Append)]
    pub env: Vec<(String, String)>,

    /// Starts the program with an empty environment.
    #[arg(long = "clean-env")]
    pub clean_env: bool,

    /// Shell command that must complete before the program starts. Can be repeated.
    #[arg(long = "pre-launch", value_name = "CMD", action = clap::ArgAction::Append)]
    pub pre_launch: Vec<String>,

    /// Start watchdog in milliseconds (0 disables).
    #[arg(long = "start-timeout", value_name = "MS")]
    pub start_timeout: Option<u64>,

    /// Stop watchdog in milliseconds (0 disables).
    #[arg(long = "stop-timeout", value_name = "MS")]
    pub stop_timeout: Option<u64>,

    /// Number of runs; later runs re-start the same session.
    #[arg(short = 'r', long = "repeat", value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: Option<u32>,

    /// Display name of the session.
    #[arg(short = 'n', long = "name", value_name = "NAME")]
    pub name: Option<String>,

    /// Keeps the session running when the program exits while pre-launch
    /// helpers are still active.
    #[arg(long = "non-essential")]
    pub non_essential: bool,

    /// Program to run, followed by its arguments.
    #[arg(
        value_name = "PROGRAM",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl RunArgs {
    /// The program to run.
    #[must_use]
    pub fn program(&self) -> &str {
        self.command.first().map_or("", String::as_str)
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }

    /// Applies the flags given on the command line on top of `session`.
    pub fn apply_to(&self, session: &mut SessionConfig) {
        if let Some(mode) = &self.mode {
            session.run_mode.clone_from(mode);
        }
        if let Some(device) = &self.device {
            session.device_type.clone_from(device);
        }
        if let Some(ms) = self.start_timeout {
            session.start_timeout_ms = ms;
        }
        if let Some(ms) = self.stop_timeout {
            session.stop_timeout_ms = ms;
        }
        if let Some(repeat) = self.repeat {
            session.repeat = repeat;
        }
        if self.non_essential {
            session.essential_main_worker = false;
        }
    }
}

/// Parses `KEY=VALUE`. The value may be empty, the key may not.
///
/// # Errors
///
/// Returns a message when `=` is missing or the key is empty.
pub fn parse_env_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        Some(_) => Err(format!("empty variable name in '{s}'")),
        None => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}
