// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Spawning and exit status.
//!
//! ```text
//! spawn()
//!   resolve_program()
//!        |
//!        v
//!   build_command()
//!   args, cwd, env, piped stdio, kill_on_drop
//!        |
//!        v
//!   RunningProcess { child, name, command_line }
//! ```

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, trace};

use super::builder::ProcessBuilder;
use crate::error::ProcessError;

/// Which output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    code: Option<i32>,
    interrupted: bool,
}

impl ProcessExit {
    pub(super) const fn new(code: Option<i32>, interrupted: bool) -> Self {
        Self { code, interrupted }
    }

    /// Exit code, `None` if the process died from a signal.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        self.code
    }

    /// Whether the process was killed through cancellation.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Whether the process terminated abnormally on its own.
    #[must_use]
    pub const fn crashed(&self) -> bool {
        self.code.is_none() && !self.interrupted
    }

    /// Returns true if the process exited with code 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0)) && !self.interrupted
    }
}

/// A spawned child process with piped output.
#[derive(Debug)]
pub struct RunningProcess {
    pub(super) child: Child,
    pub(super) name: String,
    pub(super) command_line: String,
}

impl RunningProcess {
    /// OS process id, `None` once the process has been reaped.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Display name of the process.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ProcessBuilder {
    /// Spawns the process with piped stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns a `ProcessError` if the program cannot be resolved or the
    /// spawn fails.
    pub fn spawn(&self) -> Result<RunningProcess, ProcessError> {
        let program = self.resolve_program()?;
        let name = self.display_name();
        let command_line = self.command_line();

        if let Some(cwd) = self.working_dir() {
            debug!(cwd = %cwd.display(), "cd");
        }
        debug!(cmd = %command_line, "exec");

        let child = self
            .build_command(&program)
            .spawn()
            .map_err(|source| ProcessError::spawn_failed(&program, source))?;

        trace!(process = %name, pid = ?child.id(), "spawned");
        Ok(RunningProcess {
            child,
            name,
            command_line,
        })
    }

    /// Builds the tokio Command from this builder's configuration.
    fn build_command(&self, program: &std::path::Path) -> Command {
        let mut command = Command::new(program);
        command.args(self.arguments());

        if let Some(cwd) = self.working_dir() {
            command.current_dir(cwd);
        }
        self.environment().apply_to(&mut command);

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}
