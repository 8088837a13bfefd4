// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Process builder with configuration options.
//!
//! ```text
//! ProcessBuilder
//!  • new/raw
//!  • arg/args/cwd/env/name
//!  • resolve_program (which, honouring the env's PATH and cwd)
//!  • command_line (quoted for display)
//! ```

use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::core::env::Environment;
use crate::error::ProcessError;

/// Builder for configuring and spawning a process.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    /// Path or bare name of the executable
    program: PathBuf,
    /// Command-line arguments
    args: Vec<String>,
    /// Working directory
    cwd: Option<PathBuf>,
    /// Environment changes
    env: Environment,
    /// Display name for logging and messages
    name: Option<String>,
}

impl ProcessBuilder {
    /// Creates a new `ProcessBuilder` for the given program.
    ///
    /// A bare executable name is resolved via PATH when spawned.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
            env: Environment::inherited(),
            name: None,
        }
    }

    /// Creates a `ProcessBuilder` that runs `command` through the shell.
    ///
    /// On Windows, this executes the command via `PowerShell` (`pwsh -NoProfile -Command`).
    /// On Unix, this executes via `/bin/sh -c`.
    pub fn raw(command: impl Into<String>) -> Self {
        let cmd = command.into();
        #[cfg(windows)]
        {
            Self::new("pwsh").args(["-NoProfile", "-NonInteractive", "-Command", cmd.as_str()])
        }
        #[cfg(not(windows))]
        {
            Self::new("/bin/sh").args(["-c", cmd.as_str()])
        }
    }

    /// Adds an argument to the command.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Adds multiple arguments to the command.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string_lossy().into_owned()));
        self
    }

    /// Sets the working directory for the process.
    #[must_use]
    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sets the environment for the process.
    #[must_use]
    pub fn env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Sets a display name for logging.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the program as given.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns the arguments.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Returns the working directory, if set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Returns the environment.
    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.env
    }

    /// Returns the display name for this process.
    ///
    /// Defaults to the program's file stem.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.program.file_stem().map_or_else(
                || "process".to_string(),
                |s| s.to_string_lossy().into_owned(),
            )
        })
    }

    /// Returns the full command line as a string (for display).
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut cmd = self.program.display().to_string();
        for arg in &self.args {
            if arg.contains(' ') {
                let _ = write!(cmd, " \"{arg}\"");
            } else {
                let _ = write!(cmd, " {arg}");
            }
        }
        cmd
    }

    /// Resolves the executable to spawn.
    ///
    /// Paths with a directory component are used as is. Bare names are
    /// looked up in the environment's `PATH`, relative to the working
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::EmptyCommand` for an empty program and
    /// `ProcessError::ExecutableNotFound` if a bare name is not in PATH.
    pub fn resolve_program(&self) -> Result<PathBuf, ProcessError> {
        if self.program.as_os_str().is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        if self.program.components().count() > 1 || self.program.is_absolute() {
            return Ok(self.program.clone());
        }

        let cwd = self
            .cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default();
        let found = match self.env.get("PATH") {
            Some(path) => which::which_in(&self.program, Some(path), cwd),
            None => which::which(&self.program),
        };
        found.map_err(|_| ProcessError::ExecutableNotFound {
            name: self.program.display().to_string(),
        })
    }
}
