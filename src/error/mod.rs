// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error handling module.
//!
//! ```text
//!               RunError (~24 bytes)
//!                      |
//!   +--------+-------+-+------+--------+-----+-------+
//!   v        v       v        v        v     v       v
//! Session  Worker  Registry  Config  Process Io    Other
//!   Box     Box      Box      Box     Box    Box  Box<str>
//!
//! Sub-errors (unboxed internally):
//!   Session   StartupAborted, ReRunNotSupported, Finished
//!   Worker    UnknownWorker, DependencyCycle
//!   Registry  NoMatchingFactory, AmbiguousFactories, ProducerFailed
//!   Config    ParseError, MissingKey, InvalidValue
//!   Process   EmptyCommand, ExecutableNotFound, SpawnFailed, Wait
//!
//! All variants boxed => RunError fits in 24 bytes.
//! ```

use std::path::Path;

use thiserror::Error;

/// Convenience alias for `anyhow::Result`.
pub type Result<T> = anyhow::Result<T>;

/// Result type using [`RunError`].
pub type RunResult<T> = std::result::Result<T, RunError>;

/// Top-level library error type.
///
/// All sub-errors are boxed to keep this enum at ~24 bytes on the stack.
#[derive(Debug, Error)]
pub enum RunError {
    /// Run session lifecycle error.
    #[error("session error: {0}")]
    Session(#[from] Box<SessionError>),

    /// Worker graph error.
    #[error("worker error: {0}")]
    Worker(#[from] Box<WorkerError>),

    /// Worker factory lookup error.
    #[error("registry error: {0}")]
    Registry(#[from] Box<RegistryError>),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] Box<ConfigError>),

    /// Process launch error.
    #[error("process error: {0}")]
    Process(#[from] Box<ProcessError>),

    /// I/O error.
    #[error("io error: {0}")]
    Io(Box<std::io::Error>),

    /// Generic error with message.
    #[error("{0}")]
    Other(Box<str>),
}

impl RunError {
    /// Creates a generic [`RunError::Other`].
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into().into_boxed_str())
    }
}

/// Macro to generate `From` implementations that box the source error.
macro_rules! impl_from_boxed {
    ($($error:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$error> for RunError {
                fn from(err: $error) -> Self {
                    RunError::$variant(Box::new(err))
                }
            }
        )+
    };
}

impl_from_boxed! {
    SessionError => Session,
    WorkerError => Worker,
    RegistryError => Registry,
    ConfigError => Config,
    ProcessError => Process,
    std::io::Error => Io,
}

// --- Session Errors ---

/// Run session lifecycle errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A worker failed before the session was started.
    #[error("failure during startup, aborting: {message}")]
    StartupAborted { message: String },

    /// Re-run requested but a worker cannot be restarted or is not done.
    #[error("session does not support re-running in its current state")]
    ReRunNotSupported,

    /// The session already reached its terminal state.
    #[error("session is finished")]
    Finished,
}

// --- Worker Errors ---

/// Worker graph errors.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Worker id does not belong to this session.
    #[error("unknown worker #{index}")]
    UnknownWorker { index: usize },

    /// The dependency edge would close a cycle.
    #[error("dependency of '{worker}' on '{dependency}' would create a cycle")]
    DependencyCycle { worker: String, dependency: String },
}

// --- Registry Errors ---

/// Worker factory lookup errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No factory feels responsible for this combination.
    #[error(
        "no worker factory for run mode '{run_mode}', device type '{device_type}', run configuration '{run_config}'"
    )]
    NoMatchingFactory {
        run_mode: String,
        device_type: String,
        run_config: String,
    },

    /// More than one factory matches; the registrations must be tightened.
    #[error("{count} worker factories match run mode '{run_mode}' and device type '{device_type}'")]
    AmbiguousFactories {
        count: usize,
        run_mode: String,
        device_type: String,
    },

    /// The producer could not construct its worker.
    #[error("worker producer failed: {message}")]
    ProducerFailed { message: String },
}

// --- Config Errors ---

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },

    /// Missing required configuration key.
    #[error("missing required config key '{key}' in section '[{section}]'")]
    MissingKey { section: String, key: String },

    /// Invalid configuration value.
    #[error("invalid value for '{key}' in section '[{section}]': {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
}

// --- Process Errors ---

/// Process launch errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Runnable has no executable.
    #[error("no executable specified")]
    EmptyCommand,

    /// Executable not found in PATH.
    #[error("executable not found: '{name}' (not in PATH)")]
    ExecutableNotFound { name: String },

    /// Failed to spawn process.
    #[error("failed to spawn process '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the process failed.
    #[error("failed to wait for process '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// Human-readable text for the session output pane.
    #[must_use]
    pub fn user_message(&self) -> String {
        const FAILED_TO_START: &str = "The process failed to start.";
        match self {
            Self::EmptyCommand => "No executable specified.".to_string(),
            Self::ExecutableNotFound { name } => missing_program_message(FAILED_TO_START, name),
            Self::SpawnFailed { command, source } => match source.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    missing_program_message(FAILED_TO_START, command)
                }
                _ => format!("{FAILED_TO_START} {source}"),
            },
            Self::Wait { .. } => "An error occurred when attempting to read from the process. \
                 For example, the process may not be running."
                .to_string(),
        }
    }

    /// Builds a spawn error for `program`.
    pub fn spawn_failed(program: &Path, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            command: program.display().to_string(),
            source,
        }
    }
}

fn missing_program_message(prefix: &str, program: &str) -> String {
    format!(
        "{prefix} Either the invoked program \"{program}\" is missing, or you may have \
         insufficient permissions to invoke the program."
    )
}
