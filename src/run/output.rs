// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session output and lifecycle notifications for the host.

use std::fmt;

use crate::core::process::StreamKind;

/// Category tag for a line appended to a session's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Progress messages from workers ("Starting ...", "... exited with code 0").
    Normal,
    /// Failures surfaced by the session.
    Error,
    /// Log lines relayed from the target (journal, device logs).
    LogMessage,
    /// Developer diagnostics.
    Debug,
    /// Application standard output.
    StdOut,
    /// Application standard error.
    StdErr,
}

impl OutputFormat {
    /// Short name for log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Error => "error",
            Self::LogMessage => "log",
            Self::Debug => "debug",
            Self::StdOut => "stdout",
            Self::StdErr => "stderr",
        }
    }

    /// Whether a host should route this line to an error stream.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error | Self::StdErr)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<StreamKind> for OutputFormat {
    fn from(kind: StreamKind) -> Self {
        match kind {
            StreamKind::Stdout => Self::StdOut,
            StreamKind::Stderr => Self::StdErr,
        }
    }
}

/// Opaque handle to the application process controlled by a session.
///
/// Typically a process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle(u32);

impl ProcessHandle {
    #[must_use]
    pub const fn new(pid: u32) -> Self {
        Self(pid)
    }

    #[must_use]
    pub const fn pid(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification delivered to session subscribers.
///
/// `Started`, `Stopped` and `Finished` fire once per entry into the
/// corresponding session state; `Finished` fires at most once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// `initiate_start()` or `initiate_re_start()` is about to run.
    AboutToStart,
    /// Session entered Running.
    Started,
    /// Session entered Stopped.
    Stopped,
    /// Session entered Finished.
    Finished,
    /// A worker failed before the session was started.
    StartupFailed { message: String },
    /// A line for the output pane.
    Message { text: String, format: OutputFormat },
    /// The application process handle changed.
    ApplicationProcessHandleChanged(Option<ProcessHandle>),
}
