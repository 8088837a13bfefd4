// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Worker and session state enums.
//!
//! ```text
//! RunWorkerState
//!   Initialized --> Starting --> Running --> Stopping --> Done
//!        |              |           |                      ^
//!        +--------------+-----------+----------------------+
//!   (Done --> Initialized only on session re-start)
//!
//! RunControlState (allowed transitions)
//!   Initialized --> Starting | Finishing
//!   Starting    --> Running | Stopping | Finishing
//!   Running     --> Stopping | Stopped | Finishing
//!   Stopping    --> Stopped | Finishing
//!   Stopped     --> Starting | Finishing
//!   Finishing   --> Finished
//!   Finished    (terminal)
//! ```

use std::fmt;

/// Lifecycle state of a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunWorkerState {
    #[default]
    Initialized,
    Starting,
    Running,
    Stopping,
    Done,
}

impl RunWorkerState {
    /// Returns the state name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initialized => "Initialized",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Done => "Done",
        }
    }

    /// Position along the forward path, used to check monotonic progress.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Initialized => 0,
            Self::Starting => 1,
            Self::Running => 2,
            Self::Stopping => 3,
            Self::Done => 4,
        }
    }

    /// Whether a dependent may start with this worker in this state.
    #[must_use]
    pub const fn satisfies_start_dependency(self) -> bool {
        matches!(self, Self::Running | Self::Done)
    }
}

impl fmt::Display for RunWorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of a run session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunControlState {
    /// Default value after creation.
    #[default]
    Initialized,
    /// Workers are being started.
    Starting,
    /// All workers are running or done.
    Running,
    /// `initiate_stop()` was called, workers are ramping down.
    Stopping,
    /// All workers done; the session may be re-started.
    Stopped,
    /// Ramping down for good.
    Finishing,
    /// Terminal state.
    Finished,
}

impl RunControlState {
    /// Returns the state name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initialized => "Initialized",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Finishing => "Finishing",
            Self::Finished => "Finished",
        }
    }

    /// Whether `self -> to` is on the allow-list.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        match self {
            Self::Initialized => matches!(to, Self::Starting | Self::Finishing),
            Self::Starting => matches!(to, Self::Running | Self::Stopping | Self::Finishing),
            Self::Running => matches!(to, Self::Stopping | Self::Stopped | Self::Finishing),
            Self::Stopping => matches!(to, Self::Stopped | Self::Finishing),
            Self::Stopped => matches!(to, Self::Starting | Self::Finishing),
            Self::Finishing => matches!(to, Self::Finished),
            Self::Finished => false,
        }
    }

    /// Returns all states in declaration order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Initialized,
            Self::Starting,
            Self::Running,
            Self::Stopping,
            Self::Stopped,
            Self::Finishing,
            Self::Finished,
        ]
    }
}

impl fmt::Display for RunControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
