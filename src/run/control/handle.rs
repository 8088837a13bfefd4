// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Host commands posted from outside the session's event loop.

use super::ControlEvent;

/// A session-level request from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    Start,
    ReStart,
    /// Ignored unless the session is Starting or Running.
    Stop,
    ForceStop,
    Finish,
}

/// Cloneable sender of [`HostCommand`]s to one session.
///
/// Commands are handled in order with worker reports, on the task that
/// drives the session.
#[derive(Debug, Clone)]
pub struct RunControlHandle {
    tx: flume::Sender<ControlEvent>,
}

impl RunControlHandle {
    pub(super) const fn new(tx: flume::Sender<ControlEvent>) -> Self {
        Self { tx }
    }

    /// Posts `command`; returns false if the session is gone.
    pub fn send(&self, command: HostCommand) -> bool {
        self.tx.send(ControlEvent::Host(command)).is_ok()
    }

    pub fn initiate_start(&self) -> bool {
        self.send(HostCommand::Start)
    }

    pub fn initiate_re_start(&self) -> bool {
        self.send(HostCommand::ReStart)
    }

    pub fn initiate_stop(&self) -> bool {
        self.send(HostCommand::Stop)
    }

    pub fn force_stop(&self) -> bool {
        self.send(HostCommand::ForceStop)
    }

    pub fn initiate_finish(&self) -> bool {
        self.send(HostCommand::Finish)
    }
}
