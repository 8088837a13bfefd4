// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Workers: the tasks a session starts and stops.
//!
//! ```text
//! RunControl.workers: Vec<WorkerSlot>      (arena, WorkerId = index)
//!
//! WorkerSlot
//!   label, state, flags (ESSENTIAL | SUPPORTS_RERUNNING)
//!   start_dependencies: Vec<WorkerId>   must be Running|Done to start
//!   stop_dependencies:  Vec<WorkerId>   must be Done to stop
//!   start/stop Watchdog
//!   worker: Box<dyn RunWorker>  --start()/stop()-->  task
//!   handle: WorkerHandle        <--report_*()------  task
//!                                   |
//!                                   v
//!                         ControlEvent queue (flume)
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;
use tracing::trace;

use crate::run::context::RunContext;
use crate::run::control::ControlEvent;
use crate::run::output::{OutputFormat, ProcessHandle};
use crate::run::state::RunWorkerState;
use crate::run::watchdog::{TimeoutCallback, Watchdog, WatchdogKind};

/// Index of a worker within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(usize);

impl WorkerId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position in registration order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Per-worker behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WorkerFlags: u8 {
        /// A spontaneous stop shuts down the whole session.
        const ESSENTIAL = 0x01;
        /// The worker can be started again after reaching Done.
        const SUPPORTS_RERUNNING = 0x02;
    }
}

impl Default for WorkerFlags {
    fn default() -> Self {
        Self::SUPPORTS_RERUNNING
    }
}

/// A task participating in a run session.
///
/// Both methods are called on the session's event loop and must not block.
/// Long-running work is spawned and reports back through the handle. The
/// defaults complete immediately.
pub trait RunWorker: Send {
    /// Begins the task; finish with `report_started` or `report_failure`.
    fn start(&mut self, handle: &WorkerHandle, context: &RunContext) {
        let _ = context;
        handle.report_started();
    }

    /// Ends the task; finish with `report_stopped`.
    fn stop(&mut self, handle: &WorkerHandle, context: &RunContext) {
        let _ = context;
        handle.report_stopped();
    }
}

/// Reporting channel from a worker back to its session.
///
/// Cheap to clone and `Send`, so spawned tasks can carry it. Reports are
/// queued and handled on the session's next event-loop turn.
#[derive(Clone)]
pub struct WorkerHandle {
    id: WorkerId,
    label: Arc<str>,
    tx: flume::Sender<ControlEvent>,
}

impl WorkerHandle {
    pub(crate) fn new(id: WorkerId, label: Arc<str>, tx: flume::Sender<ControlEvent>) -> Self {
        Self { id, label, tx }
    }

    #[must_use]
    pub const fn id(&self) -> WorkerId {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    fn post(&self, event: ControlEvent) {
        if self.tx.send(event).is_err() {
            trace!(worker = %self.label, "session gone, report dropped");
        }
    }

    /// The task entered its running state.
    pub fn report_started(&self) {
        self.post(ControlEvent::Started(self.id));
    }

    /// The task has ceased.
    pub fn report_stopped(&self) {
        self.post(ControlEvent::Stopped(self.id));
    }

    /// Short-lived task completed: started and stopped in one report.
    pub fn report_done(&self) {
        self.post(ControlEvent::Done(self.id));
    }

    /// Abnormal condition; the session reacts according to its state.
    pub fn report_failure(&self, message: impl Into<String>) {
        self.post(ControlEvent::Failed(self.id, message.into()));
    }

    /// Appends a line to the session output. A trailing newline is added.
    pub fn append_message(&self, message: impl Into<String>, format: OutputFormat) {
        let mut text = message.into();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        self.post(ControlEvent::Message { text, format });
    }

    /// Publishes the handle of the application process, or clears it.
    pub fn set_application_process_handle(&self, handle: Option<ProcessHandle>) {
        self.post(ControlEvent::ProcessHandle(handle));
    }

    /// Stores a value under `channel` in this worker's recorded data.
    pub fn record_data(&self, channel: impl Into<String>, value: serde_json::Value) {
        self.post(ControlEvent::RecordData {
            worker: self.id,
            channel: channel.into(),
            value,
        });
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Whether a worker may start, given its own and its start dependencies' states.
pub fn can_start<I>(state: RunWorkerState, dependencies: I) -> bool
where
    I: IntoIterator<Item = RunWorkerState>,
{
    state == RunWorkerState::Initialized
        && dependencies
            .into_iter()
            .all(RunWorkerState::satisfies_start_dependency)
}

/// Whether a worker may stop, given its own and its stop dependencies' states.
pub fn can_stop<I>(state: RunWorkerState, dependencies: I) -> bool
where
    I: IntoIterator<Item = RunWorkerState>,
{
    matches!(state, RunWorkerState::Starting | RunWorkerState::Running)
        && dependencies.into_iter().all(|s| s == RunWorkerState::Done)
}

/// A worker as owned by its session.
pub struct WorkerSlot {
    pub(crate) label: Arc<str>,
    pub(crate) worker: Box<dyn RunWorker>,
    pub(crate) handle: WorkerHandle,
    pub(crate) state: RunWorkerState,
    pub(crate) start_dependencies: Vec<WorkerId>,
    pub(crate) stop_dependencies: Vec<WorkerId>,
    pub(crate) flags: WorkerFlags,
    pub(crate) start_watchdog: Watchdog,
    pub(crate) stop_watchdog: Watchdog,
    pub(crate) data: BTreeMap<String, serde_json::Value>,
}

impl WorkerSlot {
    pub(crate) fn new(
        id: WorkerId,
        label: &str,
        worker: Box<dyn RunWorker>,
        tx: flume::Sender<ControlEvent>,
    ) -> Self {
        let label: Arc<str> = Arc::from(label);
        Self {
            handle: WorkerHandle::new(id, Arc::clone(&label), tx),
            label,
            worker,
            state: RunWorkerState::Initialized,
            start_dependencies: Vec::new(),
            stop_dependencies: Vec::new(),
            flags: WorkerFlags::default(),
            start_watchdog: Watchdog::new(WatchdogKind::Start),
            stop_watchdog: Watchdog::new(WatchdogKind::Stop),
            data: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn id(&self) -> WorkerId {
        self.handle.id
    }

    #[must_use]
    pub const fn state(&self) -> RunWorkerState {
        self.state
    }

    #[must_use]
    pub const fn handle(&self) -> &WorkerHandle {
        &self.handle
    }

    #[must_use]
    pub fn start_dependencies(&self) -> &[WorkerId] {
        &self.start_dependencies
    }

    #[must_use]
    pub fn stop_dependencies(&self) -> &[WorkerId] {
        &self.stop_dependencies
    }

    #[must_use]
    pub const fn is_essential(&self) -> bool {
        self.flags.contains(WorkerFlags::ESSENTIAL)
    }

    #[must_use]
    pub const fn supports_re_running(&self) -> bool {
        self.flags.contains(WorkerFlags::SUPPORTS_RERUNNING)
    }

    #[must_use]
    pub const fn flags(&self) -> WorkerFlags {
        self.flags
    }

    #[must_use]
    pub const fn start_watchdog(&self) -> &Watchdog {
        &self.start_watchdog
    }

    #[must_use]
    pub const fn stop_watchdog(&self) -> &Watchdog {
        &self.stop_watchdog
    }

    /// Marks the worker essential: its spontaneous stop ends the session.
    pub fn set_essential(&mut self, essential: bool) -> &mut Self {
        self.flags.set(WorkerFlags::ESSENTIAL, essential);
        self
    }

    pub fn set_supports_re_running(&mut self, supported: bool) -> &mut Self {
        self.flags.set(WorkerFlags::SUPPORTS_RERUNNING, supported);
        self
    }

    /// Fails the start (or runs `callback`) if not started within `timeout`.
    pub fn set_start_timeout(
        &mut self,
        timeout: Duration,
        callback: Option<TimeoutCallback>,
    ) -> &mut Self {
        self.start_watchdog.configure(timeout, callback);
        self
    }

    /// Fails the stop (or runs `callback`) if not stopped within `timeout`.
    pub fn set_stop_timeout(
        &mut self,
        timeout: Duration,
        callback: Option<TimeoutCallback>,
    ) -> &mut Self {
        self.stop_watchdog.configure(timeout, callback);
        self
    }

    pub(crate) fn watchdog_mut(&mut self, kind: WatchdogKind) -> &mut Watchdog {
        match kind {
            WatchdogKind::Start => &mut self.start_watchdog,
            WatchdogKind::Stop => &mut self.stop_watchdog,
        }
    }

    pub(crate) fn kill_watchdogs(&mut self) {
        self.start_watchdog.kill();
        self.stop_watchdog.kill();
    }
}

impl fmt::Debug for WorkerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSlot")
            .field("label", &self.label)
            .field("state", &self.state)
            .field("flags", &self.flags)
            .field("start_dependencies", &self.start_dependencies)
            .field("stop_dependencies", &self.stop_dependencies)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
