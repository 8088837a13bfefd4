// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! The run session state machine.
//!
//! ```text
//!  host ──initiate_*()──> RunControl ──SessionEvent──> subscribers
//!  RunControlHandle ─HostCommand─┐      ^
//!                                v      │ handle_event()
//!  WorkerHandle::report_*() ──> ControlEvent queue (flume, FIFO)
//!  Watchdog expiry ────────────>        │
//!                                       │ InvokeStart / InvokeStop
//!                                       v (deferred, next turn)
//!                             RunWorker::start() / stop()
//!
//!  continue_start()           one Initialized worker per pass
//!  continue_stop_or_finish()  every stoppable worker per pass
//! ```
//!
//! All state lives in [`RunControl`] and is only mutated by its event
//! handlers. Worker `start`/`stop` calls are posted to the queue instead of
//! being made while the worker list is being scanned.

mod handle;

pub use handle::{HostCommand, RunControlHandle};

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::{RunResult, SessionError, WorkerError};
use crate::logging::{OUTPUT_TARGET, STATES_TARGET};
use crate::run::context::{Device, RunConfiguration, RunContext, Runnable};
use crate::run::ids::Id;
use crate::run::output::{OutputFormat, ProcessHandle, SessionEvent};
use crate::run::registry::WorkerFactoryRegistry;
use crate::run::state::{RunControlState, RunWorkerState};
use crate::run::watchdog::WatchdogKind;
use crate::run::worker::{self, RunWorker, WorkerId, WorkerSlot};

/// Queued input to the session event loop.
#[derive(Debug)]
pub(crate) enum ControlEvent {
    Host(HostCommand),
    InvokeStart(WorkerId),
    InvokeStop(WorkerId),
    Started(WorkerId),
    Stopped(WorkerId),
    Done(WorkerId),
    Failed(WorkerId, String),
    Message {
        text: String,
        format: OutputFormat,
    },
    RecordData {
        worker: WorkerId,
        channel: String,
        value: serde_json::Value,
    },
    ProcessHandle(Option<ProcessHandle>),
    WatchdogExpired {
        worker: WorkerId,
        kind: WatchdogKind,
        generation: u64,
    },
}

/// Dependency kind, used for graph validation.
#[derive(Debug, Clone, Copy)]
enum Edge {
    Start,
    Stop,
}

/// One run session: a set of workers and the state machine driving them.
pub struct RunControl {
    state: RunControlState,
    pub(crate) workers: Vec<WorkerSlot>,
    context: RunContext,
    registry: Arc<WorkerFactoryRegistry>,
    tx: flume::Sender<ControlEvent>,
    rx: flume::Receiver<ControlEvent>,
    observers: Vec<flume::Sender<SessionEvent>>,
    process_handle: Option<ProcessHandle>,
    startup_failure: Option<String>,
    last_failure: Option<String>,
    failure_count: usize,
}

impl RunControl {
    /// Creates an empty session for `run_mode`.
    pub fn new(run_mode: impl Into<Id>, registry: Arc<WorkerFactoryRegistry>) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            state: RunControlState::Initialized,
            workers: Vec::new(),
            context: RunContext::new(run_mode),
            registry,
            tx,
            rx,
            observers: Vec::new(),
            process_handle: None,
            startup_failure: None,
            last_failure: None,
            failure_count: 0,
        }
    }

    // --- Context ---

    #[must_use]
    pub const fn context(&self) -> &RunContext {
        &self.context
    }

    #[must_use]
    pub const fn run_mode(&self) -> &Id {
        &self.context.run_mode
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.context.display_name
    }

    #[must_use]
    pub const fn runnable(&self) -> &Runnable {
        &self.context.runnable
    }

    #[must_use]
    pub fn device(&self) -> Option<&Arc<dyn Device>> {
        self.context.device.as_ref()
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<WorkerFactoryRegistry> {
        &self.registry
    }

    /// Copies id, display name, runnable and device from `config`.
    ///
    /// A device set on the runnable wins over the configuration's device.
    pub fn set_run_configuration(&mut self, config: &dyn RunConfiguration) {
        let runnable = config.runnable();
        self.context.run_config_id = config.id();
        self.context.display_name = config.display_name();
        self.context.device = runnable.device.clone().or_else(|| config.device());
        self.context.runnable = runnable;
    }

    pub fn set_runnable(&mut self, runnable: Runnable) {
        self.context.runnable = runnable;
    }

    pub fn set_device(&mut self, device: Arc<dyn Device>) {
        self.context.device = Some(device);
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.context.display_name = name.into();
    }

    // --- Worker graph ---

    /// Adds a worker; registration order is the scan order.
    pub fn add_worker(&mut self, label: impl Into<String>, worker: impl RunWorker + 'static) -> WorkerId {
        self.add_boxed_worker(label, Box::new(worker))
    }

    pub fn add_boxed_worker(&mut self, label: impl Into<String>, worker: Box<dyn RunWorker>) -> WorkerId {
        let id = WorkerId::new(self.workers.len());
        let label = label.into();
        trace!(target: STATES_TARGET, worker = %label, %id, "worker added");
        self.workers
            .push(WorkerSlot::new(id, &label, worker, self.tx.clone()));
        id
    }

    #[must_use]
    pub fn worker(&self, id: WorkerId) -> Option<&WorkerSlot> {
        self.workers.get(id.index())
    }

    /// Mutable access for configuring flags and timeouts.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::UnknownWorker` for an id from another session.
    pub fn worker_mut(&mut self, id: WorkerId) -> RunResult<&mut WorkerSlot> {
        self.workers
            .get_mut(id.index())
            .ok_or_else(|| WorkerError::UnknownWorker { index: id.index() }.into())
    }

    #[must_use]
    pub fn worker_state(&self, id: WorkerId) -> Option<RunWorkerState> {
        self.worker(id).map(WorkerSlot::state)
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn workers(&self) -> impl Iterator<Item = &WorkerSlot> {
        self.workers.iter()
    }

    /// `worker` may only start once `dependency` is Running or Done.
    ///
    /// # Errors
    ///
    /// Returns a `WorkerError` for unknown ids or an edge closing a cycle.
    pub fn add_start_dependency(&mut self, worker: WorkerId, dependency: WorkerId) -> RunResult<()> {
        self.add_dependency(Edge::Start, worker, dependency)
    }

    /// `worker` may only stop once `dependency` is Done.
    ///
    /// # Errors
    ///
    /// Returns a `WorkerError` for unknown ids or an edge closing a cycle.
    pub fn add_stop_dependency(&mut self, worker: WorkerId, dependency: WorkerId) -> RunResult<()> {
        self.add_dependency(Edge::Stop, worker, dependency)
    }

    fn add_dependency(&mut self, edge: Edge, worker: WorkerId, dependency: WorkerId) -> RunResult<()> {
        self.worker_mut(dependency)?;
        self.worker_mut(worker)?;
        if worker == dependency || self.reaches(edge, dependency, worker) {
            return Err(WorkerError::DependencyCycle {
                worker: self.workers[worker.index()].label.to_string(),
                dependency: self.workers[dependency.index()].label.to_string(),
            }
            .into());
        }
        let slot = &mut self.workers[worker.index()];
        let list = match edge {
            Edge::Start => &mut slot.start_dependencies,
            Edge::Stop => &mut slot.stop_dependencies,
        };
        if !list.contains(&dependency) {
            list.push(dependency);
        }
        Ok(())
    }

    /// Whether `to` is reachable from `from` along `edge` dependencies.
    fn reaches(&self, edge: Edge, from: WorkerId, to: WorkerId) -> bool {
        let mut seen = vec![false; self.workers.len()];
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if std::mem::replace(&mut seen[current.index()], true) {
                continue;
            }
            let slot = &self.workers[current.index()];
            match edge {
                Edge::Start => stack.extend(&slot.start_dependencies),
                Edge::Stop => stack.extend(&slot.stop_dependencies),
            }
        }
        false
    }

    /// Initialized, and every start dependency is Running or Done.
    #[must_use]
    pub fn can_start(&self, id: WorkerId) -> bool {
        self.worker(id).is_some_and(|slot| {
            worker::can_start(
                slot.state,
                slot.start_dependencies.iter().map(|d| self.workers[d.index()].state),
            )
        })
    }

    /// Starting or Running, and every stop dependency is Done.
    #[must_use]
    pub fn can_stop(&self, id: WorkerId) -> bool {
        self.worker(id).is_some_and(|slot| {
            worker::can_stop(
                slot.state,
                slot.stop_dependencies.iter().map(|d| self.workers[d.index()].state),
            )
        })
    }

    /// Value recorded by `worker` under `channel`.
    #[must_use]
    pub fn recorded_data(&self, worker: WorkerId, channel: &str) -> Option<&serde_json::Value> {
        self.worker(worker).and_then(|slot| slot.data.get(channel))
    }

    // --- Factories ---

    /// Creates the session's main worker from the registry.
    ///
    /// # Errors
    ///
    /// Returns a `RegistryError` unless exactly one factory matches the run
    /// mode, device type and run configuration, or if its producer fails.
    pub fn create_main_worker(&mut self) -> RunResult<WorkerId> {
        let registry = Arc::clone(&self.registry);
        let factory = registry.find_main(
            &self.context.run_mode,
            &self.context.device_type(),
            self.context.run_config_id.as_str(),
        )?;
        debug!(target: STATES_TARGET, factory = factory.name(), "creating main worker");
        factory.produce(self)
    }

    /// Creates an auxiliary worker registered under the run mode `worker_id`.
    ///
    /// Returns `Ok(None)` when no factory provides it for this device.
    ///
    /// # Errors
    ///
    /// Returns the producer's error if construction fails.
    pub fn create_worker(&mut self, worker_id: &Id) -> RunResult<Option<WorkerId>> {
        let registry = Arc::clone(&self.registry);
        let Some(factory) = registry.find_auxiliary(worker_id, &self.context.device_type()) else {
            debug!(target: STATES_TARGET, %worker_id, "no auxiliary worker factory");
            return Ok(None);
        };
        factory.produce(self).map(Some)
    }

    /// Whether any factory in `registry` can run this combination.
    #[must_use]
    pub fn can_run(
        registry: &WorkerFactoryRegistry,
        run_mode: &Id,
        device_type: &Id,
        run_config_id: &str,
    ) -> bool {
        registry.can_run(run_mode, device_type, run_config_id)
    }

    // --- Observation ---

    /// Registers an observer for session events.
    pub fn subscribe(&mut self) -> flume::Receiver<SessionEvent> {
        let (tx, rx) = flume::unbounded();
        self.observers.push(tx);
        rx
    }

    /// A cloneable handle for posting host commands from other tasks.
    #[must_use]
    pub fn handle(&self) -> RunControlHandle {
        RunControlHandle::new(self.tx.clone())
    }

    #[must_use]
    pub const fn state(&self) -> RunControlState {
        self.state
    }

    #[must_use]
    pub const fn is_starting(&self) -> bool {
        matches!(self.state, RunControlState::Starting)
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, RunControlState::Running)
    }

    #[must_use]
    pub const fn is_stopping(&self) -> bool {
        matches!(self.state, RunControlState::Stopping)
    }

    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        matches!(self.state, RunControlState::Stopped)
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.state, RunControlState::Finished)
    }

    #[must_use]
    pub const fn application_process_handle(&self) -> Option<ProcessHandle> {
        self.process_handle
    }

    /// Message of the most recent worker failure.
    #[must_use]
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    /// Number of worker failures over the session's lifetime.
    #[must_use]
    pub const fn failure_count(&self) -> usize {
        self.failure_count
    }

    /// Whether every worker supports re-running and is Done.
    #[must_use]
    pub fn supports_re_running(&self) -> bool {
        self.workers
            .iter()
            .all(|w| w.supports_re_running() && w.state == RunWorkerState::Done)
    }

    /// Publishes the application process handle; emits only on change.
    pub fn set_application_process_handle(&mut self, handle: Option<ProcessHandle>) {
        if self.process_handle != handle {
            self.process_handle = handle;
            self.emit(SessionEvent::ApplicationProcessHandleChanged(handle));
        }
    }

    /// Appends a line to the session output.
    pub fn append_message(&mut self, text: impl Into<String>, format: OutputFormat) {
        let text = text.into();
        debug!(target: OUTPUT_TARGET, %format, "{}", text.trim_end());
        self.emit(SessionEvent::Message { text, format });
    }

    fn emit(&mut self, event: SessionEvent) {
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn show_error(&mut self, message: &str) {
        if !message.is_empty() {
            self.append_message(format!("{message}\n"), OutputFormat::Error);
        }
    }

    // --- Host operations ---

    /// Starts the session.
    ///
    /// Reports queued before the call are handled first; a failure among
    /// them aborts the start.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StartupAborted` if a worker failed while the
    /// session was still Initialized, `SessionError::Finished` once finished.
    pub fn initiate_start(&mut self) -> RunResult<()> {
        if self.is_finished() {
            return Err(SessionError::Finished.into());
        }
        if self.state != RunControlState::Initialized {
            warn!(target: STATES_TARGET, state = %self.state, "unexpected initiate_start()");
        }
        self.emit(SessionEvent::AboutToStart);
        self.process_pending();
        if let Some(message) = self.startup_failure.clone() {
            return Err(SessionError::StartupAborted { message }.into());
        }
        self.set_state(RunControlState::Starting);
        debug!(target: STATES_TARGET, "queue: starting");
        self.continue_start();
        Ok(())
    }

    /// Runs a stopped session again with the same workers.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ReRunNotSupported` unless
    /// [`supports_re_running`](Self::supports_re_running) holds.
    pub fn initiate_re_start(&mut self) -> RunResult<()> {
        if self.is_finished() {
            return Err(SessionError::Finished.into());
        }
        if !self.supports_re_running() {
            return Err(SessionError::ReRunNotSupported.into());
        }
        if self.state != RunControlState::Stopped {
            warn!(target: STATES_TARGET, state = %self.state, "unexpected initiate_re_start()");
        }
        self.emit(SessionEvent::AboutToStart);
        for slot in &mut self.workers {
            if slot.state == RunWorkerState::Done {
                slot.state = RunWorkerState::Initialized;
            }
        }
        self.startup_failure = None;
        self.set_state(RunControlState::Starting);
        debug!(target: STATES_TARGET, "queue: re-starting");
        self.continue_start();
        Ok(())
    }

    /// Stops every worker, honoring stop dependencies.
    ///
    /// Outside Starting/Running this is logged and carried out anyway. It
    /// does nothing while finishing or finished.
    pub fn initiate_stop(&mut self) {
        match self.state {
            RunControlState::Finishing | RunControlState::Finished => {
                debug!(target: STATES_TARGET, state = %self.state, "stop ignored, finishing");
                return;
            }
            RunControlState::Starting | RunControlState::Running => {}
            _ => warn!(target: STATES_TARGET, state = %self.state, "unexpected initiate_stop()"),
        }
        self.set_state(RunControlState::Stopping);
        debug!(target: STATES_TARGET, "queue: stopping all workers");
        self.continue_stop_or_finish();
    }

    /// Marks every worker Done without calling `stop()` and enters Stopped
    /// unless already there.
    pub fn force_stop(&mut self) {
        if self.is_finished() {
            debug!(target: STATES_TARGET, "finished, too late to force stop");
            return;
        }
        for slot in &mut self.workers {
            if slot.state != RunWorkerState::Done {
                debug!(
                    target: STATES_TARGET,
                    worker = %slot.label,
                    state = %slot.state,
                    "forcefully set to Done"
                );
            }
            slot.kill_watchdogs();
            slot.state = RunWorkerState::Done;
        }
        if self.is_stopped() {
            debug!(target: STATES_TARGET, "already stopped");
            return;
        }
        self.set_state(RunControlState::Stopped);
        debug!(target: STATES_TARGET, "all stopped");
    }

    /// Requests the final ramp-down; handled on the next event-loop turn.
    pub fn initiate_finish(&self) {
        let _ = self.tx.send(ControlEvent::Host(HostCommand::Finish));
    }

    fn finish(&mut self) {
        if matches!(self.state, RunControlState::Finishing | RunControlState::Finished) {
            return;
        }
        self.set_state(RunControlState::Finishing);
        debug!(target: STATES_TARGET, "ramping down");
        self.continue_stop_or_finish();
    }

    // --- Event loop ---

    /// Handles every queued event, including ones queued while handling.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Waits for one event and handles it.
    pub async fn next_event(&mut self) -> bool {
        match self.rx.recv_async().await {
            Ok(event) => {
                self.handle_event(event);
                true
            }
            Err(_) => false,
        }
    }

    /// Drives the session until it is Stopped or Finished.
    pub async fn run_until_quiescent(&mut self) -> RunControlState {
        loop {
            self.process_pending();
            if matches!(self.state, RunControlState::Stopped | RunControlState::Finished) {
                return self.state;
            }
            if !self.next_event().await {
                return self.state;
            }
        }
    }

    /// Drives the session until it is Finished, then drops it.
    pub async fn run(mut self) {
        self.process_pending();
        while !self.is_finished() && self.next_event().await {}
    }

    fn handle_event(&mut self, event: ControlEvent) {
        if self.is_finished() {
            trace!(target: STATES_TARGET, ?event, "finished, event ignored");
            return;
        }
        match event {
            ControlEvent::Host(command) => self.handle_host_command(command),
            ControlEvent::InvokeStart(id) => self.invoke_start(id),
            ControlEvent::InvokeStop(id) => self.invoke_stop(id),
            ControlEvent::Started(id) => self.on_worker_started(id),
            ControlEvent::Stopped(id) => self.on_worker_stopped(id),
            ControlEvent::Done(id) => self.on_worker_done(id),
            ControlEvent::Failed(id, message) => self.on_worker_failed(id, &message),
            ControlEvent::Message { text, format } => self.append_message(text, format),
            ControlEvent::RecordData {
                worker,
                channel,
                value,
            } => {
                if let Some(slot) = self.workers.get_mut(worker.index()) {
                    slot.data.insert(channel, value);
                }
            }
            ControlEvent::ProcessHandle(handle) => self.set_application_process_handle(handle),
            ControlEvent::WatchdogExpired {
                worker,
                kind,
                generation,
            } => self.on_watchdog_expired(worker, kind, generation),
        }
    }

    fn handle_host_command(&mut self, command: HostCommand) {
        debug!(target: STATES_TARGET, ?command, state = %self.state, "host command");
        let result = match command {
            HostCommand::Start => self.initiate_start(),
            HostCommand::ReStart => self.initiate_re_start(),
            HostCommand::Stop => {
                if self.is_starting() || self.is_running() {
                    self.initiate_stop();
                } else {
                    debug!(target: STATES_TARGET, state = %self.state, "nothing to stop");
                }
                Ok(())
            }
            HostCommand::ForceStop => {
                self.force_stop();
                Ok(())
            }
            HostCommand::Finish => {
                self.finish();
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(target: STATES_TARGET, ?command, error = %e, "host command failed");
        }
    }

    // --- Scheduling ---

    fn post(&self, event: ControlEvent) {
        let _ = self.tx.send(event);
    }

    fn set_worker_state(&mut self, id: WorkerId, state: RunWorkerState) {
        let slot = &mut self.workers[id.index()];
        trace!(
            target: STATES_TARGET,
            worker = %slot.label,
            from = %slot.state,
            to = %state,
            "worker state"
        );
        slot.state = state;
    }

    fn set_state(&mut self, state: RunControlState) {
        if !self.state.can_transition_to(state) {
            warn!(
                target: STATES_TARGET,
                from = %self.state,
                to = %state,
                "invalid run control state transition"
            );
        }
        self.state = state;
        debug!(target: STATES_TARGET, %state, "entering state");

        match state {
            RunControlState::Running => self.emit(SessionEvent::Started),
            RunControlState::Stopped => {
                self.set_application_process_handle(None);
                self.emit(SessionEvent::Stopped);
            }
            RunControlState::Finished => {
                self.emit(SessionEvent::Finished);
                debug!(target: STATES_TARGET, "all finished");
            }
            _ => {}
        }
    }

    fn continue_start(&mut self) {
        if !self.is_starting() {
            debug!(target: STATES_TARGET, state = %self.state, "not starting, scan skipped");
            return;
        }
        debug!(target: STATES_TARGET, "looking for next worker");
        let mut all_done = true;
        for index in 0..self.workers.len() {
            let id = WorkerId::new(index);
            let slot = &self.workers[index];
            match slot.state {
                RunWorkerState::Initialized => {
                    all_done = false;
                    if self.can_start(id) {
                        debug!(target: STATES_TARGET, worker = %slot.label, "starting");
                        self.set_worker_state(id, RunWorkerState::Starting);
                        self.post(ControlEvent::InvokeStart(id));
                        return;
                    }
                    trace!(target: STATES_TARGET, worker = %slot.label, "cannot start yet");
                }
                RunWorkerState::Starting | RunWorkerState::Stopping => {
                    trace!(target: STATES_TARGET, worker = %slot.label, state = %slot.state, "in flight");
                    all_done = false;
                }
                RunWorkerState::Running | RunWorkerState::Done => {}
            }
        }
        if all_done {
            self.set_state(RunControlState::Running);
        }
    }

    fn continue_stop_or_finish(&mut self) {
        // Never-started workers go first so they unblock stop dependents
        // registered before them.
        for index in 0..self.workers.len() {
            if self.workers[index].state == RunWorkerState::Initialized {
                self.workers[index].kill_watchdogs();
                self.set_worker_state(WorkerId::new(index), RunWorkerState::Done);
            }
        }

        let mut all_done = true;
        for index in 0..self.workers.len() {
            let id = WorkerId::new(index);
            match self.workers[index].state {
                RunWorkerState::Stopping => all_done = false,
                RunWorkerState::Starting | RunWorkerState::Running => {
                    all_done = false;
                    if self.can_stop(id) {
                        self.set_worker_state(id, RunWorkerState::Stopping);
                        self.post(ControlEvent::InvokeStop(id));
                    } else {
                        debug!(
                            target: STATES_TARGET,
                            worker = %self.workers[index].label,
                            "waiting for dependent workers to stop"
                        );
                    }
                }
                RunWorkerState::Initialized | RunWorkerState::Done => {}
            }
        }

        let target = if self.state == RunControlState::Finishing {
            RunControlState::Finished
        } else {
            if self.state != RunControlState::Stopping {
                debug!(target: STATES_TARGET, state = %self.state, "stopping outside Stopping");
            }
            RunControlState::Stopped
        };

        if all_done {
            debug!(target: STATES_TARGET, "all workers done");
            self.set_state(target);
        } else {
            debug!(target: STATES_TARGET, "not all workers stopped, waiting");
        }
    }

    fn invoke_start(&mut self, id: WorkerId) {
        let Some(slot) = self.workers.get_mut(id.index()) else {
            return;
        };
        if slot.state != RunWorkerState::Starting {
            debug!(target: STATES_TARGET, worker = %slot.label, state = %slot.state, "deferred start dropped");
            return;
        }
        slot.stop_watchdog.kill();
        slot.start_watchdog.arm(id, &self.tx);
        slot.worker.start(&slot.handle, &self.context);
    }

    fn invoke_stop(&mut self, id: WorkerId) {
        let Some(slot) = self.workers.get_mut(id.index()) else {
            return;
        };
        if slot.state != RunWorkerState::Stopping {
            debug!(target: STATES_TARGET, worker = %slot.label, state = %slot.state, "deferred stop dropped");
            return;
        }
        slot.start_watchdog.kill();
        slot.stop_watchdog.arm(id, &self.tx);
        slot.worker.stop(&slot.handle, &self.context);
    }

    // --- Worker reports ---

    fn on_worker_started(&mut self, id: WorkerId) {
        let Some(slot) = self.workers.get_mut(id.index()) else {
            return;
        };
        if slot.state != RunWorkerState::Starting {
            warn!(
                target: STATES_TARGET,
                worker = %slot.label,
                state = %slot.state,
                "start reported outside Starting, ignored"
            );
            return;
        }
        slot.start_watchdog.kill();
        self.set_worker_state(id, RunWorkerState::Running);

        if self.is_starting() {
            debug!(target: STATES_TARGET, worker = %self.workers[id.index()].label, "start succeeded");
            self.continue_start();
            return;
        }
        let message = format!(
            "Unexpected run control state {} when worker {} started.",
            self.state, self.workers[id.index()].label
        );
        self.show_error(&message);
    }

    fn on_worker_stopped(&mut self, id: WorkerId) {
        let Some(slot) = self.workers.get_mut(id.index()) else {
            return;
        };
        let label = Arc::clone(&slot.label);
        match slot.state {
            RunWorkerState::Running => {
                debug!(target: STATES_TARGET, worker = %label, "stopped spontaneously");
            }
            RunWorkerState::Stopping => {
                debug!(target: STATES_TARGET, worker = %label, "stopped expectedly");
            }
            RunWorkerState::Done => {
                debug!(target: STATES_TARGET, worker = %label, "stopped twice, harmless");
                return;
            }
            state => {
                debug!(target: STATES_TARGET, worker = %label, %state, "stopped unexpectedly");
            }
        }
        slot.kill_watchdogs();
        self.set_worker_state(id, RunWorkerState::Done);

        if matches!(self.state, RunControlState::Stopping | RunControlState::Finishing) {
            self.continue_stop_or_finish();
            return;
        }
        if self.workers[id.index()].is_essential() {
            debug!(target: STATES_TARGET, worker = %label, "essential, stopping all others");
            self.initiate_stop();
            return;
        }

        for index in 0..self.workers.len() {
            let dependent = WorkerId::new(index);
            if !self.workers[index].stop_dependencies.contains(&id) {
                continue;
            }
            match self.workers[index].state {
                RunWorkerState::Initialized => {
                    self.set_worker_state(dependent, RunWorkerState::Done);
                }
                RunWorkerState::Starting | RunWorkerState::Running => {
                    debug!(
                        target: STATES_TARGET,
                        worker = %self.workers[index].label,
                        stopped = %label,
                        "killing dependent of stopped worker"
                    );
                    self.set_worker_state(dependent, RunWorkerState::Stopping);
                    self.post(ControlEvent::InvokeStop(dependent));
                }
                RunWorkerState::Stopping | RunWorkerState::Done => {}
            }
        }

        let all_done = self.workers.iter().all(|w| w.state == RunWorkerState::Done);
        if all_done {
            if self.is_stopped() {
                debug!(target: STATES_TARGET, "all workers stopped, session already stopped");
            } else {
                debug!(target: STATES_TARGET, "all workers stopped");
                self.set_state(RunControlState::Stopped);
            }
        } else if self.is_starting() {
            self.continue_start();
        } else {
            debug!(target: STATES_TARGET, "not all workers stopped, waiting");
        }
    }

    fn on_worker_done(&mut self, id: WorkerId) {
        match self.worker_state(id) {
            Some(RunWorkerState::Starting) => {
                self.on_worker_started(id);
                self.on_worker_stopped(id);
            }
            Some(_) => self.on_worker_stopped(id),
            None => {}
        }
    }

    fn on_worker_failed(&mut self, id: WorkerId, message: &str) {
        let Some(slot) = self.workers.get_mut(id.index()) else {
            return;
        };
        slot.kill_watchdogs();
        warn!(target: STATES_TARGET, worker = %slot.label, reason = message, "worker failed");
        self.set_worker_state(id, RunWorkerState::Done);
        self.last_failure = Some(message.to_string());
        self.failure_count += 1;
        self.show_error(message);

        match self.state {
            RunControlState::Initialized => {
                self.startup_failure = Some(message.to_string());
                self.emit(SessionEvent::StartupFailed {
                    message: message.to_string(),
                });
                self.continue_stop_or_finish();
            }
            RunControlState::Starting | RunControlState::Running => self.initiate_stop(),
            RunControlState::Stopping | RunControlState::Finishing => {
                self.continue_stop_or_finish();
            }
            RunControlState::Stopped | RunControlState::Finished => {
                warn!(target: STATES_TARGET, state = %self.state, "failure reported after stop");
            }
        }
    }

    fn on_watchdog_expired(&mut self, id: WorkerId, kind: WatchdogKind, generation: u64) {
        let Some(slot) = self.workers.get_mut(id.index()) else {
            return;
        };
        if !slot.watchdog_mut(kind).expire(generation) {
            trace!(target: STATES_TARGET, worker = %slot.label, ?kind, "stale watchdog expiry");
            return;
        }
        debug!(target: STATES_TARGET, worker = %slot.label, ?kind, "watchdog expired");

        let handle = slot.handle.clone();
        if let Some(callback) = slot.watchdog_mut(kind).callback_mut() {
            callback(&handle);
        } else {
            self.on_worker_failed(id, kind.timeout_message());
        }
    }
}

impl std::fmt::Debug for RunControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunControl")
            .field("state", &self.state)
            .field("run_mode", &self.context.run_mode)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
