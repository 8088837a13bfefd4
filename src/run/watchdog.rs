// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Single-shot start/stop watchdog timers.
//!
//! ```text
//! arm(worker, tx)
//!   interval == 0 --> disabled, nothing armed
//!   generation += 1
//!   tokio::spawn(sleep(interval) --> tx.send(WatchdogExpired { generation }))
//!
//! kill()        abort timer, generation += 1 (queued expiries go stale)
//! expire(gen)   true only for the armed generation; disarms
//! ```

use std::fmt;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::logging::STATES_TARGET;
use crate::run::control::ControlEvent;
use crate::run::worker::{WorkerHandle, WorkerId};

/// Runs instead of the default failure when a watchdog expires.
pub type TimeoutCallback = Box<dyn FnMut(&WorkerHandle) + Send>;

/// Which report a watchdog is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchdogKind {
    Start,
    Stop,
}

impl WatchdogKind {
    /// Failure message used when no callback is installed.
    #[must_use]
    pub const fn timeout_message(self) -> &'static str {
        match self {
            Self::Start => "Worker start timed out.",
            Self::Stop => "Worker stop timed out.",
        }
    }
}

/// A restartable single-shot timer owned by one worker.
pub struct Watchdog {
    kind: WatchdogKind,
    interval: Duration,
    callback: Option<TimeoutCallback>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl Watchdog {
    pub(crate) const fn new(kind: WatchdogKind) -> Self {
        Self {
            kind,
            interval: Duration::ZERO,
            callback: None,
            generation: 0,
            timer: None,
        }
    }

    /// Configures the timeout. A zero interval disables the watchdog.
    pub(crate) fn configure(&mut self, interval: Duration, callback: Option<TimeoutCallback>) {
        self.interval = interval;
        self.callback = callback;
    }

    #[must_use]
    pub const fn kind(&self) -> WatchdogKind {
        self.kind
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Whether a timer is currently pending.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Starts the timer for `worker`, replacing any pending one.
    pub(crate) fn arm(&mut self, worker: WorkerId, tx: &flume::Sender<ControlEvent>) {
        self.kill();
        if self.interval.is_zero() {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                target: STATES_TARGET,
                %worker,
                kind = ?self.kind,
                "no tokio runtime, watchdog not armed"
            );
            return;
        };

        let interval = self.interval;
        let kind = self.kind;
        let generation = self.generation;
        let tx = tx.clone();
        self.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            let _ = tx.send(ControlEvent::WatchdogExpired {
                worker,
                kind,
                generation,
            });
        }));
    }

    /// Cancels a pending timer. Expiries already queued become stale.
    pub(crate) fn kill(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// Consumes an expiry; returns false if it belongs to a killed timer.
    pub(crate) fn expire(&mut self, generation: u64) -> bool {
        if self.timer.is_none() || generation != self.generation {
            return false;
        }
        self.timer = None;
        true
    }

    pub(crate) fn callback_mut(&mut self) -> Option<&mut TimeoutCallback> {
        self.callback.as_mut()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchdog")
            .field("kind", &self.kind)
            .field("interval", &self.interval)
            .field("has_callback", &self.callback.is_some())
            .field("generation", &self.generation)
            .field("armed", &self.timer.is_some())
            .finish()
    }
}
