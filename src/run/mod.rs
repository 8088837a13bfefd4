// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Run session engine.
//!
//! ```text
//! WorkerFactoryRegistry ──create_main_worker()──┐
//!                                               v
//!   RunContext ──> RunControl ──owns──> [WorkerSlot] ──> Box<dyn RunWorker>
//!                      │   ^                  │
//!          SessionEvent│   │ControlEvent      │ WorkerHandle
//!                      v   └──────────────────┘
//!                   host
//!
//! Session:  Initialized -> Starting -> Running -> Stopping -> Stopped
//!                                    \-> Finishing -> Finished
//! Worker:   Initialized -> Starting -> Running -> Stopping -> Done
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use runctl::run::{
//!     CommandLine, CustomExecutableConfiguration, RunControl, Runnable,
//!     workers::builtin_registry, ids::NORMAL_RUN_MODE,
//! };
//!
//! # async fn demo() -> runctl::error::RunResult<()> {
//! let mut rc = RunControl::new(NORMAL_RUN_MODE, Arc::new(builtin_registry()));
//! let command = CommandLine::new("echo").with_arguments(["hello"]);
//! rc.set_run_configuration(&CustomExecutableConfiguration::new(Runnable::new(command)));
//! rc.create_main_worker()?;
//! rc.initiate_start()?;
//! rc.run_until_quiescent().await;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod control;
pub mod ids;
pub mod output;
pub mod registry;
pub mod state;
pub mod watchdog;
pub mod worker;
pub mod workers;

pub use context::{
    CommandLine, CustomExecutableConfiguration, DesktopDevice, Device, RunConfiguration,
    RunContext, Runnable, TypedDevice, device_for_type,
};
pub use control::{HostCommand, RunControl, RunControlHandle};
pub use ids::Id;
pub use output::{OutputFormat, ProcessHandle, SessionEvent};
pub use registry::{WorkerFactory, WorkerFactoryRegistry};
pub use state::{RunControlState, RunWorkerState};
pub use watchdog::{TimeoutCallback, WatchdogKind};
pub use worker::{RunWorker, WorkerFlags, WorkerHandle, WorkerId, WorkerSlot};

#[cfg(test)]
mod tests;
