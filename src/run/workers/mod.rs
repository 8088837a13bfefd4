// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Built-in workers.
//!
//! ```text
//! SimpleTargetRunner  launches the runnable, essential main worker
//!   start: "Starting <cmd>..." --> spawn --> pid --> report_started
//!          stdout/stderr lines --> StdOut / StdErr output
//!   exit:  "<program> exited with code N" | "<program> crashed."
//!          --> report_stopped
//!   stop:  cancel --> kill --> "The process was ended forcefully."
//!
//! OneShotCommand      runs a helper command to completion
//!   exit 0 --> report_done     other --> report_failure
//! ```

mod oneshot;
mod target;

pub use oneshot::OneShotCommand;
pub use target::SimpleTargetRunner;

use crate::run::control::RunControl;
use crate::run::ids::{DEBUG_RUN_MODE, NORMAL_RUN_MODE, PROFILER_RUN_MODE};
use crate::run::registry::{WorkerFactory, WorkerFactoryRegistry};

/// Registers the factories shipped with the crate.
///
/// The process runner serves every run mode on any device; the session's
/// runnable decides what is launched.
pub fn register_builtin_factories(registry: &mut WorkerFactoryRegistry) {
    let mut runner = WorkerFactory::new(SimpleTargetRunner::LABEL);
    runner
        .set_producer(|rc: &mut RunControl| {
            let id = rc.add_worker(SimpleTargetRunner::LABEL, SimpleTargetRunner::new());
            rc.worker_mut(id)?.set_essential(true);
            Ok(id)
        })
        .add_supported_run_mode(NORMAL_RUN_MODE)
        .add_supported_run_mode(DEBUG_RUN_MODE)
        .add_supported_run_mode(PROFILER_RUN_MODE);
    registry.register(runner);
}

/// A registry holding the built-in factories.
#[must_use]
pub fn builtin_registry() -> WorkerFactoryRegistry {
    let mut registry = WorkerFactoryRegistry::new();
    register_builtin_factories(&mut registry);
    registry
}
