// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Worker launching the session's application process.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::process::ProcessBuilder;
use crate::run::context::{RunContext, Runnable};
use crate::run::output::{OutputFormat, ProcessHandle};
use crate::run::worker::{RunWorker, WorkerHandle};

/// Launches a runnable and reports its lifecycle.
///
/// Uses the session's runnable unless one was given at construction.
#[derive(Debug, Default)]
pub struct SimpleTargetRunner {
    runnable: Option<Runnable>,
    token: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl SimpleTargetRunner {
    pub const LABEL: &'static str = "SimpleTargetRunner";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `runnable` instead of the session's runnable.
    #[must_use]
    pub fn with_runnable(runnable: Runnable) -> Self {
        Self {
            runnable: Some(runnable),
            token: None,
            task: None,
        }
    }
}

impl RunWorker for SimpleTargetRunner {
    fn start(&mut self, handle: &WorkerHandle, context: &RunContext) {
        let runnable = self
            .runnable
            .clone()
            .unwrap_or_else(|| context.runnable.clone());
        if runnable.command.is_empty() {
            handle.report_failure("No executable specified.");
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            handle.report_failure("No async runtime available to launch the process.");
            return;
        };

        handle.append_message(
            format!("Starting {}...", runnable.command.to_user_output()),
            OutputFormat::Normal,
        );

        let token = CancellationToken::new();
        self.token = Some(token.clone());
        self.task = Some(runtime.spawn(run_target(runnable, handle.clone(), token)));
    }

    fn stop(&mut self, handle: &WorkerHandle, _context: &RunContext) {
        match self.token.take() {
            Some(token) => token.cancel(),
            None => handle.report_stopped(),
        }
    }
}

impl Drop for SimpleTargetRunner {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_target(runnable: Runnable, handle: WorkerHandle, token: CancellationToken) {
    let program = runnable.command.program().display().to_string();
    let mut builder = ProcessBuilder::new(runnable.command.program())
        .args(runnable.command.arguments())
        .env(runnable.environment.clone());
    if let Some(dir) = &runnable.working_directory {
        builder = builder.cwd(dir);
    }

    let process = match builder.spawn() {
        Ok(process) => process,
        Err(e) => {
            handle.report_failure(e.user_message());
            return;
        }
    };
    handle.set_application_process_handle(process.pid().map(ProcessHandle::new));
    handle.report_started();

    let exit = process
        .wait_streaming(token, |kind, line| handle.append_message(line, kind.into()))
        .await;
    match exit {
        Ok(exit) if exit.is_interrupted() => {
            handle.append_message("The process was ended forcefully.", OutputFormat::Normal);
        }
        Ok(exit) => match exit.code() {
            Some(code) => handle.append_message(
                format!("{program} exited with code {code}"),
                OutputFormat::Normal,
            ),
            None => handle.append_message(format!("{program} crashed."), OutputFormat::Normal),
        },
        Err(e) => {
            handle.report_failure(e.user_message());
            return;
        }
    }
    handle.report_stopped();
}
