// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Short-lived helper command, e.g. a pre-launch step.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::process::ProcessBuilder;
use crate::run::context::RunContext;
use crate::run::output::OutputFormat;
use crate::run::worker::{RunWorker, WorkerHandle};

/// Runs a command to completion: exit code 0 is done, anything else fails.
#[derive(Debug)]
pub struct OneShotCommand {
    command: ProcessBuilder,
    token: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl OneShotCommand {
    pub const LABEL: &'static str = "OneShotCommand";

    #[must_use]
    pub fn new(command: ProcessBuilder) -> Self {
        Self {
            command,
            token: None,
            task: None,
        }
    }

    /// A command line run through the shell.
    #[must_use]
    pub fn shell(command: impl Into<String>) -> Self {
        let command = command.into();
        Self::new(ProcessBuilder::raw(command.clone()).name(command))
    }
}

impl RunWorker for OneShotCommand {
    fn start(&mut self, handle: &WorkerHandle, _context: &RunContext) {
        let Ok(runtime) = Handle::try_current() else {
            handle.report_failure("No async runtime available to launch the process.");
            return;
        };
        handle.append_message(
            format!("Running {}...", self.command.display_name()),
            OutputFormat::Normal,
        );
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        self.task = Some(runtime.spawn(run_once(
            self.command.clone(),
            handle.clone(),
            token,
        )));
    }

    fn stop(&mut self, handle: &WorkerHandle, _context: &RunContext) {
        match self.token.take() {
            Some(token) => token.cancel(),
            None => handle.report_stopped(),
        }
    }
}

impl Drop for OneShotCommand {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_once(command: ProcessBuilder, handle: WorkerHandle, token: CancellationToken) {
    let name = command.display_name();
    let process = match command.spawn() {
        Ok(process) => process,
        Err(e) => {
            handle.report_failure(e.user_message());
            return;
        }
    };

    let exit = process
        .wait_streaming(token, |kind, line| handle.append_message(line, kind.into()))
        .await;
    match exit {
        Ok(exit) if exit.is_interrupted() => handle.report_stopped(),
        Ok(exit) if exit.success() => handle.report_done(),
        Ok(exit) => match exit.code() {
            Some(code) => handle.report_failure(format!("{name} exited with code {code}")),
            None => handle.report_failure(format!("{name} crashed.")),
        },
        Err(e) => handle.report_failure(e.user_message()),
    }
}
