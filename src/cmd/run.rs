// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Run command implementation.
//!
//! ```text
//! RunArgs + [session] --> build_session()
//!   main worker (factory)  <--start dep--  pre-launch OneShotCommand...
//!        |
//!        v
//! drive_session()
//!   initiate_start --> run_until_quiescent
//!   repeat: initiate_re_start --> run_until_quiescent
//!   initiate_finish --> run
//!
//! Ctrl-C once: initiate_stop    Ctrl-C again: force_stop
//! ```

use std::sync::Arc;

use anyhow::bail;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::run::RunArgs;
use crate::config::Config;
use crate::config::types::SessionConfig;
use crate::core::env::Environment;
use crate::core::process::ProcessBuilder;
use crate::error::{Result, RunResult};
use crate::run::context::{CommandLine, CustomExecutableConfiguration, Runnable, device_for_type};
use crate::run::control::{RunControl, RunControlHandle};
use crate::run::output::SessionEvent;
use crate::run::registry::WorkerFactoryRegistry;
use crate::run::worker::WorkerId;
use crate::run::workers::{OneShotCommand, builtin_registry};

/// Main handler for the run command.
///
/// # Errors
///
/// Returns an error if the session cannot be assembled, if it cannot start,
/// or if any worker failed.
pub async fn run_run_command(args: &RunArgs, config: &Config) -> Result<()> {
    let mut session = config.session.clone();
    args.apply_to(&mut session);
    session.validate()?;

    let (rc, _main) = build_session(args, &session, Arc::new(builtin_registry()))?;
    let failures = drive_session(rc, session.repeat).await?;
    if failures > 0 {
        bail!("session ended with {failures} worker failure(s)");
    }
    Ok(())
}

/// Assembles a session: the main worker from the registry plus one
/// start dependency per pre-launch command.
///
/// # Errors
///
/// Returns a registry error when no single factory serves the run mode and
/// device type.
pub fn build_session(
    args: &RunArgs,
    session: &SessionConfig,
    registry: Arc<WorkerFactoryRegistry>,
) -> RunResult<(RunControl, WorkerId)> {
    let mut rc = RunControl::new(session.run_mode.as_str(), registry);

    let environment = build_environment(args);
    let mut runnable =
        Runnable::new(CommandLine::new(args.program()).with_arguments(args.arguments()));
    runnable.working_directory.clone_from(&args.cwd);
    runnable.environment = environment.clone();

    let mut run_config = CustomExecutableConfiguration::new(runnable)
        .with_device(device_for_type(&session.device_type));
    if let Some(name) = &args.name {
        run_config = run_config.with_display_name(name.as_str());
    }
    rc.set_run_configuration(&run_config);

    let main = rc.create_main_worker()?;
    rc.worker_mut(main)?
        .set_essential(session.essential_main_worker)
        .set_start_timeout(session.start_timeout(), None)
        .set_stop_timeout(session.stop_timeout(), None);

    for command in &args.pre_launch {
        let mut builder = ProcessBuilder::raw(command.as_str())
            .name(command.as_str())
            .env(environment.clone());
        if let Some(cwd) = &args.cwd {
            builder = builder.cwd(cwd);
        }
        let helper = rc.add_worker(
            format!("{} ({command})", OneShotCommand::LABEL),
            OneShotCommand::new(builder),
        );
        rc.add_start_dependency(main, helper)?;
    }

    debug!(
        session = rc.display_name(),
        workers = rc.worker_count(),
        run_mode = %rc.run_mode(),
        "session assembled"
    );
    Ok((rc, main))
}

fn build_environment(args: &RunArgs) -> Environment {
    let mut environment = if args.clean_env {
        Environment::clean()
    } else {
        Environment::inherited()
    };
    for (key, value) in &args.env {
        environment.set(key.as_str(), value.as_str());
    }
    environment
}

/// Runs the session `repeat` times and finishes it.
///
/// Returns the number of worker failures seen over all runs. Repetition ends
/// early after a failure or an interrupt.
///
/// # Errors
///
/// Returns a session error if the first start is aborted or a re-start is
/// refused.
pub async fn drive_session(mut rc: RunControl, repeat: u32) -> Result<usize> {
    let printer = tokio::spawn(print_events(rc.subscribe()));
    let interrupted = CancellationToken::new();
    let interrupt = tokio::spawn(watch_interrupts(rc.handle(), interrupted.clone()));

    let result = run_repeatedly(&mut rc, repeat, &interrupted).await;
    let failures = rc.failure_count();

    rc.initiate_finish();
    rc.run().await;
    interrupt.abort();
    if let Err(e) = printer.await {
        warn!(error = %e, "output printer task failed");
    }

    result.map(|()| failures)
}

async fn run_repeatedly(
    rc: &mut RunControl,
    repeat: u32,
    interrupted: &CancellationToken,
) -> Result<()> {
    for run in 1..=repeat {
        if run == 1 {
            rc.initiate_start()?;
        } else {
            if interrupted.is_cancelled() {
                info!("interrupted, skipping remaining runs");
                break;
            }
            rc.initiate_re_start()?;
        }
        let state = rc.run_until_quiescent().await;
        info!(run, of = repeat, state = %state, "run ended");
        if rc.failure_count() > 0 {
            break;
        }
    }
    Ok(())
}

async fn watch_interrupts(handle: RunControlHandle, interrupted: CancellationToken) {
    while tokio::signal::ctrl_c().await.is_ok() {
        if interrupted.is_cancelled() {
            warn!("interrupted again, forcing stop");
            handle.force_stop();
        } else {
            info!("interrupted, stopping session (press Ctrl-C again to force)");
            interrupted.cancel();
            handle.initiate_stop();
        }
    }
}

async fn print_events(events: flume::Receiver<SessionEvent>) {
    while let Ok(event) = events.recv_async().await {
        match event {
            SessionEvent::Message { text, format } => {
                let text = text.strip_suffix('\n').unwrap_or(&text);
                if format.is_error() {
                    eprintln!("{text}");
                } else {
                    println!("{text}");
                }
            }
            // Already shown as an error message.
            SessionEvent::StartupFailed { message } => debug!(%message, "startup failed"),
            SessionEvent::ApplicationProcessHandleChanged(Some(pid)) => {
                debug!(%pid, "application process");
            }
            SessionEvent::ApplicationProcessHandleChanged(None) => {}
            SessionEvent::AboutToStart => debug!("session about to start"),
            SessionEvent::Started => info!("session running"),
            SessionEvent::Stopped => info!("session stopped"),
            SessionEvent::Finished => debug!("session finished"),
        }
    }
}
