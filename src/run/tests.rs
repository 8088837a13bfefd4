// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use std::time::Duration;

use super::context::{
    CommandLine, CustomExecutableConfiguration, DesktopDevice, RunConfiguration, RunContext,
    Runnable, device_for_type,
};
use super::control::ControlEvent;
use super::ids::{Id, NORMAL_RUN_MODE};
use super::state::{RunControlState, RunWorkerState};
use super::watchdog::{Watchdog, WatchdogKind};
use super::worker::WorkerId;

// --- Ids ---

#[test]
fn test_id_compares_by_value() {
    let mode = Id::from(NORMAL_RUN_MODE);
    assert_eq!(mode, Id::new(String::from(NORMAL_RUN_MODE)));
    assert_eq!(mode.to_string(), NORMAL_RUN_MODE);
    assert_eq!(format!("{:?}", Id::new("Desktop")), r#"Id("Desktop")"#);
    assert!(Id::default().is_empty());
}

// --- State ---

#[test]
fn test_allowed_transitions() {
    let allowed: Vec<String> = RunControlState::all()
        .iter()
        .map(|from| {
            let targets: Vec<_> = RunControlState::all()
                .iter()
                .filter(|to| from.can_transition_to(**to))
                .map(|to| to.name())
                .collect();
            if targets.is_empty() {
                format!("{from} -> (none)")
            } else {
                format!("{from} -> {}", targets.join("|"))
            }
        })
        .collect();

    insta::assert_snapshot!(allowed.join("\n"), @r"
    Initialized -> Starting|Finishing
    Starting -> Running|Stopping|Finishing
    Running -> Stopping|Stopped|Finishing
    Stopping -> Stopped|Finishing
    Stopped -> Starting|Finishing
    Finishing -> Finished
    Finished -> (none)
    ");
}

#[test]
fn test_worker_rank_is_forward_order() {
    let order = [
        RunWorkerState::Initialized,
        RunWorkerState::Starting,
        RunWorkerState::Running,
        RunWorkerState::Stopping,
        RunWorkerState::Done,
    ];
    assert!(order.windows(2).all(|w| w[0].rank() < w[1].rank()));
}

#[test]
fn test_start_dependency_satisfaction() {
    assert!(RunWorkerState::Running.satisfies_start_dependency());
    assert!(RunWorkerState::Done.satisfies_start_dependency());
    assert!(!RunWorkerState::Starting.satisfies_start_dependency());
    assert!(!RunWorkerState::Stopping.satisfies_start_dependency());
    assert!(!RunWorkerState::Initialized.satisfies_start_dependency());
}

// --- Watchdog ---

fn expired_generation(event: ControlEvent) -> (WorkerId, WatchdogKind, u64) {
    let ControlEvent::WatchdogExpired {
        worker,
        kind,
        generation,
    } = event
    else {
        panic!("unexpected event {event:?}");
    };
    (worker, kind, generation)
}

#[test]
fn test_disabled_watchdog_never_arms() {
    let (tx, _rx) = flume::unbounded();
    let mut dog = Watchdog::new(WatchdogKind::Start);
    dog.arm(WorkerId::new(0), &tx);
    assert!(!dog.is_armed());
}

#[tokio::test(start_paused = true)]
async fn test_expiry_is_delivered_once() {
    let (tx, rx) = flume::unbounded();
    let mut dog = Watchdog::new(WatchdogKind::Stop);
    dog.configure(Duration::from_millis(100), None);
    dog.arm(WorkerId::new(3), &tx);
    assert!(dog.is_armed());

    let (worker, kind, generation) = expired_generation(rx.recv_async().await.unwrap());
    assert_eq!(worker, WorkerId::new(3));
    assert_eq!(kind, WatchdogKind::Stop);
    assert!(dog.expire(generation));
    assert!(!dog.expire(generation));
}

#[tokio::test(start_paused = true)]
async fn test_killed_timer_never_fires() {
    let (tx, rx) = flume::unbounded();
    let mut dog = Watchdog::new(WatchdogKind::Start);
    dog.configure(Duration::from_millis(10), None);
    dog.arm(WorkerId::new(0), &tx);

    dog.kill();
    assert!(!dog.is_armed());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_queued_expiry_goes_stale_after_kill() {
    let (tx, rx) = flume::unbounded();
    let mut dog = Watchdog::new(WatchdogKind::Start);
    dog.configure(Duration::from_millis(10), None);
    dog.arm(WorkerId::new(0), &tx);

    let (_, _, generation) = expired_generation(rx.recv_async().await.unwrap());
    dog.kill();
    assert!(!dog.expire(generation));
}

#[test]
fn test_timeout_messages() {
    assert_eq!(WatchdogKind::Start.timeout_message(), "Worker start timed out.");
    assert_eq!(WatchdogKind::Stop.timeout_message(), "Worker stop timed out.");
}

// --- Context ---

#[test]
fn test_user_output_quotes_arguments() {
    let cmd = CommandLine::new("/usr/bin/app").with_arguments(["-v", "two words", ""]);
    insta::assert_snapshot!(cmd.to_user_output(), @r#"/usr/bin/app -v "two words" """#);
}

#[test]
fn test_device_for_type() {
    assert_eq!(device_for_type("Desktop").display_name(), "Local PC");
    let remote = device_for_type("GenericLinuxOsType");
    assert_eq!(remote.device_type().as_str(), "GenericLinuxOsType");
    assert_eq!(remote.display_name(), "GenericLinuxOsType");
}

#[test]
fn test_context_device_type() {
    let mut ctx = RunContext::default();
    assert!(ctx.device_type().is_empty());
    ctx.device = Some(Arc::new(DesktopDevice));
    assert_eq!(ctx.device_type().as_str(), "Desktop");
}

#[test]
fn test_custom_executable_defaults_name_from_program() {
    let config =
        CustomExecutableConfiguration::new(Runnable::new(CommandLine::new("/opt/bin/server")));
    assert_eq!(config.display_name(), "server");
    assert!(config.id().as_str().starts_with(CustomExecutableConfiguration::ID_PREFIX));
    assert!(config.device().is_none());
}
