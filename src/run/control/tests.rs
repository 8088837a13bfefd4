// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;

use super::RunControl;
use crate::error::{RunError, SessionError, WorkerError};
use crate::run::context::RunContext;
use crate::run::ids::NORMAL_RUN_MODE;
use crate::run::output::{OutputFormat, ProcessHandle, SessionEvent};
use crate::run::state::{RunControlState, RunWorkerState};
use crate::run::worker::{RunWorker, WorkerHandle, WorkerId};

type Log = Arc<Mutex<Vec<String>>>;

/// Records calls; reports back only when told to.
struct Scripted {
    name: &'static str,
    log: Log,
    auto_start: bool,
    auto_stop: bool,
}

impl RunWorker for Scripted {
    fn start(&mut self, handle: &WorkerHandle, _context: &RunContext) {
        self.log.lock().unwrap().push(format!("{}.start", self.name));
        if self.auto_start {
            handle.report_started();
        }
    }

    fn stop(&mut self, handle: &WorkerHandle, _context: &RunContext) {
        self.log.lock().unwrap().push(format!("{}.stop", self.name));
        if self.auto_stop {
            handle.report_stopped();
        }
    }
}

struct Fixture {
    rc: RunControl,
    log: Log,
    events: flume::Receiver<SessionEvent>,
}

impl Fixture {
    fn new() -> Self {
        let mut rc = RunControl::new(NORMAL_RUN_MODE, Arc::default());
        let events = rc.subscribe();
        Self {
            rc,
            log: Log::default(),
            events,
        }
    }

    fn add(&mut self, name: &'static str, auto_start: bool, auto_stop: bool) -> WorkerId {
        let worker = Scripted {
            name,
            log: Arc::clone(&self.log),
            auto_start,
            auto_stop,
        };
        self.rc.add_worker(name, worker)
    }

    fn manual(&mut self, name: &'static str) -> WorkerId {
        self.add(name, false, false)
    }

    fn handle(&self, id: WorkerId) -> WorkerHandle {
        self.rc.worker(id).unwrap().handle().clone()
    }

    fn started(&mut self, id: WorkerId) {
        self.handle(id).report_started();
        self.rc.process_pending();
    }

    fn stopped(&mut self, id: WorkerId) {
        self.handle(id).report_stopped();
        self.rc.process_pending();
    }

    fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn count(&self, call: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    fn state(&self, id: WorkerId) -> RunWorkerState {
        self.rc.worker_state(id).unwrap()
    }

    /// Session events other than output lines and process handle changes.
    fn lifecycle(&self) -> Vec<SessionEvent> {
        self.events
            .try_iter()
            .filter(|e| {
                !matches!(
                    e,
                    SessionEvent::Message { .. } | SessionEvent::ApplicationProcessHandleChanged(_)
                )
            })
            .collect()
    }

    fn messages(&self) -> Vec<(String, OutputFormat)> {
        self.events
            .try_iter()
            .filter_map(|e| match e {
                SessionEvent::Message { text, format } => Some((text, format)),
                _ => None,
            })
            .collect()
    }
}

fn session_error(err: RunError) -> SessionError {
    match err {
        RunError::Session(e) => *e,
        other => panic!("expected session error, got {other}"),
    }
}

// --- End-to-end scenarios ---

#[test]
fn test_single_worker_start_and_stop() {
    let mut fx = Fixture::new();
    let a = fx.manual("A");

    fx.rc.initiate_start().unwrap();
    assert_eq!(fx.rc.state(), RunControlState::Starting);
    assert!(fx.calls().is_empty(), "start must be deferred");

    fx.rc.process_pending();
    assert_eq!(fx.calls(), ["A.start"]);
    assert_eq!(fx.state(a), RunWorkerState::Starting);

    fx.started(a);
    assert_eq!(fx.rc.state(), RunControlState::Running);

    fx.rc.initiate_stop();
    assert_eq!(fx.state(a), RunWorkerState::Stopping);
    fx.rc.process_pending();
    assert_eq!(fx.calls(), ["A.start", "A.stop"]);

    fx.stopped(a);
    assert_eq!(fx.rc.state(), RunControlState::Stopped);
    assert_eq!(
        fx.lifecycle(),
        [SessionEvent::AboutToStart, SessionEvent::Started, SessionEvent::Stopped]
    );
}

#[test]
fn test_start_dependency_orders_starts() {
    let mut fx = Fixture::new();
    let a = fx.manual("A");
    let b = fx.manual("B");
    fx.rc.add_start_dependency(a, b).unwrap();

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    assert_eq!(fx.calls(), ["B.start"]);
    assert_eq!(fx.state(a), RunWorkerState::Initialized);

    fx.started(b);
    assert_eq!(fx.calls(), ["B.start", "A.start"]);
    assert!(fx.rc.is_starting());

    fx.started(a);
    assert!(fx.rc.is_running());
}

#[test]
fn test_failed_dependency_prevents_dependent_start() {
    let mut fx = Fixture::new();
    let a = fx.manual("A");
    let b = fx.manual("B");
    fx.rc.add_start_dependency(a, b).unwrap();

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    fx.handle(b).report_failure("x");
    fx.rc.process_pending();

    assert_eq!(fx.calls(), ["B.start"]);
    assert_eq!(fx.state(a), RunWorkerState::Done);
    assert_eq!(fx.rc.state(), RunControlState::Stopped);
    assert_eq!(fx.rc.last_failure(), Some("x"));

    let events: Vec<_> = fx.events.try_iter().collect();
    assert!(!events.contains(&SessionEvent::Started));
    assert!(events.contains(&SessionEvent::Message {
        text: "x\n".to_string(),
        format: OutputFormat::Error,
    }));
    assert_eq!(events.last(), Some(&SessionEvent::Stopped));
}

#[test]
fn test_stop_dependency_on_never_started_worker() {
    let mut fx = Fixture::new();
    let d = fx.add("D", true, true);
    let c = fx.manual("C");
    let b = fx.manual("B");
    fx.rc.add_stop_dependency(d, c).unwrap();
    fx.rc.add_start_dependency(c, b).unwrap();

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    assert_eq!(fx.state(d), RunWorkerState::Running);
    assert_eq!(fx.state(b), RunWorkerState::Starting);

    fx.handle(b).report_failure("boom");
    fx.rc.process_pending();

    assert_eq!(fx.state(c), RunWorkerState::Done);
    assert_eq!(fx.state(d), RunWorkerState::Done);
    assert_eq!(fx.count("D.stop"), 1);
    assert_eq!(fx.count("C.start"), 0);
    assert!(fx.rc.is_stopped());
}

#[test]
fn test_essential_worker_stops_session() {
    let mut fx = Fixture::new();
    let x = fx.add("X", true, false);
    let y = fx.add("Y", true, false);
    let z = fx.add("Z", true, false);
    fx.rc.worker_mut(x).unwrap().set_essential(true);

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    assert!(fx.rc.is_running());

    fx.stopped(x);
    assert!(fx.rc.is_stopping());
    assert_eq!(fx.count("Y.stop"), 1);
    assert_eq!(fx.count("Z.stop"), 1);
    assert_eq!(fx.count("X.stop"), 0);

    fx.stopped(y);
    assert!(fx.rc.is_stopping());
    fx.stopped(z);
    assert!(fx.rc.is_stopped());

    let stopped = fx
        .lifecycle()
        .into_iter()
        .filter(|e| *e == SessionEvent::Stopped)
        .count();
    assert_eq!(stopped, 1);
}

#[test]
fn test_stop_dependency_delays_stop() {
    let mut fx = Fixture::new();
    let c = fx.add("C", true, false);
    let d = fx.add("D", true, false);
    fx.rc.add_stop_dependency(d, c).unwrap();

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    assert!(fx.rc.is_running());

    fx.rc.initiate_stop();
    fx.rc.process_pending();
    assert_eq!(fx.count("C.stop"), 1);
    assert_eq!(fx.count("D.stop"), 0);
    assert_eq!(fx.state(d), RunWorkerState::Running);

    fx.stopped(c);
    assert_eq!(fx.count("D.stop"), 1);

    fx.stopped(d);
    assert!(fx.rc.is_stopped());
}

#[tokio::test(start_paused = true)]
async fn test_start_watchdog_fails_worker() {
    let mut fx = Fixture::new();
    let e = fx.manual("E");
    fx.rc
        .worker_mut(e)
        .unwrap()
        .set_start_timeout(Duration::from_millis(100), None);

    fx.rc.initiate_start().unwrap();
    let state = fx.rc.run_until_quiescent().await;

    assert_eq!(state, RunControlState::Stopped);
    assert_eq!(fx.state(e), RunWorkerState::Done);
    assert!(fx.messages().contains(&(
        "Worker start timed out.\n".to_string(),
        OutputFormat::Error
    )));
}

#[test]
fn test_re_run_repeats_single_worker_cycle() {
    let mut fx = Fixture::new();
    let f = fx.manual("F");

    fx.rc.initiate_start().unwrap();
    for round in 0..3 {
        if round > 0 {
            assert!(fx.rc.supports_re_running());
            fx.rc.initiate_re_start().unwrap();
            assert_eq!(fx.state(f), RunWorkerState::Starting);
        }
        fx.rc.process_pending();
        fx.started(f);
        assert!(fx.rc.is_running());
        fx.rc.initiate_stop();
        fx.rc.process_pending();
        fx.stopped(f);
        assert!(fx.rc.is_stopped());
    }

    assert_eq!(fx.count("F.start"), 3);
    let started = fx
        .lifecycle()
        .into_iter()
        .filter(|e| *e == SessionEvent::Started)
        .count();
    assert_eq!(started, 3);
}

// --- Properties and edge cases ---

#[test]
fn test_duplicate_stop_report_is_harmless() {
    let mut fx = Fixture::new();
    let x = fx.add("X", true, false);
    let y = fx.add("Y", true, false);
    fx.rc.worker_mut(x).unwrap().set_essential(true);

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();

    let hx = fx.handle(x);
    hx.report_stopped();
    hx.report_stopped();
    fx.rc.process_pending();
    assert_eq!(fx.count("Y.stop"), 1);

    fx.stopped(y);
    fx.stopped(y);
    assert!(fx.rc.is_stopped());
    let stopped = fx
        .lifecycle()
        .into_iter()
        .filter(|e| *e == SessionEvent::Stopped)
        .count();
    assert_eq!(stopped, 1);
}

#[test]
fn test_supports_re_running_requires_all_done_and_flag() {
    let mut fx = Fixture::new();
    let a = fx.add("A", true, true);
    let b = fx.add("B", true, true);

    assert!(!fx.rc.supports_re_running());

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    assert!(!fx.rc.supports_re_running());

    fx.rc.initiate_stop();
    fx.rc.process_pending();
    assert!(fx.rc.is_stopped());
    assert!(fx.rc.supports_re_running());

    fx.rc.worker_mut(b).unwrap().set_supports_re_running(false);
    assert!(!fx.rc.supports_re_running());
    let err = fx.rc.initiate_re_start().unwrap_err();
    assert!(matches!(session_error(err), SessionError::ReRunNotSupported));
    assert_eq!(fx.state(a), RunWorkerState::Done);
}

#[test]
fn test_dependent_stops_with_its_stop_dependency() {
    let mut fx = Fixture::new();
    let server = fx.add("server", true, false);
    let relay = fx.add("relay", true, false);
    fx.rc.add_stop_dependency(relay, server).unwrap();

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    assert!(fx.rc.is_running());

    fx.stopped(server);
    assert_eq!(fx.count("relay.stop"), 1);
    assert!(fx.rc.is_running());

    fx.stopped(relay);
    assert!(fx.rc.is_stopped());
}

#[test]
fn test_force_stop_skips_worker_stop() {
    let mut fx = Fixture::new();
    let a = fx.add("A", true, false);
    let b = fx.manual("B");

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    assert_eq!(fx.state(b), RunWorkerState::Starting);

    fx.rc.force_stop();
    fx.rc.process_pending();
    assert!(fx.rc.is_stopped());
    assert_eq!(fx.state(a), RunWorkerState::Done);
    assert_eq!(fx.state(b), RunWorkerState::Done);
    assert_eq!(fx.count("A.stop") + fx.count("B.stop"), 0);

    // Late report from the abandoned worker.
    fx.started(b);
    assert_eq!(fx.state(b), RunWorkerState::Done);
}

#[test]
fn test_force_stop_when_stopped_keeps_single_stopped_event() {
    let mut fx = Fixture::new();
    fx.add("A", true, true);

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    fx.rc.initiate_stop();
    fx.rc.process_pending();
    assert!(fx.rc.is_stopped());

    fx.rc.force_stop();
    fx.rc.process_pending();
    assert!(fx.rc.is_stopped());

    let stopped = fx
        .lifecycle()
        .into_iter()
        .filter(|e| *e == SessionEvent::Stopped)
        .count();
    assert_eq!(stopped, 1);
}

#[test]
fn test_deferred_start_dropped_after_force_stop() {
    let mut fx = Fixture::new();
    fx.manual("A");

    fx.rc.initiate_start().unwrap();
    fx.rc.force_stop();
    fx.rc.process_pending();
    assert!(fx.calls().is_empty());
}

#[test]
fn test_finish_after_stop_is_terminal() {
    let mut fx = Fixture::new();
    fx.add("A", true, true);

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    fx.rc.initiate_stop();
    fx.rc.process_pending();
    assert!(fx.rc.is_stopped());

    fx.rc.initiate_finish();
    fx.rc.initiate_finish();
    fx.rc.process_pending();
    assert!(fx.rc.is_finished());

    let err = fx.rc.initiate_start().unwrap_err();
    assert!(matches!(session_error(err), SessionError::Finished));
    fx.rc.force_stop();
    assert!(fx.rc.is_finished());

    let finished = fx
        .lifecycle()
        .into_iter()
        .filter(|e| *e == SessionEvent::Finished)
        .count();
    assert_eq!(finished, 1);
}

#[test]
fn test_finish_while_running_stops_workers() {
    let mut fx = Fixture::new();
    let a = fx.add("A", true, false);

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    fx.rc.initiate_finish();
    fx.rc.process_pending();
    assert_eq!(fx.rc.state(), RunControlState::Finishing);
    assert_eq!(fx.count("A.stop"), 1);

    fx.stopped(a);
    assert!(fx.rc.is_finished());
    assert_eq!(
        fx.lifecycle(),
        [SessionEvent::AboutToStart, SessionEvent::Started, SessionEvent::Finished]
    );
}

#[test]
fn test_failure_before_start_aborts_startup() {
    let mut fx = Fixture::new();
    let a = fx.manual("A");
    fx.handle(a).report_failure("broken setup");

    let err = fx.rc.initiate_start().unwrap_err();
    assert!(matches!(
        session_error(err),
        SessionError::StartupAborted { ref message } if message == "broken setup"
    ));
    assert!(fx.calls().is_empty());
    assert!(fx.lifecycle().contains(&SessionEvent::StartupFailed {
        message: "broken setup".to_string(),
    }));
}

#[test]
fn test_report_done_collapses_lifecycle() {
    struct OneShot;

    impl RunWorker for OneShot {
        fn start(&mut self, handle: &WorkerHandle, _context: &RunContext) {
            handle.report_done();
        }
    }

    let mut fx = Fixture::new();
    let one = fx.rc.add_worker("one-shot", OneShot);

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();

    assert_eq!(fx.state(one), RunWorkerState::Done);
    assert!(fx.rc.is_stopped());
    assert_eq!(
        fx.lifecycle(),
        [SessionEvent::AboutToStart, SessionEvent::Started, SessionEvent::Stopped]
    );
}

#[test]
fn test_done_dependency_unblocks_dependent() {
    struct OneShot;

    impl RunWorker for OneShot {
        fn start(&mut self, handle: &WorkerHandle, _context: &RunContext) {
            handle.report_done();
        }
    }

    let mut fx = Fixture::new();
    let main = fx.manual("main");
    let prep = fx.rc.add_worker("prep", OneShot);
    fx.rc.add_start_dependency(main, prep).unwrap();

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    assert_eq!(fx.state(prep), RunWorkerState::Done);
    assert_eq!(fx.calls(), ["main.start"]);

    fx.started(main);
    assert!(fx.rc.is_running());
}

#[test]
fn test_dependency_graph_validation() {
    let mut fx = Fixture::new();
    let a = fx.manual("A");
    let b = fx.manual("B");
    let c = fx.manual("C");

    fx.rc.add_start_dependency(a, b).unwrap();
    fx.rc.add_start_dependency(b, c).unwrap();
    fx.rc.add_start_dependency(a, b).unwrap();
    assert_eq!(fx.rc.worker(a).unwrap().start_dependencies(), [b]);

    let err = fx.rc.add_start_dependency(c, a).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"worker error: dependency of 'C' on 'A' would create a cycle");
    assert!(fx.rc.add_stop_dependency(a, a).is_err());
    // Start and stop edges are separate graphs.
    fx.rc.add_stop_dependency(c, a).unwrap();

    let err = fx.rc.add_start_dependency(WorkerId::new(7), a).unwrap_err();
    assert!(matches!(
        err,
        RunError::Worker(ref e) if matches!(**e, WorkerError::UnknownWorker { index: 7 })
    ));
}

#[test]
fn test_process_handle_changes_once_and_clears_on_stop() {
    let mut fx = Fixture::new();
    let a = fx.add("A", true, true);

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    let h = fx.handle(a);
    h.set_application_process_handle(Some(ProcessHandle::new(42)));
    h.set_application_process_handle(Some(ProcessHandle::new(42)));
    fx.rc.process_pending();
    assert_eq!(fx.rc.application_process_handle(), Some(ProcessHandle::new(42)));

    fx.rc.initiate_stop();
    fx.rc.process_pending();
    assert!(fx.rc.application_process_handle().is_none());

    let changes: Vec<_> = fx
        .events
        .try_iter()
        .filter_map(|e| match e {
            SessionEvent::ApplicationProcessHandleChanged(h) => Some(h),
            _ => None,
        })
        .collect();
    assert_eq!(changes, [Some(ProcessHandle::new(42)), None]);
}

#[test]
fn test_recorded_data() {
    let mut fx = Fixture::new();
    let a = fx.manual("A");
    fx.handle(a).record_data("port", serde_json::json!(4711));
    fx.rc.process_pending();

    assert_eq!(fx.rc.recorded_data(a, "port"), Some(&serde_json::json!(4711)));
    assert!(fx.rc.recorded_data(a, "missing").is_none());
}

#[test]
fn test_host_handle_commands() {
    let mut fx = Fixture::new();
    let a = fx.add("A", true, true);
    let host = fx.rc.handle();

    assert!(host.initiate_start());
    fx.rc.process_pending();
    assert!(fx.rc.is_running());

    assert!(host.initiate_stop());
    fx.rc.process_pending();
    assert!(fx.rc.is_stopped());

    // Stop outside Starting/Running is ignored.
    assert!(host.initiate_stop());
    fx.rc.process_pending();
    assert!(fx.rc.is_stopped());

    assert!(host.initiate_re_start());
    fx.rc.process_pending();
    assert!(fx.rc.is_running());
    assert_eq!(fx.count("A.start"), 2);

    assert!(host.force_stop());
    fx.rc.process_pending();
    assert_eq!(fx.state(a), RunWorkerState::Done);
    assert!(fx.rc.is_stopped());
}

#[tokio::test(start_paused = true)]
async fn test_start_watchdog_callback_replaces_failure() {
    let mut fx = Fixture::new();
    let e = fx.manual("E");
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    fx.rc.worker_mut(e).unwrap().set_start_timeout(
        Duration::from_millis(50),
        Some(Box::new(move |handle: &WorkerHandle| {
            counter.fetch_add(1, Ordering::SeqCst);
            handle.report_started();
        })),
    );

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    while !fx.rc.is_running() {
        assert!(fx.rc.next_event().await);
    }

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(fx.rc.last_failure().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stop_watchdog_fails_unresponsive_worker() {
    let mut fx = Fixture::new();
    let a = fx.add("A", true, false);
    fx.rc
        .worker_mut(a)
        .unwrap()
        .set_stop_timeout(Duration::from_millis(200), None);

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    fx.rc.initiate_stop();

    let state = fx.rc.run_until_quiescent().await;
    assert_eq!(state, RunControlState::Stopped);
    assert_eq!(fx.rc.last_failure(), Some("Worker stop timed out."));
    assert_eq!(fx.rc.failure_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reported_start_disarms_watchdog() {
    let mut fx = Fixture::new();
    let a = fx.manual("A");
    fx.rc
        .worker_mut(a)
        .unwrap()
        .set_start_timeout(Duration::from_millis(100), None);

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    assert!(fx.rc.worker(a).unwrap().start_watchdog().is_armed());

    fx.started(a);
    assert!(!fx.rc.worker(a).unwrap().start_watchdog().is_armed());
    tokio::time::sleep(Duration::from_millis(500)).await;
    fx.rc.process_pending();
    assert!(fx.rc.is_running());
    assert!(fx.rc.last_failure().is_none());
}

#[test]
fn test_empty_session_runs_immediately() {
    let mut fx = Fixture::new();
    fx.rc.initiate_start().unwrap();
    assert!(fx.rc.is_running());
    assert!(fx.rc.supports_re_running());
}

#[test]
fn test_unexpected_start_report_is_reported() {
    let mut fx = Fixture::new();
    let a = fx.manual("A");
    let b = fx.add("B", true, false);

    fx.rc.initiate_start().unwrap();
    fx.rc.process_pending();
    // A is Starting, session still Starting; stop the session first.
    fx.rc.initiate_stop();
    fx.rc.process_pending();
    assert!(fx.rc.is_stopping());
    assert_eq!(fx.count("A.stop"), 1);
    assert_eq!(fx.state(b), RunWorkerState::Done);

    // A reports started after it was asked to stop: ignored.
    fx.started(a);
    assert_eq!(fx.state(a), RunWorkerState::Stopping);

    fx.stopped(a);
    assert!(fx.rc.is_stopped());
}

// --- Randomized sessions ---

const NAMES: [&str; 10] = ["w0", "w1", "w2", "w3", "w4", "w5", "w6", "w7", "w8", "w9"];

/// Worker count plus start edges (to an earlier worker) and stop edges (to a
/// later worker), so each graph is acyclic.
fn graph_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>, Vec<(usize, usize)>)> {
    (1usize..=10).prop_flat_map(|n| {
        let edge = || (0..n, any::<prop::sample::Index>());
        let start = prop::collection::vec(edge(), 0..15).prop_map(move |raw| {
            raw.into_iter()
                .filter(|(from, _)| *from > 0)
                .map(|(from, to)| (from, to.index(from)))
                .collect::<Vec<_>>()
        });
        let stop = prop::collection::vec(edge(), 0..15).prop_map(move |raw| {
            raw.into_iter()
                .filter(|(from, _)| *from + 1 < n)
                .map(|(from, to)| (from, from + 1 + to.index(n - from - 1)))
                .collect::<Vec<_>>()
        });
        (Just(n), start, stop)
    })
}

#[derive(Debug, Clone, Copy)]
enum Report {
    Started,
    Stopped,
    Done,
    Failed,
}

fn report_strategy() -> impl Strategy<Value = Report> {
    prop_oneof![
        Just(Report::Started),
        Just(Report::Stopped),
        Just(Report::Done),
        Just(Report::Failed),
    ]
}

fn build_graph(
    fx: &mut Fixture,
    n: usize,
    start: &[(usize, usize)],
    stop: &[(usize, usize)],
    auto: bool,
) -> Vec<WorkerId> {
    let ids: Vec<_> = NAMES[..n].iter().map(|&name| fx.add(name, auto, auto)).collect();
    for &(from, to) in start {
        fx.rc.add_start_dependency(ids[from], ids[to]).unwrap();
    }
    for &(from, to) in stop {
        fx.rc.add_stop_dependency(ids[from], ids[to]).unwrap();
    }
    ids
}

fn ranks(fx: &Fixture, ids: &[WorkerId]) -> Vec<u8> {
    ids.iter().map(|id| fx.state(*id).rank()).collect()
}

proptest! {
    #[test]
    fn prop_cooperative_workers_start_and_stop((n, start, stop) in graph_strategy()) {
        let mut fx = Fixture::new();
        let ids = build_graph(&mut fx, n, &start, &stop, true);

        fx.rc.initiate_start().unwrap();
        fx.rc.process_pending();
        prop_assert!(fx.rc.is_running());

        fx.rc.initiate_stop();
        fx.rc.process_pending();
        prop_assert!(fx.rc.is_stopped());
        for id in &ids {
            prop_assert_eq!(fx.state(*id), RunWorkerState::Done);
        }
    }

    #[test]
    fn prop_worker_states_only_move_forward(
        (n, start, stop) in graph_strategy(),
        reports in prop::collection::vec((any::<prop::sample::Index>(), report_strategy()), 0..40),
    ) {
        let mut fx = Fixture::new();
        let ids = build_graph(&mut fx, n, &start, &stop, false);

        fx.rc.initiate_start().unwrap();
        fx.rc.process_pending();
        let mut last = ranks(&fx, &ids);

        for (pick, report) in reports {
            // Only workers whose start was invoked report back.
            let active: Vec<WorkerId> = ids
                .iter()
                .copied()
                .filter(|id| {
                    matches!(
                        fx.state(*id),
                        RunWorkerState::Starting | RunWorkerState::Running | RunWorkerState::Stopping
                    )
                })
                .collect();
            if active.is_empty() {
                break;
            }
            let handle = fx.handle(active[pick.index(active.len())]);
            match report {
                Report::Started => handle.report_started(),
                Report::Stopped => handle.report_stopped(),
                Report::Done => handle.report_done(),
                Report::Failed => handle.report_failure("failed"),
            }
            fx.rc.process_pending();

            let now = ranks(&fx, &ids);
            for (before, after) in last.iter().zip(&now) {
                prop_assert!(after >= before, "rank went from {} to {}", before, after);
            }
            last = now;
        }

        if fx.rc.is_starting() || fx.rc.is_running() {
            fx.rc.initiate_stop();
            fx.rc.process_pending();
        }
        for _ in 0..=n {
            let stopping: Vec<WorkerId> = ids
                .iter()
                .copied()
                .filter(|id| fx.state(*id) == RunWorkerState::Stopping)
                .collect();
            if stopping.is_empty() {
                break;
            }
            for id in stopping {
                fx.handle(id).report_stopped();
            }
            fx.rc.process_pending();
        }

        prop_assert!(fx.rc.is_stopped(), "session ended in {}", fx.rc.state());
        for id in &ids {
            prop_assert_eq!(fx.state(*id), RunWorkerState::Done);
        }
    }
}
