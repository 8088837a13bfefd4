// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use proptest::prelude::*;

use super::{RunWorker, WorkerFlags, WorkerHandle, WorkerId, can_start, can_stop};
use crate::run::control::{ControlEvent, RunControl};
use crate::run::ids::NORMAL_RUN_MODE;
use crate::run::output::OutputFormat;
use crate::run::state::RunWorkerState;

struct Idle;

impl RunWorker for Idle {}

fn state_strategy() -> impl Strategy<Value = RunWorkerState> {
    prop_oneof![
        Just(RunWorkerState::Initialized),
        Just(RunWorkerState::Starting),
        Just(RunWorkerState::Running),
        Just(RunWorkerState::Stopping),
        Just(RunWorkerState::Done),
    ]
}

/// Random DAG: node `i` may only depend on nodes with a smaller index.
fn dag_strategy() -> impl Strategy<Value = (Vec<RunWorkerState>, Vec<(usize, usize)>)> {
    (1usize..=10).prop_flat_map(|n| {
        let states = prop::collection::vec(state_strategy(), n);
        let edges = prop::collection::vec((1..n.max(2), any::<prop::sample::Index>()), 0..20)
            .prop_map(move |raw| {
                raw.into_iter()
                    .filter(|(from, _)| *from < n)
                    .map(|(from, to)| (from, to.index(from)))
                    .collect::<Vec<_>>()
            });
        (states, edges)
    })
}

fn build(states: &[RunWorkerState], edges: &[(usize, usize)], stop: bool) -> RunControl {
    let mut rc = RunControl::new(NORMAL_RUN_MODE, Arc::default());
    let ids: Vec<_> = (0..states.len())
        .map(|i| rc.add_worker(format!("w{i}"), Idle))
        .collect();
    for &(from, to) in edges {
        let result = if stop {
            rc.add_stop_dependency(ids[from], ids[to])
        } else {
            rc.add_start_dependency(ids[from], ids[to])
        };
        result.unwrap();
    }
    for (id, state) in ids.iter().zip(states) {
        rc.workers[id.index()].state = *state;
    }
    rc
}

proptest! {
    #[test]
    fn prop_can_start_matches_definition((states, edges) in dag_strategy()) {
        let rc = build(&states, &edges, false);
        for (i, state) in states.iter().enumerate() {
            let deps: Vec<usize> = edges.iter().filter(|(f, _)| *f == i).map(|(_, t)| *t).collect();
            let expected = *state == RunWorkerState::Initialized
                && deps.iter().all(|d| matches!(states[*d], RunWorkerState::Running | RunWorkerState::Done));
            prop_assert_eq!(rc.can_start(WorkerId::new(i)), expected);
        }
    }

    #[test]
    fn prop_can_stop_matches_definition((states, edges) in dag_strategy()) {
        let rc = build(&states, &edges, true);
        for (i, state) in states.iter().enumerate() {
            let deps: Vec<usize> = edges.iter().filter(|(f, _)| *f == i).map(|(_, t)| *t).collect();
            let expected = matches!(state, RunWorkerState::Starting | RunWorkerState::Running)
                && deps.iter().all(|d| states[*d] == RunWorkerState::Done);
            prop_assert_eq!(rc.can_stop(WorkerId::new(i)), expected);
        }
    }
}

#[test]
fn test_predicates_without_dependencies() {
    assert!(can_start(RunWorkerState::Initialized, []));
    assert!(!can_start(RunWorkerState::Done, []));
    assert!(can_stop(RunWorkerState::Starting, []));
    assert!(can_stop(RunWorkerState::Running, []));
    assert!(!can_stop(RunWorkerState::Stopping, []));
    assert!(!can_stop(RunWorkerState::Initialized, []));
}

#[test]
fn test_default_flags() {
    let flags = WorkerFlags::default();
    assert!(flags.contains(WorkerFlags::SUPPORTS_RERUNNING));
    assert!(!flags.contains(WorkerFlags::ESSENTIAL));
}

#[test]
fn test_handle_posts_reports() {
    let (tx, rx) = flume::unbounded();
    let handle = WorkerHandle::new(WorkerId::new(2), Arc::from("helper"), tx);

    handle.report_started();
    handle.append_message("hello", OutputFormat::Normal);
    handle.append_message("already terminated\n", OutputFormat::Error);
    handle.report_failure("boom");

    let events: Vec<_> = rx.drain().collect();
    assert!(matches!(events[0], ControlEvent::Started(id) if id == WorkerId::new(2)));
    assert!(matches!(
        &events[1],
        ControlEvent::Message { text, format: OutputFormat::Normal } if text == "hello\n"
    ));
    assert!(matches!(
        &events[2],
        ControlEvent::Message { text, .. } if text == "already terminated\n"
    ));
    assert!(matches!(&events[3], ControlEvent::Failed(_, msg) if msg == "boom"));
}

#[test]
fn test_handle_survives_dropped_session() {
    let (tx, rx) = flume::unbounded();
    let handle = WorkerHandle::new(WorkerId::new(0), Arc::from("orphan"), tx);
    drop(rx);
    handle.report_stopped();
    assert_eq!(handle.label(), "orphan");
}
