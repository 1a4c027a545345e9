// crates/colony-store-sqlite/tests/retention.rs
// ============================================================================
// Module: Retention Sweep Tests
// Description: Time-windowed pruning of terminal historical records.
// Purpose: Validate cutoff math, terminal-state filtering, attribute
//          co-removal, and the no-op window.
// ============================================================================

//! ## Overview
//! The sweep removes SUCCESS graphs and processes whose completion predates
//! the cutoff (attributes going with their process), and log rows by
//! insertion time. Failed and unfinished work must survive any window.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::thread;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use colony_core::Attribute;
use colony_core::AttributeId;
use colony_core::ColonyStore;
use colony_core::GraphId;
use colony_core::LogStore;
use colony_core::Process;
use colony_core::ProcessGraph;
use colony_core::ProcessId;
use colony_core::ProcessState;
use colony_core::ProcessStore;
use colony_core::RetentionSweep;
use colony_core::StoreError;
use tempfile::TempDir;

/// Returns the current unix epoch in milliseconds.
fn now_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    i64::try_from(now.as_millis()).unwrap()
}

/// Builds a process with explicit state and end time.
fn process_with_end(process_id: &str, state: ProcessState, end_time: i64) -> Process {
    let mut process = common::process("alpha", process_id, "worker-1", state);
    process.end_time = end_time;
    process
}

/// Attaches a key/value attribute to the given process.
fn attribute(process_id: &str, key: &str) -> Attribute {
    Attribute {
        attribute_id: AttributeId::new(format!("{process_id}-{key}")),
        process_id: ProcessId::new(process_id),
        colony_name: "alpha".to_string(),
        key: key.to_string(),
        value: "v".to_string(),
    }
}

#[test]
fn sweep_removes_old_successful_work_and_its_attributes() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    let now = now_millis();
    let ancient = 2_000;

    store.add_process(&process_with_end("p-old", ProcessState::Success, ancient)).unwrap();
    store.add_process(&process_with_end("p-fresh", ProcessState::Success, now)).unwrap();
    store.add_process(&process_with_end("p-failed", ProcessState::Failed, ancient)).unwrap();
    store.add_process(&process_with_end("p-unfinished", ProcessState::Running, 0)).unwrap();
    store.add_attribute(&attribute("p-old", "retries")).unwrap();
    store.add_attribute(&attribute("p-fresh", "retries")).unwrap();
    store
        .add_process_graph(&ProcessGraph {
            graph_id: GraphId::new("g-old"),
            colony_name: "alpha".to_string(),
            state: ProcessState::Success,
            end_time: ancient,
        })
        .unwrap();
    store
        .add_process_graph(&ProcessGraph {
            graph_id: GraphId::new("g-failed"),
            colony_name: "alpha".to_string(),
            state: ProcessState::Failed,
            end_time: ancient,
        })
        .unwrap();

    let report = store.apply_retention_policy(3_600).unwrap();
    assert_eq!(report.graphs_removed, 1);
    assert_eq!(report.processes_removed, 1);
    assert_eq!(report.attributes_removed, 1);

    assert!(store.get_process_by_id(&ProcessId::new("p-old")).unwrap().is_none());
    assert!(store.get_attributes_by_process(&ProcessId::new("p-old")).unwrap().is_empty());
    assert!(store.get_process_by_id(&ProcessId::new("p-fresh")).unwrap().is_some());
    assert_eq!(
        store.get_attributes_by_process(&ProcessId::new("p-fresh")).unwrap().len(),
        1
    );
    // Failed and unfinished work is never pruned.
    assert!(store.get_process_by_id(&ProcessId::new("p-failed")).unwrap().is_some());
    assert!(store.get_process_by_id(&ProcessId::new("p-unfinished")).unwrap().is_some());
    assert!(store.get_process_graph_by_id(&GraphId::new("g-old")).unwrap().is_none());
    assert!(store.get_process_graph_by_id(&GraphId::new("g-failed")).unwrap().is_some());
}

#[test]
fn sweep_prunes_logs_by_insertion_time() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    store.add_log(&common::log_entry("alpha", "p1", 10, "started")).unwrap();
    store.add_log(&common::log_entry("alpha", "p1", 20, "finished")).unwrap();
    assert_eq!(store.count_logs_by_colony("alpha").unwrap(), 2);

    // A wide window keeps everything.
    let wide = store.apply_retention_policy(3_600).unwrap();
    assert_eq!(wide.logs_removed, 0);

    // A zero-width window prunes anything inserted before the sweep.
    thread::sleep(Duration::from_millis(5));
    let zero = store.apply_retention_policy(0).unwrap();
    assert_eq!(zero.logs_removed, 2);
    assert_eq!(store.count_logs_by_colony("alpha").unwrap(), 0);
}

#[test]
fn unelapsed_window_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    let now = now_millis();
    store.add_process(&process_with_end("p1", ProcessState::Success, now)).unwrap();
    store.add_log(&common::log_entry("alpha", "p1", 10, "running")).unwrap();

    let report = store.apply_retention_policy(86_400).unwrap();
    assert_eq!(report, colony_core::RetentionReport::default());
    assert!(store.get_process_by_id(&ProcessId::new("p1")).unwrap().is_some());
    assert_eq!(store.count_logs_by_colony("alpha").unwrap(), 1);
}

#[test]
fn negative_windows_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    let err = store.apply_retention_policy(-1).unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
}
