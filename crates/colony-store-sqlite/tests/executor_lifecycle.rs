// crates/colony-store-sqlite/tests/executor_lifecycle.rs
// ============================================================================
// Module: Executor Lifecycle Tests
// Description: Registration, approval, keep-alive, and removal requeue.
// Purpose: Validate colony-scoped name arbitration and the
//          remove-then-requeue-then-purge contract.
// ============================================================================

//! ## Overview
//! Executor removal is the operation with cross-entity side effects: its
//! RUNNING processes go back to WAITING with cleared assignment and zeroed
//! times, and its published functions are purged, all in one transaction.
//! Processes in other states and other executors' work stay untouched.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use colony_core::ColonyStore;
use colony_core::ExecutorId;
use colony_core::ExecutorState;
use colony_core::ExecutorStore;
use colony_core::FunctionStore;
use colony_core::ProcessId;
use colony_core::ProcessState;
use colony_core::ProcessStore;
use colony_core::StoreError;
use tempfile::TempDir;

#[test]
fn executor_names_are_unique_per_colony() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    store.add_colony(&common::colony("beta")).unwrap();

    store.add_executor(&common::executor("alpha", "worker-1")).unwrap();
    let dup = store.add_executor(&common::executor("alpha", "worker-1")).unwrap_err();
    assert!(matches!(dup, StoreError::AlreadyExists { kind: "executor", .. }));
    // The same name is free in another colony.
    store.add_executor(&common::executor("beta", "worker-1")).unwrap();
    assert_eq!(store.count_executors().unwrap(), 2);
    assert_eq!(store.count_executors_by_colony("alpha").unwrap(), 1);
}

#[test]
fn approval_lifecycle_and_keep_alive() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    let executor = common::executor("alpha", "worker-1");
    store.add_executor(&executor).unwrap();

    let stored = store.get_executor_by_name("alpha", "worker-1").unwrap().unwrap();
    assert_eq!(stored.state, ExecutorState::Pending);
    assert_eq!(stored.capabilities, ["gpu"]);

    store.approve_executor(&executor.id).unwrap();
    let approved = store.get_executor_by_id(&executor.id).unwrap().unwrap();
    assert_eq!(approved.state, ExecutorState::Approved);

    store.mark_alive(&executor.id, 42_000).unwrap();
    store.mark_alive(&executor.id, 43_000).unwrap();
    let alive = store.get_executor_by_id(&executor.id).unwrap().unwrap();
    assert_eq!(alive.last_heard_from, 43_000);
    // Keep-alives leave everything but the timestamp alone.
    assert_eq!(alive.state, ExecutorState::Approved);
    assert_eq!(alive.commission_time, 1_000);

    store.reject_executor(&executor.id).unwrap();
    let rejected = store.get_executor_by_id(&executor.id).unwrap().unwrap();
    assert_eq!(rejected.state, ExecutorState::Rejected);

    let ghost = ExecutorId::new("ghost");
    assert!(matches!(
        store.approve_executor(&ghost).unwrap_err(),
        StoreError::NotFound { kind: "executor", .. }
    ));
    assert!(matches!(
        store.mark_alive(&ghost, 1).unwrap_err(),
        StoreError::NotFound { kind: "executor", .. }
    ));
}

#[test]
fn removing_an_executor_requeues_its_running_work_and_purges_functions() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    let doomed = common::executor("alpha", "worker-1");
    store.add_executor(&doomed).unwrap();
    store.add_executor(&common::executor("alpha", "worker-2")).unwrap();
    store.add_function(&common::function("alpha", "worker-1", "compute")).unwrap();
    store.add_function(&common::function("alpha", "worker-2", "compute")).unwrap();

    store.add_process(&common::process("alpha", "p-running", "worker-1", ProcessState::Running)).unwrap();
    store.add_process(&common::process("alpha", "p-done", "worker-1", ProcessState::Success)).unwrap();
    store.add_process(&common::process("alpha", "p-other", "worker-2", ProcessState::Running)).unwrap();

    store.remove_executor_by_id(&doomed.id).unwrap();

    assert!(store.get_executor_by_id(&doomed.id).unwrap().is_none());
    let requeued = store.get_process_by_id(&ProcessId::new("p-running")).unwrap().unwrap();
    assert_eq!(requeued.state, ProcessState::Waiting);
    assert_eq!(requeued.assigned_executor_name, "");
    assert_eq!(requeued.start_time, 0);
    assert_eq!(requeued.end_time, 0);
    // Terminal work and other executors' work keep their rows.
    let done = store.get_process_by_id(&ProcessId::new("p-done")).unwrap().unwrap();
    assert_eq!(done.state, ProcessState::Success);
    assert_eq!(done.assigned_executor_name, "worker-1");
    let other = store.get_process_by_id(&ProcessId::new("p-other")).unwrap().unwrap();
    assert_eq!(other.state, ProcessState::Running);

    assert!(store.get_functions_by_executor("alpha", "worker-1").unwrap().is_empty());
    assert_eq!(store.get_functions_by_executor("alpha", "worker-2").unwrap().len(), 1);

    let missing = store.remove_executor_by_id(&doomed.id).unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { kind: "executor", .. }));
}

#[test]
fn removing_all_executors_of_a_colony() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    store.add_colony(&common::colony("beta")).unwrap();
    store.add_executor(&common::executor("alpha", "worker-1")).unwrap();
    store.add_executor(&common::executor("alpha", "worker-2")).unwrap();
    store.add_executor(&common::executor("beta", "worker-1")).unwrap();
    store.add_function(&common::function("alpha", "worker-1", "compute")).unwrap();
    store.add_function(&common::function("beta", "worker-1", "compute")).unwrap();
    store.add_process(&common::process("alpha", "p1", "worker-1", ProcessState::Running)).unwrap();

    store.remove_executors_by_colony("alpha").unwrap();

    assert_eq!(store.count_executors_by_colony("alpha").unwrap(), 0);
    assert_eq!(store.count_functions_by_colony("alpha").unwrap(), 0);
    assert_eq!(store.count_processes("alpha", ProcessState::Waiting).unwrap(), 1);
    // The other colony keeps its executor and function.
    assert_eq!(store.count_executors_by_colony("beta").unwrap(), 1);
    assert_eq!(store.count_functions_by_colony("beta").unwrap(), 1);
}

#[test]
fn executor_listing_is_name_ordered() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    store.add_executor(&common::executor("alpha", "zeta")).unwrap();
    store.add_executor(&common::executor("alpha", "ada")).unwrap();

    let listed = store.get_executors_by_colony("alpha").unwrap();
    let names: Vec<&str> = listed.iter().map(|executor| executor.name.as_str()).collect();
    assert_eq!(names, ["ada", "zeta"]);
}
