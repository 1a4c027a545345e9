// crates/colony-store-sqlite/tests/functions.rs
// ============================================================================
// Module: Function Registry Tests
// Description: Published-function rows and in-place statistics.
// Purpose: Validate per-executor name uniqueness, statistic replacement,
//          lookups, and id-keyed removal.
// ============================================================================

//! ## Overview
//! One row per (colony, executor, function name) triple. Statistics are
//! replaced in place by `update_function_stats`; an update must never
//! append a second row for the triple.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use colony_core::ColonyStore;
use colony_core::ExecutorStore;
use colony_core::FunctionId;
use colony_core::FunctionStats;
use colony_core::FunctionStore;
use colony_core::StoreError;
use tempfile::TempDir;

/// Seeds a colony with one approved executor.
fn seed(store: &colony_store_sqlite::SqliteColonyStore, colony: &str, executor: &str) {
    store.add_colony(&common::colony(colony)).unwrap();
    let worker = common::executor(colony, executor);
    store.add_executor(&worker).unwrap();
    store.approve_executor(&worker.id).unwrap();
}

#[test]
fn stats_update_replaces_the_row_in_place() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    seed(&store, "alpha", "worker-1");
    let function = common::function("alpha", "worker-1", "transform");
    store.add_function(&function).unwrap();

    let stats = FunctionStats {
        call_count: 42,
        min_wait_time: 0.5,
        max_wait_time: 9.0,
        min_exec_time: 1.0,
        max_exec_time: 12.5,
        avg_wait_time: 2.25,
        avg_exec_time: 6.75,
    };
    store.update_function_stats(&function.function_id, &stats).unwrap();

    let stored = store.get_function_by_id(&function.function_id).unwrap().unwrap();
    assert_eq!(stored.stats, stats);
    assert_eq!(stored.func_name, "transform");
    // Still exactly one row for the triple after the update.
    let published = store.get_functions_by_executor("alpha", "worker-1").unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].function_id, function.function_id);
}

#[test]
fn stats_update_requires_an_existing_function() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    seed(&store, "alpha", "worker-1");

    let err = store
        .update_function_stats(&FunctionId::new("ghost"), &FunctionStats::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "function", .. }));
}

#[test]
fn function_names_are_unique_per_executor_only() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    seed(&store, "alpha", "worker-1");
    seed(&store, "beta", "worker-1");
    store.add_executor(&common::executor("alpha", "worker-2")).unwrap();

    store.add_function(&common::function("alpha", "worker-1", "transform")).unwrap();
    let err = store
        .add_function(&common::function("alpha", "worker-1", "transform"))
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { kind: "function", .. }));

    // The same name is fine under another executor or colony.
    store.add_function(&common::function("alpha", "worker-2", "transform")).unwrap();
    store.add_function(&common::function("beta", "worker-1", "transform")).unwrap();
    assert_eq!(store.count_functions_by_colony("alpha").unwrap(), 2);
    assert_eq!(store.count_functions_by_colony("beta").unwrap(), 1);
}

#[test]
fn colony_listing_orders_by_executor_then_name() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    seed(&store, "alpha", "worker-1");
    store.add_executor(&common::executor("alpha", "worker-2")).unwrap();
    store.add_function(&common::function("alpha", "worker-2", "aggregate")).unwrap();
    store.add_function(&common::function("alpha", "worker-1", "transform")).unwrap();
    store.add_function(&common::function("alpha", "worker-1", "ingest")).unwrap();

    let listed = store.get_functions_by_colony("alpha").unwrap();
    let keys: Vec<(&str, &str)> = listed
        .iter()
        .map(|function| (function.executor_name.as_str(), function.func_name.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("worker-1", "ingest"),
            ("worker-1", "transform"),
            ("worker-2", "aggregate"),
        ]
    );
}

#[test]
fn removal_by_id_targets_one_row() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    seed(&store, "alpha", "worker-1");
    let ingest = common::function("alpha", "worker-1", "ingest");
    let transform = common::function("alpha", "worker-1", "transform");
    store.add_function(&ingest).unwrap();
    store.add_function(&transform).unwrap();

    store.remove_function_by_id(&ingest.function_id).unwrap();
    assert!(store.get_function_by_id(&ingest.function_id).unwrap().is_none());
    assert!(store.get_function_by_id(&transform.function_id).unwrap().is_some());

    let err = store.remove_function_by_id(&ingest.function_id).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "function", .. }));
}
