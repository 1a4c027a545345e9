// crates/colony-store-sqlite/tests/cron_uniqueness.rs
// ============================================================================
// Module: Cron Uniqueness Tests
// Description: Colony-scoped cron name arbitration and schedule updates.
// Purpose: Validate duplicate rejection, cross-colony independence, race
//          arbitration, and in-place schedule advancement.
// ============================================================================

//! ## Overview
//! Cron registration is the race-sensitive operation of this tier: several
//! schedulers may register the same name concurrently, and exactly one may
//! win. The loser must see the same already-exists error as a plain
//! duplicate.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::thread;

use colony_core::ColonyStore;
use colony_core::CronId;
use colony_core::CronStore;
use colony_core::GraphId;
use colony_core::StoreError;
use tempfile::TempDir;

#[test]
fn cron_names_are_unique_per_colony_only() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    store.add_colony(&common::colony("beta")).unwrap();

    store.add_cron(&common::cron("alpha", "nightly")).unwrap();
    let dup = store.add_cron(&common::cron("alpha", "nightly")).unwrap_err();
    assert!(matches!(dup, StoreError::AlreadyExists { kind: "cron", .. }));
    // Two colonies may each own a cron with the same name.
    store.add_cron(&common::cron("beta", "nightly")).unwrap();
    assert_eq!(store.count_crons_by_colony("alpha").unwrap(), 1);
    assert_eq!(store.count_crons_by_colony("beta").unwrap(), 1);
}

#[test]
fn concurrent_registration_admits_exactly_one_winner() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();

    let threads: Vec<_> = (0 .. 8)
        .map(|index| {
            let store = store.clone();
            thread::spawn(move || {
                let mut cron = common::cron("alpha", "nightly");
                cron.cron_id = CronId::new(format!("candidate-{index}"));
                store.add_cron(&cron)
            })
        })
        .collect();
    let results: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.iter().filter(|result| result.is_err()) {
        assert!(matches!(
            result,
            Err(StoreError::AlreadyExists { kind: "cron", .. })
        ));
    }
    assert_eq!(store.count_crons_by_colony("alpha").unwrap(), 1);
}

#[test]
fn schedule_advancement_mutates_in_place() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    let cron = common::cron("alpha", "nightly");
    store.add_cron(&cron).unwrap();

    let graph = GraphId::new("graph-7");
    store.update_cron_schedule(&cron.cron_id, 5_000, 4_000, &graph).unwrap();

    let advanced = store.get_cron_by_id(&cron.cron_id).unwrap().unwrap();
    assert_eq!(advanced.next_run, 5_000);
    assert_eq!(advanced.last_run, 4_000);
    assert_eq!(advanced.prev_process_graph_id, graph);
    // The schedule definition itself is untouched.
    assert_eq!(advanced.interval_seconds, 60);
    assert_eq!(advanced.workflow_spec, "{}");

    let missing = store
        .update_cron_schedule(&CronId::new("ghost"), 1, 1, &graph)
        .unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { kind: "cron", .. }));
}

#[test]
fn cron_removal_and_listing() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    store.add_cron(&common::cron("alpha", "weekly")).unwrap();
    store.add_cron(&common::cron("alpha", "daily")).unwrap();

    let listed = store.get_crons_by_colony("alpha").unwrap();
    let names: Vec<&str> = listed.iter().map(|cron| cron.name.as_str()).collect();
    assert_eq!(names, ["daily", "weekly"]);

    let daily_id = CronId::new("alpha-daily-id");
    store.remove_cron_by_id(&daily_id).unwrap();
    assert!(store.get_cron_by_id(&daily_id).unwrap().is_none());
    let missing = store.remove_cron_by_id(&daily_id).unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { kind: "cron", .. }));

    store.remove_crons_by_colony("alpha").unwrap();
    assert_eq!(store.count_crons_by_colony("alpha").unwrap(), 0);
}
