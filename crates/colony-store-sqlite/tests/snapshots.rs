// crates/colony-store-sqlite/tests/snapshots.rs
// ============================================================================
// Module: Snapshot Tests
// Description: Point-in-time snapshot creation and immutability.
// Purpose: Validate latest-revision resolution, name arbitration, and the
//          independence of snapshots from later file activity.
// ============================================================================

//! ## Overview
//! Snapshots capture "latest revision per name under the exact label" once,
//! at creation. These suites check the resolved set, its immutability
//! against later revisions, name collisions, and that snapshot removal
//! leaves file rows alone.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use colony_core::ColonyStore;
use colony_core::FileId;
use colony_core::FileStore;
use colony_core::SnapshotStore;
use colony_core::StoreError;
use tempfile::TempDir;

#[test]
fn snapshot_captures_latest_revision_per_name() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    store.add_file(&common::file("alpha", "/data", "a.bin", "a1")).unwrap();
    store.add_file(&common::file("alpha", "/data", "a.bin", "a2")).unwrap();
    store.add_file(&common::file("alpha", "/data", "b.bin", "b1")).unwrap();
    // A different label must not leak into the snapshot.
    store.add_file(&common::file("alpha", "/data/raw", "c.bin", "c1")).unwrap();

    let snapshot = store.create_snapshot("alpha", "/data", "baseline").unwrap();
    assert_eq!(snapshot.colony_name, "alpha");
    assert_eq!(snapshot.label, "/data");
    assert!(snapshot.added > 0);
    let mut ids: Vec<&str> = snapshot.file_ids.iter().map(FileId::as_str).collect();
    ids.sort_unstable();
    assert_eq!(ids, ["a2", "b1"]);
}

#[test]
fn snapshots_are_immutable_against_later_revisions() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    store.add_file(&common::file("alpha", "/data", "a.bin", "a1")).unwrap();
    let snapshot = store.create_snapshot("alpha", "/data", "baseline").unwrap();

    store.add_file(&common::file("alpha", "/data", "a.bin", "a2")).unwrap();
    store.add_file(&common::file("alpha", "/data", "new.bin", "n1")).unwrap();

    let reread = store.get_snapshot_by_id(&snapshot.snapshot_id).unwrap().unwrap();
    let ids: Vec<&str> = reread.file_ids.iter().map(FileId::as_str).collect();
    assert_eq!(ids, ["a1"]);
}

#[test]
fn snapshot_names_are_unique_within_a_colony() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    store.add_colony(&common::colony("beta")).unwrap();
    store.add_file(&common::file("alpha", "/data", "a.bin", "a1")).unwrap();
    store.add_file(&common::file("beta", "/data", "a.bin", "b1")).unwrap();

    store.create_snapshot("alpha", "/data", "baseline").unwrap();
    let dup = store.create_snapshot("alpha", "/data", "baseline").unwrap_err();
    assert!(matches!(dup, StoreError::AlreadyExists { kind: "snapshot", .. }));
    // The same name is free in another colony.
    store.create_snapshot("beta", "/data", "baseline").unwrap();
}

#[test]
fn empty_label_yields_an_empty_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    let snapshot = store.create_snapshot("alpha", "/empty", "nothing").unwrap();
    assert!(snapshot.file_ids.is_empty());
}

#[test]
fn removal_never_touches_file_rows() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    store.add_file(&common::file("alpha", "/data", "a.bin", "a1")).unwrap();
    let snapshot = store.create_snapshot("alpha", "/data", "baseline").unwrap();

    store.remove_snapshot_by_id(&snapshot.snapshot_id).unwrap();
    assert!(store.get_snapshot_by_id(&snapshot.snapshot_id).unwrap().is_none());
    assert_eq!(store.count_files_by_colony("alpha").unwrap(), 1);

    store.create_snapshot("alpha", "/data", "again").unwrap();
    store.remove_snapshot_by_name("alpha", "again").unwrap();
    let missing = store.remove_snapshot_by_name("alpha", "again").unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { kind: "snapshot", .. }));
    assert_eq!(store.count_files_by_colony("alpha").unwrap(), 1);
}

#[test]
fn snapshot_lookups_and_listing() {
    let dir = TempDir::new().unwrap();
    let store = common::open_store(&dir);
    store.add_colony(&common::colony("alpha")).unwrap();
    store.add_file(&common::file("alpha", "/data", "a.bin", "a1")).unwrap();
    let first = store.create_snapshot("alpha", "/data", "first").unwrap();
    let second = store.create_snapshot("alpha", "/data", "second").unwrap();

    let by_name = store.get_snapshot_by_name("alpha", "first").unwrap().unwrap();
    assert_eq!(by_name.snapshot_id, first.snapshot_id);
    assert!(store.get_snapshot_by_name("alpha", "ghost").unwrap().is_none());

    let listed = store.get_snapshots_by_colony("alpha").unwrap();
    assert_eq!(listed.len(), 2);
    // Newest first; creation-time tie falls back to name order.
    assert!(
        listed[0].added > listed[1].added
            || (listed[0].added == listed[1].added && listed[0].name < listed[1].name)
    );

    store.remove_snapshots_by_colony("alpha").unwrap();
    assert!(store.get_snapshot_by_id(&second.snapshot_id).unwrap().is_none());
    assert!(store.get_snapshots_by_colony("alpha").unwrap().is_empty());
}
