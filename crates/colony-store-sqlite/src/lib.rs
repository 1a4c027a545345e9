// crates/colony-store-sqlite/src/lib.rs
// ============================================================================
// Module: Colony SQLite Store Crate
// Description: Durable colony persistence tier backed by SQLite.
// Purpose: Expose the SQLite store and its configuration surface.
// Dependencies: colony-core, rusqlite, serde, serde_json, thiserror, log
// ============================================================================

//! ## Overview
//! `colony-store-sqlite` implements every storage capability trait of
//! `colony-core` on a single [`SqliteColonyStore`]. Writes are serialized
//! through one mutex-guarded connection; reads round-robin over a small
//! pool of additional connections under WAL. All table names carry a
//! configurable prefix so several stores can share one database file.

pub mod store;

pub use store::SqliteColonyStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
