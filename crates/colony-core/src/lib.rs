// crates/colony-core/src/lib.rs
// ============================================================================
// Module: Colony Core
// Description: Domain types and storage interfaces for the Colony Store tier.
// Purpose: Define entities, identifiers, states, and the store contracts.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! `colony-core` holds the backend-agnostic vocabulary of the Colony Store
//! persistence tier: strongly typed identifiers, the entity structs owned by
//! a colony, executor and process state machines, the capability traits a
//! store backend implements, and the domain error taxonomy shared by every
//! operation. Nothing in this crate touches a database; concrete backends
//! live in sibling crates such as `colony-store-sqlite`.

pub mod core;
pub mod interfaces;

pub use self::core::entities::Attribute;
pub use self::core::entities::Colony;
pub use self::core::entities::Cron;
pub use self::core::entities::Executor;
pub use self::core::entities::File;
pub use self::core::entities::Function;
pub use self::core::entities::FunctionStats;
pub use self::core::entities::LogEntry;
pub use self::core::entities::Process;
pub use self::core::entities::ProcessGraph;
pub use self::core::entities::Snapshot;
pub use self::core::identifiers::AttributeId;
pub use self::core::identifiers::ColonyId;
pub use self::core::identifiers::CronId;
pub use self::core::identifiers::ExecutorId;
pub use self::core::identifiers::FileId;
pub use self::core::identifiers::FunctionId;
pub use self::core::identifiers::GraphId;
pub use self::core::identifiers::ProcessId;
pub use self::core::identifiers::SnapshotId;
pub use self::core::state::ExecutorState;
pub use self::core::state::ProcessState;
pub use self::interfaces::ColonyStore;
pub use self::interfaces::CronStore;
pub use self::interfaces::ExecutorStore;
pub use self::interfaces::FileStore;
pub use self::interfaces::FunctionStore;
pub use self::interfaces::LogStore;
pub use self::interfaces::ProcessStore;
pub use self::interfaces::RetentionReport;
pub use self::interfaces::RetentionSweep;
pub use self::interfaces::SnapshotStore;
pub use self::interfaces::StoreError;
