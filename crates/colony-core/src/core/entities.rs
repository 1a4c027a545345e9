// crates/colony-core/src/core/entities.rs
// ============================================================================
// Module: Colony Entities
// Description: Entity structs owned by a colony plus collaborator records.
// Purpose: Define the rows this tier persists, with stable serde forms.
// Dependencies: serde, crate::core::identifiers, crate::core::state
// ============================================================================

//! ## Overview
//! Entity structs for the persistence tier. A colony is the root of
//! ownership; every other entity carries a `colony_name` scoping field.
//! Timestamps are unix epoch milliseconds (`i64`); zero means "not set".
//! `Process`, `ProcessGraph`, and `Attribute` belong to the collaborator
//! process store: this tier mutates and prunes them but does not define
//! their lifecycle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::AttributeId;
use crate::core::identifiers::ColonyId;
use crate::core::identifiers::CronId;
use crate::core::identifiers::ExecutorId;
use crate::core::identifiers::FileId;
use crate::core::identifiers::FunctionId;
use crate::core::identifiers::GraphId;
use crate::core::identifiers::ProcessId;
use crate::core::identifiers::SnapshotId;
use crate::core::state::ExecutorState;
use crate::core::state::ProcessState;

// ============================================================================
// SECTION: Colony
// ============================================================================

/// A tenant/namespace owning executors, work, and data.
///
/// # Invariants
/// - `id` and `name` are each globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colony {
    /// Colony identifier.
    pub id: ColonyId,
    /// Colony name; the ownership key for every child entity.
    pub name: String,
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// A worker that registers with a colony and executes assigned work.
///
/// # Invariants
/// - `name` is unique within `colony_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executor {
    /// Executor identifier.
    pub id: ExecutorId,
    /// Executor name, unique within the colony.
    pub name: String,
    /// Owning colony name.
    pub colony_name: String,
    /// Executor type label (caller-defined, e.g. a hardware class).
    pub executor_type: String,
    /// Approval state.
    pub state: ExecutorState,
    /// Capability labels advertised by the executor.
    pub capabilities: Vec<String>,
    /// Unix milliseconds of the last keep-alive; zero if never heard from.
    pub last_heard_from: i64,
    /// Unix milliseconds when the executor was commissioned.
    pub commission_time: i64,
}

// ============================================================================
// SECTION: Function
// ============================================================================

/// Monotonically updated invocation statistics for a published function.
///
/// # Invariants
/// - Updated in place, never append-only; `call_count` never decreases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FunctionStats {
    /// Total invocation count.
    pub call_count: i64,
    /// Minimum observed queue wait in seconds.
    pub min_wait_time: f64,
    /// Maximum observed queue wait in seconds.
    pub max_wait_time: f64,
    /// Minimum observed execution time in seconds.
    pub min_exec_time: f64,
    /// Maximum observed execution time in seconds.
    pub max_exec_time: f64,
    /// Average queue wait in seconds.
    pub avg_wait_time: f64,
    /// Average execution time in seconds.
    pub avg_exec_time: f64,
}

/// A callable function published by an executor.
///
/// # Invariants
/// - One row per (colony, executor, function name) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Function identifier.
    pub function_id: FunctionId,
    /// Name of the publishing executor.
    pub executor_name: String,
    /// Owning colony name.
    pub colony_name: String,
    /// Function name, unique per executor.
    pub func_name: String,
    /// Invocation statistics, updated in place.
    pub stats: FunctionStats,
}

// ============================================================================
// SECTION: Cron
// ============================================================================

/// A recurring trigger that (re)launches a workflow on a schedule.
///
/// # Invariants
/// - `name` is unique within `colony_name` (not globally).
/// - Mutated in place by schedule advancement; never versioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cron {
    /// Cron identifier.
    pub cron_id: CronId,
    /// Owning colony name.
    pub colony_name: String,
    /// Cron name, unique within the colony.
    pub name: String,
    /// Cron expression; empty when `interval_seconds` drives the schedule.
    pub expression: String,
    /// Fixed interval in seconds; zero when `expression` drives the schedule.
    pub interval_seconds: i64,
    /// Whether the next run is randomized within the interval.
    pub random: bool,
    /// Unix milliseconds of the next scheduled run; zero if not yet planned.
    pub next_run: i64,
    /// Unix milliseconds of the last completed run; zero if never run.
    pub last_run: i64,
    /// Serialized workflow specification launched by this cron.
    pub workflow_spec: String,
    /// Identifier of the previously launched process graph (empty if none).
    pub prev_process_graph_id: GraphId,
    /// Whether a new run waits for the previous graph to finish.
    pub wait_for_prev_graph: bool,
}

// ============================================================================
// SECTION: File
// ============================================================================

/// Metadata for one revision of a versioned file.
///
/// # Invariants
/// - The versioning key is `(colony_name, label, name)`.
/// - Rows are never updated, only superseded by a higher `sequence_number`
///   under the same key; sequence numbers start at 1 and are never reused.
/// - File bytes live elsewhere; `backing_reference` points at them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// File identifier for this revision.
    pub file_id: FileId,
    /// Owning colony name.
    pub colony_name: String,
    /// Hierarchical path-like grouping key, e.g. `/data/raw`.
    pub label: String,
    /// File name within the label.
    pub name: String,
    /// Size of the referenced object in bytes.
    pub size_bytes: i64,
    /// Revision number, assigned by the store; caller-supplied values are
    /// ignored on insert.
    pub sequence_number: i64,
    /// Content checksum of the referenced object.
    pub checksum: String,
    /// Opaque reference to the backing object (bytes are not stored here).
    pub backing_reference: String,
    /// Unix milliseconds when the revision row was added.
    pub added: i64,
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// An immutable, named set of file identifiers capturing "latest revision
/// per name" under a label at one point in time.
///
/// # Invariants
/// - `name` is unique within the colony.
/// - `file_ids` is resolved once at creation and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot identifier.
    pub snapshot_id: SnapshotId,
    /// Owning colony name.
    pub colony_name: String,
    /// Label the snapshot was taken over.
    pub label: String,
    /// Snapshot name, unique within the colony.
    pub name: String,
    /// Latest-revision file identifiers captured at creation time.
    pub file_ids: Vec<FileId>,
    /// Unix milliseconds when the snapshot was created.
    pub added: i64,
}

// ============================================================================
// SECTION: Log
// ============================================================================

/// An append-only log line attached to a process.
///
/// # Invariants
/// - `added` (insertion wall-clock, set by the store) drives retention;
///   `timestamp` (caller-supplied event time) drives ordering and "since"
///   queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Process the log line belongs to.
    pub process_id: ProcessId,
    /// Colony name captured by value at insertion time; colony renames are
    /// not propagated to historical log rows.
    pub colony_name: String,
    /// Name of the executor that emitted the line.
    pub executor_name: String,
    /// Caller-supplied event time in unix milliseconds.
    pub timestamp: i64,
    /// Log message.
    pub message: String,
    /// Insertion wall-clock time in unix milliseconds, set by the store.
    pub added: i64,
}

// ============================================================================
// SECTION: Collaborator Records
// ============================================================================

/// A unit of work tracked by the collaborator process store.
///
/// # Invariants
/// - `assigned_executor_name` is the empty string while unassigned.
/// - This tier mutates these fields only when requeueing work after an
///   executor removal, and prunes terminal rows in the retention sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// Process identifier.
    pub process_id: ProcessId,
    /// Owning colony name.
    pub colony_name: String,
    /// Name of the assigned executor; empty while waiting.
    pub assigned_executor_name: String,
    /// Work state.
    pub state: ProcessState,
    /// Unix milliseconds when execution started; zero if not started.
    pub start_time: i64,
    /// Unix milliseconds when execution finished; zero if not finished.
    pub end_time: i64,
}

/// A workflow process graph tracked by the collaborator process store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessGraph {
    /// Process graph identifier.
    pub graph_id: GraphId,
    /// Owning colony name.
    pub colony_name: String,
    /// Aggregate graph state.
    pub state: ProcessState,
    /// Unix milliseconds when the graph completed; zero if not finished.
    pub end_time: i64,
}

/// A key/value attribute attached to a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute identifier.
    pub attribute_id: AttributeId,
    /// Process the attribute is attached to.
    pub process_id: ProcessId,
    /// Owning colony name.
    pub colony_name: String,
    /// Attribute key.
    pub key: String,
    /// Attribute value.
    pub value: String,
}
