// crates/colony-core/src/interfaces/mod.rs
// ============================================================================
// Module: Colony Store Interfaces
// Description: Backend-agnostic storage contracts and the domain error.
// Purpose: Define the capability traits a durable store backend implements.
// Dependencies: serde, thiserror, crate::core
// ============================================================================

//! ## Overview
//! Capability traits for the persistence tier. A backend implements all of
//! them on one store type (the sqlite backend does), but callers depend only
//! on the capabilities they use. Every method is a synchronous, blocking
//! call returning its outcome plus a [`StoreError`]; no panics cross this
//! boundary. Single-entity lookups return `Ok(None)` on absence, a valid
//! non-exceptional outcome, while mutations that require an existing target
//! return [`StoreError::NotFound`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::entities::Attribute;
use crate::core::entities::Colony;
use crate::core::entities::Cron;
use crate::core::entities::Executor;
use crate::core::entities::File;
use crate::core::entities::Function;
use crate::core::entities::FunctionStats;
use crate::core::entities::LogEntry;
use crate::core::entities::Process;
use crate::core::entities::ProcessGraph;
use crate::core::entities::Snapshot;
use crate::core::identifiers::ColonyId;
use crate::core::identifiers::CronId;
use crate::core::identifiers::ExecutorId;
use crate::core::identifiers::FileId;
use crate::core::identifiers::FunctionId;
use crate::core::identifiers::GraphId;
use crate::core::identifiers::ProcessId;
use crate::core::identifiers::SnapshotId;
use crate::core::state::ProcessState;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Domain-level store errors shared by every capability trait.
///
/// # Invariants
/// - Variants are stable for programmatic handling; callers inspect the
///   class before trusting an empty result.
/// - `AlreadyExists` is raised identically by the application-level
///   pre-check and by the translated storage constraint violation, so a
///   race loser is indistinguishable from a known duplicate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store unreachable or closed; surfaces on every call, never retried
    /// internally.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// An operation that requires an existing target found none.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Entity kind label, e.g. `colony`.
        kind: &'static str,
        /// Name or identifier of the missing entity.
        name: String,
    },
    /// Name-uniqueness violation for a named resource.
    #[error("{kind} already exists: {name}")]
    AlreadyExists {
        /// Entity kind label, e.g. `cron`.
        kind: &'static str,
        /// Name of the colliding resource.
        name: String,
    },
    /// Invariant violation that should be structurally unreachable; fatal to
    /// the operation, never silently tolerated.
    #[error("store consistency violation: {0}")]
    Consistency(String),
    /// Caller-supplied argument rejected before touching the store.
    #[error("invalid argument: {0}")]
    Invalid(String),
    /// Storage engine failure not covered by another class.
    #[error("store error: {0}")]
    Store(String),
}

impl StoreError {
    /// Builds a not-found error for the given entity kind and name.
    #[must_use]
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Builds an already-exists error for the given entity kind and name.
    #[must_use]
    pub fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }
}

// ============================================================================
// SECTION: Colony Store
// ============================================================================

/// Colony registration, identity management, and the cascade coordinator.
pub trait ColonyStore {
    /// Registers a new colony.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the colony name is taken.
    fn add_colony(&self, colony: &Colony) -> Result<(), StoreError>;

    /// Lists all colonies ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_colonies(&self) -> Result<Vec<Colony>, StoreError>;

    /// Looks up a colony by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_colony_by_id(&self, colony_id: &ColonyId) -> Result<Option<Colony>, StoreError>;

    /// Looks up a colony by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_colony_by_name(&self, name: &str) -> Result<Option<Colony>, StoreError>;

    /// Counts registered colonies.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn count_colonies(&self) -> Result<u64, StoreError>;

    /// Renames a colony and repoints current child rows at the new name.
    /// Historical log rows keep the colony identity they captured by value;
    /// audit consumers must treat pre-rename log rows as referring to the
    /// old identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when `old_name` does not exist and
    /// [`StoreError::AlreadyExists`] when `new_name` is taken.
    fn rename_colony(&self, old_name: &str, new_name: &str) -> Result<(), StoreError>;

    /// Replaces a colony's identifier. Child rows are keyed by colony name
    /// and are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when `old_id` does not exist.
    fn change_colony_id(&self, old_id: &ColonyId, new_id: &ColonyId) -> Result<(), StoreError>;

    /// Removes a colony and, in one transaction, every executor, function,
    /// cron, file, snapshot, log, process, process graph, and attribute
    /// scoped to it, requeueing in-flight work first. Entities of other
    /// colonies are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the colony does not exist.
    fn remove_colony(&self, name: &str) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Executor Store
// ============================================================================

/// Executor registration, approval lifecycle, and removal with requeue.
pub trait ExecutorStore {
    /// Registers a new executor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the executor name is taken
    /// within the colony.
    fn add_executor(&self, executor: &Executor) -> Result<(), StoreError>;

    /// Looks up an executor by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_executor_by_id(&self, executor_id: &ExecutorId)
    -> Result<Option<Executor>, StoreError>;

    /// Looks up an executor by colony-scoped name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_executor_by_name(
        &self,
        colony_name: &str,
        name: &str,
    ) -> Result<Option<Executor>, StoreError>;

    /// Lists a colony's executors ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_executors_by_colony(&self, colony_name: &str) -> Result<Vec<Executor>, StoreError>;

    /// Counts executors across all colonies.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn count_executors(&self) -> Result<u64, StoreError>;

    /// Counts a colony's executors.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn count_executors_by_colony(&self, colony_name: &str) -> Result<u64, StoreError>;

    /// Moves an executor to the approved state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the executor does not exist.
    fn approve_executor(&self, executor_id: &ExecutorId) -> Result<(), StoreError>;

    /// Moves an executor to the rejected state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the executor does not exist.
    fn reject_executor(&self, executor_id: &ExecutorId) -> Result<(), StoreError>;

    /// Records a keep-alive. Updates `last_heard_from` only; idempotent and
    /// otherwise side-effect-free.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the executor does not exist.
    fn mark_alive(&self, executor_id: &ExecutorId, heard_at: i64) -> Result<(), StoreError>;

    /// Removes an executor, requeues its RUNNING processes back to WAITING
    /// with cleared assignment and zeroed start/end times, and purges its
    /// published functions, in that order, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the executor does not exist.
    fn remove_executor_by_id(&self, executor_id: &ExecutorId) -> Result<(), StoreError>;

    /// Removes all executors of a colony with the same requeue-then-purge
    /// semantics as [`ExecutorStore::remove_executor_by_id`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn remove_executors_by_colony(&self, colony_name: &str) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Function Store
// ============================================================================

/// Published-function registry with in-place statistics updates.
pub trait FunctionStore {
    /// Registers a published function.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the (executor, function
    /// name) pair is taken within the colony.
    fn add_function(&self, function: &Function) -> Result<(), StoreError>;

    /// Looks up a function by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_function_by_id(&self, function_id: &FunctionId)
    -> Result<Option<Function>, StoreError>;

    /// Lists the functions published by one executor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_functions_by_executor(
        &self,
        colony_name: &str,
        executor_name: &str,
    ) -> Result<Vec<Function>, StoreError>;

    /// Lists every function published in a colony.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_functions_by_colony(&self, colony_name: &str) -> Result<Vec<Function>, StoreError>;

    /// Replaces a function's statistics in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the function does not exist.
    fn update_function_stats(
        &self,
        function_id: &FunctionId,
        stats: &FunctionStats,
    ) -> Result<(), StoreError>;

    /// Removes a function by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the function does not exist.
    fn remove_function_by_id(&self, function_id: &FunctionId) -> Result<(), StoreError>;

    /// Removes every function published by one executor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn remove_functions_by_executor(
        &self,
        colony_name: &str,
        executor_name: &str,
    ) -> Result<(), StoreError>;

    /// Removes every function published in a colony.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn remove_functions_by_colony(&self, colony_name: &str) -> Result<(), StoreError>;

    /// Counts a colony's functions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn count_functions_by_colony(&self, colony_name: &str) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Cron Store
// ============================================================================

/// Cron registry with colony-scoped name uniqueness and in-place schedule
/// advancement.
pub trait CronStore {
    /// Registers a cron. Name uniqueness is colony-scoped: two colonies may
    /// each own a cron with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the cron name is taken
    /// within the colony, including when this call loses a concurrent
    /// creation race.
    fn add_cron(&self, cron: &Cron) -> Result<(), StoreError>;

    /// Looks up a cron by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_cron_by_id(&self, cron_id: &CronId) -> Result<Option<Cron>, StoreError>;

    /// Lists a colony's crons ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_crons_by_colony(&self, colony_name: &str) -> Result<Vec<Cron>, StoreError>;

    /// Advances a cron's schedule in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the cron does not exist.
    fn update_cron_schedule(
        &self,
        cron_id: &CronId,
        next_run: i64,
        last_run: i64,
        prev_process_graph_id: &GraphId,
    ) -> Result<(), StoreError>;

    /// Removes a cron by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the cron does not exist.
    fn remove_cron_by_id(&self, cron_id: &CronId) -> Result<(), StoreError>;

    /// Removes every cron of a colony.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn remove_crons_by_colony(&self, colony_name: &str) -> Result<(), StoreError>;

    /// Counts a colony's crons.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn count_crons_by_colony(&self, colony_name: &str) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: File Store
// ============================================================================

/// Versioned file metadata with store-assigned monotonic revisions.
pub trait FileStore {
    /// Adds a file revision. The caller-supplied sequence number is ignored;
    /// the store assigns the next integer for the `(colony, label, name)`
    /// key atomically with respect to concurrent writers. Returns the stored
    /// row with the assigned sequence number and insertion time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn add_file(&self, file: &File) -> Result<File, StoreError>;

    /// Looks up one file revision by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_file_by_id(&self, file_id: &FileId) -> Result<Option<File>, StoreError>;

    /// Returns the revision with the maximum sequence number for the key, or
    /// `None` if the key has no revisions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_latest_file(
        &self,
        colony_name: &str,
        label: &str,
        name: &str,
    ) -> Result<Option<File>, StoreError>;

    /// Returns all revisions for the key, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_files_by_name(
        &self,
        colony_name: &str,
        label: &str,
        name: &str,
    ) -> Result<Vec<File>, StoreError>;

    /// Lists the distinct file names registered under a label.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_file_names_by_label(
        &self,
        colony_name: &str,
        label: &str,
    ) -> Result<Vec<String>, StoreError>;

    /// Lists the distinct labels used by a colony.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_file_labels(&self, colony_name: &str) -> Result<Vec<String>, StoreError>;

    /// Lists the distinct labels of a colony starting with a prefix.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_file_labels_by_prefix(
        &self,
        colony_name: &str,
        prefix: &str,
    ) -> Result<Vec<String>, StoreError>;

    /// Counts a colony's file revision rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn count_files_by_colony(&self, colony_name: &str) -> Result<u64, StoreError>;

    /// Removes a single file revision by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the revision does not exist.
    fn remove_file_by_id(&self, file_id: &FileId) -> Result<(), StoreError>;

    /// Removes **all** revisions of the `(colony, label, name)` key; "by
    /// name" deletion is all-revisions, not latest-only.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the key has no revisions.
    fn remove_file_by_name(
        &self,
        colony_name: &str,
        label: &str,
        name: &str,
    ) -> Result<(), StoreError>;

    /// Removes every file row of a colony, along with its sequence counters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn remove_files_by_colony(&self, colony_name: &str) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Snapshot Store
// ============================================================================

/// Immutable point-in-time file groupings built on the file store.
pub trait SnapshotStore {
    /// Creates a snapshot from the current latest revision of every distinct
    /// file name under `label`. The resolved set is fixed at creation and
    /// never recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the snapshot name is taken
    /// within the colony and [`StoreError::Consistency`] when a name fails
    /// to resolve to exactly one latest revision.
    fn create_snapshot(
        &self,
        colony_name: &str,
        label: &str,
        name: &str,
    ) -> Result<Snapshot, StoreError>;

    /// Looks up a snapshot by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_snapshot_by_id(&self, snapshot_id: &SnapshotId)
    -> Result<Option<Snapshot>, StoreError>;

    /// Looks up a snapshot by colony-scoped name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_snapshot_by_name(
        &self,
        colony_name: &str,
        name: &str,
    ) -> Result<Option<Snapshot>, StoreError>;

    /// Lists a colony's snapshots, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_snapshots_by_colony(&self, colony_name: &str) -> Result<Vec<Snapshot>, StoreError>;

    /// Removes a snapshot by identifier. Underlying files are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the snapshot does not exist.
    fn remove_snapshot_by_id(&self, snapshot_id: &SnapshotId) -> Result<(), StoreError>;

    /// Removes a snapshot by colony-scoped name. Underlying files are
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the snapshot does not exist.
    fn remove_snapshot_by_name(&self, colony_name: &str, name: &str) -> Result<(), StoreError>;

    /// Removes every snapshot of a colony. Underlying files are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn remove_snapshots_by_colony(&self, colony_name: &str) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Log Store
// ============================================================================

/// Append-only process logs.
pub trait LogStore {
    /// Appends a log line. The store stamps the insertion time; the entry's
    /// `added` field is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn add_log(&self, entry: &LogEntry) -> Result<(), StoreError>;

    /// Returns up to `limit` log lines for a process ordered by the
    /// caller-supplied event timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_logs_by_process(
        &self,
        process_id: &ProcessId,
        limit: u64,
    ) -> Result<Vec<LogEntry>, StoreError>;

    /// Returns log lines for a process with an event timestamp strictly
    /// greater than `since`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_logs_by_process_since(
        &self,
        process_id: &ProcessId,
        since: i64,
    ) -> Result<Vec<LogEntry>, StoreError>;

    /// Counts a colony's log lines.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn count_logs_by_colony(&self, colony_name: &str) -> Result<u64, StoreError>;

    /// Removes every log line of a colony.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn remove_logs_by_colony(&self, colony_name: &str) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Process Store (collaborator surface)
// ============================================================================

/// The slice of the collaborator process store this tier consumes and
/// writes into: seeding rows, reading them back, and counting by state.
/// Requeue-on-executor-removal is internal to [`ExecutorStore`].
pub trait ProcessStore {
    /// Inserts a process row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn add_process(&self, process: &Process) -> Result<(), StoreError>;

    /// Looks up a process by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_process_by_id(&self, process_id: &ProcessId) -> Result<Option<Process>, StoreError>;

    /// Counts a colony's processes in a given state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn count_processes(&self, colony_name: &str, state: ProcessState) -> Result<u64, StoreError>;

    /// Inserts a process-graph row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn add_process_graph(&self, graph: &ProcessGraph) -> Result<(), StoreError>;

    /// Looks up a process graph by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_process_graph_by_id(
        &self,
        graph_id: &GraphId,
    ) -> Result<Option<ProcessGraph>, StoreError>;

    /// Inserts a process attribute row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn add_attribute(&self, attribute: &Attribute) -> Result<(), StoreError>;

    /// Lists the attributes attached to a process ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn get_attributes_by_process(
        &self,
        process_id: &ProcessId,
    ) -> Result<Vec<Attribute>, StoreError>;
}

// ============================================================================
// SECTION: Retention Sweep
// ============================================================================

/// Row counts removed by one retention sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetentionReport {
    /// Successful process graphs removed.
    pub graphs_removed: u64,
    /// Successful processes removed.
    pub processes_removed: u64,
    /// Attributes removed alongside their processes.
    pub attributes_removed: u64,
    /// Log lines removed by insertion-time cutoff.
    pub logs_removed: u64,
}

/// Global, time-windowed pruning of terminal-state historical records.
pub trait RetentionSweep {
    /// Deletes, across all colonies: successful process graphs completed
    /// before `now - max_age_seconds`, successful processes completed before
    /// the cutoff together with their attributes, and log rows inserted
    /// before the cutoff. A window that has not elapsed for any record is a
    /// no-op. Invoked by an external scheduler, never self-triggered.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when `max_age_seconds` is negative.
    fn apply_retention_policy(&self, max_age_seconds: i64)
    -> Result<RetentionReport, StoreError>;
}
