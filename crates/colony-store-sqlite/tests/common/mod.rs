// crates/colony-store-sqlite/tests/common/mod.rs
// ============================================================================
// Module: Store Test Helpers
// Description: Shared fixtures for the SQLite colony store suites.
// Purpose: Open per-test databases and build entity fixtures.
// ============================================================================

//! ## Overview
//! Shared helpers for the integration suites: a temp-dir-backed store
//! opener and builders for the entity fixtures the suites seed.

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Each test binary uses a subset of these helpers."
)]

use colony_core::Colony;
use colony_core::ColonyId;
use colony_core::Cron;
use colony_core::CronId;
use colony_core::Executor;
use colony_core::ExecutorId;
use colony_core::ExecutorState;
use colony_core::File;
use colony_core::FileId;
use colony_core::Function;
use colony_core::FunctionId;
use colony_core::FunctionStats;
use colony_core::GraphId;
use colony_core::LogEntry;
use colony_core::Process;
use colony_core::ProcessId;
use colony_core::ProcessState;
use colony_store_sqlite::SqliteColonyStore;
use colony_store_sqlite::SqliteStoreConfig;
use tempfile::TempDir;

/// Opens a store on a fresh database inside the given temp dir.
pub fn open_store(dir: &TempDir) -> SqliteColonyStore {
    let config = SqliteStoreConfig::for_path(dir.path().join("colony.db"));
    SqliteColonyStore::open(config).unwrap()
}

/// Builds a colony fixture named `name` with a derived identifier.
pub fn colony(name: &str) -> Colony {
    Colony {
        id: ColonyId::new(format!("{name}-id")),
        name: name.to_string(),
    }
}

/// Builds a pending executor fixture in `colony_name`.
pub fn executor(colony_name: &str, name: &str) -> Executor {
    Executor {
        id: ExecutorId::new(format!("{colony_name}-{name}-id")),
        name: name.to_string(),
        colony_name: colony_name.to_string(),
        executor_type: "container".to_string(),
        state: ExecutorState::Pending,
        capabilities: vec!["gpu".to_string()],
        last_heard_from: 0,
        commission_time: 1_000,
    }
}

/// Builds a function fixture published by `executor_name`.
pub fn function(colony_name: &str, executor_name: &str, func_name: &str) -> Function {
    Function {
        function_id: FunctionId::new(format!("{colony_name}-{executor_name}-{func_name}-id")),
        executor_name: executor_name.to_string(),
        colony_name: colony_name.to_string(),
        func_name: func_name.to_string(),
        stats: FunctionStats::default(),
    }
}

/// Builds a cron fixture named `name` in `colony_name`.
pub fn cron(colony_name: &str, name: &str) -> Cron {
    Cron {
        cron_id: CronId::new(format!("{colony_name}-{name}-id")),
        colony_name: colony_name.to_string(),
        name: name.to_string(),
        expression: String::new(),
        interval_seconds: 60,
        random: false,
        next_run: 0,
        last_run: 0,
        workflow_spec: "{}".to_string(),
        prev_process_graph_id: GraphId::new(""),
        wait_for_prev_graph: false,
    }
}

/// Builds a file revision fixture; the sequence number is a placeholder the
/// store replaces.
pub fn file(colony_name: &str, label: &str, name: &str, file_id: &str) -> File {
    File {
        file_id: FileId::new(file_id),
        colony_name: colony_name.to_string(),
        label: label.to_string(),
        name: name.to_string(),
        size_bytes: 128,
        sequence_number: 0,
        checksum: format!("sha256:{file_id}"),
        backing_reference: format!("object://{file_id}"),
        added: 0,
    }
}

/// Builds a process fixture in the given state.
pub fn process(
    colony_name: &str,
    process_id: &str,
    assigned_executor_name: &str,
    state: ProcessState,
) -> Process {
    let (start_time, end_time) = match state {
        ProcessState::Waiting => (0, 0),
        ProcessState::Running => (1_000, 0),
        ProcessState::Success | ProcessState::Failed => (1_000, 2_000),
    };
    Process {
        process_id: ProcessId::new(process_id),
        colony_name: colony_name.to_string(),
        assigned_executor_name: assigned_executor_name.to_string(),
        state,
        start_time,
        end_time,
    }
}

/// Builds a log entry fixture with the given event timestamp.
pub fn log_entry(colony_name: &str, process_id: &str, timestamp: i64, message: &str) -> LogEntry {
    LogEntry {
        process_id: ProcessId::new(process_id),
        colony_name: colony_name.to_string(),
        executor_name: "worker-1".to_string(),
        timestamp,
        message: message.to_string(),
        added: 0,
    }
}
