// crates/colony-store-sqlite/src/store/mod.rs
// ============================================================================
// Module: SQLite Colony Store
// Description: Durable colony persistence tier backed by SQLite WAL.
// Purpose: Own the connections, configuration, errors, and table naming
//          shared by the per-entity trait implementations.
// Dependencies: colony-core, rusqlite, serde, thiserror, log
// ============================================================================

//! ## Overview
//! This module owns the [`SqliteColonyStore`] itself: configuration and its
//! validation, the two-tier error taxonomy, prefixed table naming, connection
//! setup, and lifecycle (`open`/`close`/`drop_schema`). The capability trait
//! implementations live in the sibling submodules and reach back here for
//! the write/read connection guards and the shared SQL helpers.
//!
//! Concurrency model: one write connection behind a mutex serializes all
//! mutations; reads round-robin over a pool of additional connections, which
//! WAL mode keeps non-blocking against the writer. Name uniqueness is
//! enforced by `UNIQUE` constraints; the application-level pre-checks only
//! improve the error message, and a constraint violation from a lost race is
//! translated to the same already-exists error.

// ============================================================================
// SECTION: Imports
// ============================================================================

mod colonies;
mod crons;
mod executors;
mod files;
mod functions;
mod logs;
mod processes;
mod retention;
mod schema;
mod snapshots;

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use colony_core::ProcessState;
use colony_core::StoreError;
use log::debug;
use log::warn;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default table-name prefix.
const DEFAULT_TABLE_PREFIX: &str = "colony_";
/// Maximum table-name prefix length.
const MAX_TABLE_PREFIX_LENGTH: usize = 64;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` colony store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
/// - `table_prefix` must be a valid SQL identifier prefix (ASCII letters,
///   digits, underscores; must not start with a digit) because it is
///   interpolated into table names, never bound as a parameter.
/// - `read_pool_size` must be greater than zero.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Prefix applied to every table name owned by this store.
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    /// Number of read-only connections used for read path isolation.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl SqliteStoreConfig {
    /// Returns a configuration with defaults for the given database path.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            table_prefix: default_table_prefix(),
            read_pool_size: default_read_pool_size(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default table-name prefix.
fn default_table_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}

/// Returns the default read connection pool size.
const fn default_read_pool_size() -> usize {
    4
}

/// Validates the table-name prefix before it is interpolated into SQL.
fn validate_table_prefix(prefix: &str) -> Result<(), SqliteStoreError> {
    if prefix.len() > MAX_TABLE_PREFIX_LENGTH {
        return Err(SqliteStoreError::Invalid("table_prefix exceeds length limit".to_string()));
    }
    if prefix.chars().next().is_some_and(|first| first.is_ascii_digit()) {
        return Err(SqliteStoreError::Invalid(
            "table_prefix must not start with a digit".to_string(),
        ));
    }
    if !prefix.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(SqliteStoreError::Invalid(
            "table_prefix must contain only ASCII letters, digits, and underscores".to_string(),
        ));
    }
    Ok(())
}

/// Validates runtime limits in the store configuration.
fn validate_runtime_limits(config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    if config.read_pool_size == 0 {
        return Err(SqliteStoreError::Invalid(
            "read_pool_size must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding row payloads.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store has been closed.
    #[error("sqlite store closed")]
    Closed,
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid configuration or argument.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Stored data violated an invariant this store maintains.
    #[error("sqlite store consistency violation: {0}")]
    Consistency(String),
    /// Required entity missing.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Entity kind label.
        kind: &'static str,
        /// Missing entity name or identifier.
        name: String,
    },
    /// Name-uniqueness violation.
    #[error("{kind} already exists: {name}")]
    AlreadyExists {
        /// Entity kind label.
        kind: &'static str,
        /// Colliding entity name.
        name: String,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Unavailable(message),
            SqliteStoreError::Closed => Self::Unavailable("store closed".to_string()),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::VersionMismatch(message) => Self::Store(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Consistency(message) => Self::Consistency(message),
            SqliteStoreError::NotFound { kind, name } => Self::NotFound { kind, name },
            SqliteStoreError::AlreadyExists { kind, name } => Self::AlreadyExists { kind, name },
        }
    }
}

/// Wraps a `rusqlite` error as a store engine error.
pub(crate) fn db_err(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Table Naming
// ============================================================================

/// Fully prefixed table names, computed once at open.
///
/// # Invariants
/// - Built only from a validated prefix; safe to interpolate into SQL text.
#[derive(Debug, Clone)]
pub(crate) struct TableNames {
    /// Colony rows.
    pub colonies: String,
    /// Executor rows.
    pub executors: String,
    /// Published-function rows.
    pub functions: String,
    /// Cron rows.
    pub crons: String,
    /// File revision rows.
    pub files: String,
    /// Sequence counters backing file revision allocation.
    pub file_counters: String,
    /// Snapshot rows.
    pub snapshots: String,
    /// Append-only log rows.
    pub logs: String,
    /// Collaborator process rows.
    pub processes: String,
    /// Collaborator process-graph rows.
    pub process_graphs: String,
    /// Process attribute rows.
    pub attributes: String,
    /// Schema version row.
    pub meta: String,
}

impl TableNames {
    /// Builds the table name set for a validated prefix.
    fn new(prefix: &str) -> Self {
        Self {
            colonies: format!("{prefix}colonies"),
            executors: format!("{prefix}executors"),
            functions: format!("{prefix}functions"),
            crons: format!("{prefix}crons"),
            files: format!("{prefix}files"),
            file_counters: format!("{prefix}file_counters"),
            snapshots: format!("{prefix}snapshots"),
            logs: format!("{prefix}logs"),
            processes: format!("{prefix}processes"),
            process_graphs: format!("{prefix}process_graphs"),
            attributes: format!("{prefix}attributes"),
            meta: format!("{prefix}store_meta"),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed colony store with WAL support.
///
/// # Invariants
/// - All mutations go through the single mutex-guarded write connection.
/// - Once [`SqliteColonyStore::close`] is called, every operation returns
///   the connectivity-class error.
#[derive(Clone)]
pub struct SqliteColonyStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Fully prefixed table names.
    tables: TableNames,
    /// Shared writer connection guarded by a mutex.
    write_connection: Arc<Mutex<Connection>>,
    /// Read-only connection pool used for read path isolation under WAL.
    read_connections: Arc<Vec<Mutex<Connection>>>,
    /// Round-robin cursor for read connection selection.
    read_cursor: Arc<AtomicUsize>,
    /// Set once by `close`; checked before every connection grab.
    closed: Arc<AtomicBool>,
}

impl SqliteColonyStore {
    /// Opens an `SQLite`-backed colony store, creating or validating the
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the configuration is invalid or the
    /// database cannot be opened or initialized.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        validate_table_prefix(&config.table_prefix)?;
        validate_runtime_limits(&config)?;
        let tables = TableNames::new(&config.table_prefix);
        let mut write_connection = open_connection(&config)?;
        schema::initialize_schema(&mut write_connection, &tables)?;
        let mut read_connections = Vec::with_capacity(config.read_pool_size);
        for _ in 0 .. config.read_pool_size {
            read_connections.push(Mutex::new(open_connection(&config)?));
        }
        debug!(
            "opened colony store at {} (prefix {:?}, read pool {})",
            config.path.display(),
            config.table_prefix,
            config.read_pool_size
        );
        Ok(Self {
            config,
            tables,
            write_connection: Arc::new(Mutex::new(write_connection)),
            read_connections: Arc::new(read_connections),
            read_cursor: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Returns the configuration the store was opened with.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Marks the store closed. Every subsequent operation, on this handle or
    /// any clone, returns the connectivity-class error.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        debug!("closed colony store at {}", self.config.path.display());
    }

    /// Drops every table owned by this store (by prefix). Intended for test
    /// teardown; all data is lost.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the store is closed or a drop fails.
    pub fn drop_schema(&self) -> Result<(), SqliteStoreError> {
        let guard = self.write_guard()?;
        warn!("dropping colony store schema with prefix {:?}", self.config.table_prefix);
        let tables = &self.tables;
        let batch = format!(
            "DROP TABLE IF EXISTS {colonies};
             DROP TABLE IF EXISTS {executors};
             DROP TABLE IF EXISTS {functions};
             DROP TABLE IF EXISTS {crons};
             DROP TABLE IF EXISTS {files};
             DROP TABLE IF EXISTS {file_counters};
             DROP TABLE IF EXISTS {snapshots};
             DROP TABLE IF EXISTS {logs};
             DROP TABLE IF EXISTS {processes};
             DROP TABLE IF EXISTS {process_graphs};
             DROP TABLE IF EXISTS {attributes};
             DROP TABLE IF EXISTS {meta};",
            colonies = tables.colonies,
            executors = tables.executors,
            functions = tables.functions,
            crons = tables.crons,
            files = tables.files,
            file_counters = tables.file_counters,
            snapshots = tables.snapshots,
            logs = tables.logs,
            processes = tables.processes,
            process_graphs = tables.process_graphs,
            attributes = tables.attributes,
            meta = tables.meta,
        );
        guard.execute_batch(&batch).map_err(db_err)
    }

    /// Returns the prefixed table name set.
    pub(crate) const fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Locks and returns the write connection.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Closed`] after `close` and
    /// [`SqliteStoreError::Io`] when the mutex is poisoned.
    pub(crate) fn write_guard(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SqliteStoreError::Closed);
        }
        self.write_connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite write mutex poisoned".to_string()))
    }

    /// Locks and returns the next read connection using round-robin
    /// selection.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Closed`] after `close` and
    /// [`SqliteStoreError::Io`] when the mutex is poisoned.
    pub(crate) fn read_guard(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SqliteStoreError::Closed);
        }
        let len = self.read_connections.len();
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % len;
        self.read_connections[index]
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite read mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Ensures the parent directory of the database file exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_err)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_err)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_err)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_err)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_err)?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
pub(crate) fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

/// Converts an `SQLite` `COUNT(1)` result into the interface's `u64`.
pub(crate) fn count_from_i64(value: i64) -> Result<u64, SqliteStoreError> {
    u64::try_from(value)
        .map_err(|_| SqliteStoreError::Consistency(format!("negative row count: {value}")))
}

/// Resets RUNNING processes back to WAITING with cleared assignment and
/// zeroed start/end times. Scoped to one executor when `executor_name` is
/// given, otherwise to every executor of the colony. Runs inside the
/// caller's transaction; returns the number of requeued rows.
pub(crate) fn requeue_running_processes(
    tx: &rusqlite::Transaction<'_>,
    tables: &TableNames,
    colony_name: &str,
    executor_name: Option<&str>,
) -> Result<usize, SqliteStoreError> {
    let requeued = match executor_name {
        Some(executor_name) => tx
            .execute(
                &format!(
                    "UPDATE {processes}
                     SET state = ?1, assigned_executor_name = '', start_time = 0, end_time = 0
                     WHERE colony_name = ?2 AND state = ?3 AND assigned_executor_name = ?4",
                    processes = tables.processes
                ),
                params![
                    ProcessState::Waiting.as_str(),
                    colony_name,
                    ProcessState::Running.as_str(),
                    executor_name
                ],
            )
            .map_err(db_err)?,
        None => tx
            .execute(
                &format!(
                    "UPDATE {processes}
                     SET state = ?1, assigned_executor_name = '', start_time = 0, end_time = 0
                     WHERE colony_name = ?2 AND state = ?3",
                    processes = tables.processes
                ),
                params![
                    ProcessState::Waiting.as_str(),
                    colony_name,
                    ProcessState::Running.as_str()
                ],
            )
            .map_err(db_err)?,
    };
    Ok(requeued)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
