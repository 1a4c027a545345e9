// crates/colony-store-sqlite/src/store/schema.rs
// ============================================================================
// Module: SQLite Colony Store Schema
// Description: Table creation and schema version validation.
// Purpose: Initialize or validate the prefixed table set on open.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! Schema management for the colony store. All tables are created with
//! `IF NOT EXISTS` inside one transaction, and a single-row meta table
//! records the schema version; opening a database written by an unsupported
//! version fails closed. There are no SQL foreign keys between the colony
//! tables: cross-entity cleanup is performed by explicit ordered deletes in
//! the cascade operations, so a crash can never leave half-fired triggers
//! behind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::SqliteStoreError;
use crate::store::TableNames;
use crate::store::db_err;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;

// ============================================================================
// SECTION: Initialization
// ============================================================================

/// Initializes the `SQLite` schema or validates the existing version.
pub(crate) fn initialize_schema(
    connection: &mut Connection,
    tables: &TableNames,
) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_err)?;
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {meta} (version INTEGER NOT NULL);",
        meta = tables.meta
    ))
    .map_err(db_err)?;
    let version: Option<i64> = tx
        .query_row(
            &format!("SELECT version FROM {meta} LIMIT 1", meta = tables.meta),
            params![],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;
    match version {
        None => {
            tx.execute(
                &format!("INSERT INTO {meta} (version) VALUES (?1)", meta = tables.meta),
                params![SCHEMA_VERSION],
            )
            .map_err(db_err)?;
            tx.execute_batch(&create_tables_sql(tables)).map_err(db_err)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_err)
}

/// Returns the batch of `CREATE TABLE`/`CREATE INDEX` statements for the
/// prefixed table set.
fn create_tables_sql(tables: &TableNames) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {colonies} (
            colony_id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );
        CREATE TABLE IF NOT EXISTS {executors} (
            executor_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            colony_name TEXT NOT NULL,
            executor_type TEXT NOT NULL,
            state TEXT NOT NULL,
            capabilities TEXT NOT NULL,
            last_heard_from INTEGER NOT NULL,
            commission_time INTEGER NOT NULL,
            UNIQUE (colony_name, name)
        );
        CREATE TABLE IF NOT EXISTS {functions} (
            function_id TEXT PRIMARY KEY,
            executor_name TEXT NOT NULL,
            colony_name TEXT NOT NULL,
            func_name TEXT NOT NULL,
            call_count INTEGER NOT NULL,
            min_wait_time REAL NOT NULL,
            max_wait_time REAL NOT NULL,
            min_exec_time REAL NOT NULL,
            max_exec_time REAL NOT NULL,
            avg_wait_time REAL NOT NULL,
            avg_exec_time REAL NOT NULL,
            UNIQUE (colony_name, executor_name, func_name)
        );
        CREATE TABLE IF NOT EXISTS {crons} (
            cron_id TEXT PRIMARY KEY,
            colony_name TEXT NOT NULL,
            name TEXT NOT NULL,
            expression TEXT NOT NULL,
            interval_seconds INTEGER NOT NULL,
            random INTEGER NOT NULL,
            next_run INTEGER NOT NULL,
            last_run INTEGER NOT NULL,
            workflow_spec TEXT NOT NULL,
            prev_process_graph_id TEXT NOT NULL,
            wait_for_prev_graph INTEGER NOT NULL,
            UNIQUE (colony_name, name)
        );
        CREATE TABLE IF NOT EXISTS {files} (
            file_id TEXT PRIMARY KEY,
            colony_name TEXT NOT NULL,
            label TEXT NOT NULL,
            name TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            sequence_number INTEGER NOT NULL,
            checksum TEXT NOT NULL,
            backing_reference TEXT NOT NULL,
            added INTEGER NOT NULL,
            UNIQUE (colony_name, label, name, sequence_number)
        );
        CREATE INDEX IF NOT EXISTS idx_{files}_key
            ON {files} (colony_name, label, name);
        CREATE TABLE IF NOT EXISTS {file_counters} (
            colony_name TEXT NOT NULL,
            label TEXT NOT NULL,
            name TEXT NOT NULL,
            next_sequence INTEGER NOT NULL,
            PRIMARY KEY (colony_name, label, name)
        );
        CREATE TABLE IF NOT EXISTS {snapshots} (
            snapshot_id TEXT PRIMARY KEY,
            colony_name TEXT NOT NULL,
            label TEXT NOT NULL,
            name TEXT NOT NULL,
            file_ids TEXT NOT NULL,
            added INTEGER NOT NULL,
            UNIQUE (colony_name, name)
        );
        CREATE TABLE IF NOT EXISTS {logs} (
            process_id TEXT NOT NULL,
            colony_name TEXT NOT NULL,
            executor_name TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            message TEXT NOT NULL,
            added INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{logs}_process
            ON {logs} (process_id, timestamp);
        CREATE INDEX IF NOT EXISTS idx_{logs}_added
            ON {logs} (added);
        CREATE INDEX IF NOT EXISTS idx_{logs}_colony
            ON {logs} (colony_name);
        CREATE TABLE IF NOT EXISTS {processes} (
            process_id TEXT PRIMARY KEY,
            colony_name TEXT NOT NULL,
            assigned_executor_name TEXT NOT NULL,
            state TEXT NOT NULL,
            start_time INTEGER NOT NULL,
            end_time INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{processes}_colony_state
            ON {processes} (colony_name, state);
        CREATE INDEX IF NOT EXISTS idx_{processes}_assignment
            ON {processes} (colony_name, assigned_executor_name, state);
        CREATE TABLE IF NOT EXISTS {process_graphs} (
            graph_id TEXT PRIMARY KEY,
            colony_name TEXT NOT NULL,
            state TEXT NOT NULL,
            end_time INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{process_graphs}_state
            ON {process_graphs} (state, end_time);
        CREATE TABLE IF NOT EXISTS {attributes} (
            attribute_id TEXT PRIMARY KEY,
            process_id TEXT NOT NULL,
            colony_name TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{attributes}_process
            ON {attributes} (process_id);",
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
    )
}
