// crates/colony-store-sqlite/src/store/logs.rs
// ============================================================================
// Module: SQLite Log Operations
// Description: Append-only process logs.
// Purpose: Implement LogStore for SqliteColonyStore.
// Dependencies: colony-core, rusqlite
// ============================================================================

//! ## Overview
//! Append-only log rows with two timestamps: the caller-supplied event
//! `timestamp` drives ordering and "since" queries, while the store-stamped
//! `added` drives retention. The colony name is captured by value at
//! insertion and deliberately left alone by colony renames, so audit history
//! reads as it was written.

// ============================================================================
// SECTION: Imports
// ============================================================================

use colony_core::LogEntry;
use colony_core::LogStore;
use colony_core::ProcessId;
use colony_core::StoreError;
use rusqlite::params;

use crate::store::SqliteColonyStore;
use crate::store::SqliteStoreError;
use crate::store::count_from_i64;
use crate::store::db_err;
use crate::store::unix_millis;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Column list shared by every log query.
const LOG_COLUMNS: &str = "process_id, colony_name, executor_name, timestamp, message, added";

/// Maps a log row in [`LOG_COLUMNS`] order.
fn log_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LogEntry> {
    Ok(LogEntry {
        process_id: ProcessId::new(row.get::<_, String>(0)?),
        colony_name: row.get(1)?,
        executor_name: row.get(2)?,
        timestamp: row.get(3)?,
        message: row.get(4)?,
        added: row.get(5)?,
    })
}

// ============================================================================
// SECTION: LogStore
// ============================================================================

impl LogStore for SqliteColonyStore {
    fn add_log(&self, entry: &LogEntry) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        guard
            .execute(
                &format!(
                    "INSERT INTO {logs} ({LOG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    logs = self.tables().logs
                ),
                params![
                    entry.process_id.as_str(),
                    entry.colony_name,
                    entry.executor_name,
                    entry.timestamp,
                    entry.message,
                    unix_millis(),
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn get_logs_by_process(
        &self,
        process_id: &ProcessId,
        limit: u64,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let limit = i64::try_from(limit)
            .map_err(|_| SqliteStoreError::Invalid(format!("log limit too large: {limit}")))?;
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM {logs}
             WHERE process_id = ?1 ORDER BY timestamp LIMIT ?2",
            logs = self.tables().logs
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![process_id.as_str(), limit], log_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn get_logs_by_process_since(
        &self,
        process_id: &ProcessId,
        since: i64,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM {logs}
             WHERE process_id = ?1 AND timestamp > ?2 ORDER BY timestamp",
            logs = self.tables().logs
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![process_id.as_str(), since], log_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn count_logs_by_colony(&self, colony_name: &str) -> Result<u64, StoreError> {
        let guard = self.read_guard()?;
        let count: i64 = guard
            .query_row(
                &format!(
                    "SELECT COUNT(1) FROM {logs} WHERE colony_name = ?1",
                    logs = self.tables().logs
                ),
                params![colony_name],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count_from_i64(count)?)
    }

    fn remove_logs_by_colony(&self, colony_name: &str) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        guard
            .execute(
                &format!(
                    "DELETE FROM {logs} WHERE colony_name = ?1",
                    logs = self.tables().logs
                ),
                params![colony_name],
            )
            .map_err(db_err)?;
        Ok(())
    }
}
