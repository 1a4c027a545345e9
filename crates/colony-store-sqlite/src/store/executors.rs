// crates/colony-store-sqlite/src/store/executors.rs
// ============================================================================
// Module: SQLite Executor Operations
// Description: Executor registration, approval lifecycle, and removal.
// Purpose: Implement ExecutorStore for SqliteColonyStore.
// Dependencies: colony-core, rusqlite, serde_json, log
// ============================================================================

//! ## Overview
//! Executor rows with colony-scoped name uniqueness. Removal follows a
//! stated contract order inside one transaction: delete the executor row(s),
//! requeue the RUNNING processes that were assigned to them, then purge the
//! functions they published. Capabilities are stored as a JSON array column.

// ============================================================================
// SECTION: Imports
// ============================================================================

use colony_core::Executor;
use colony_core::ExecutorId;
use colony_core::ExecutorState;
use colony_core::ExecutorStore;
use colony_core::StoreError;
use log::debug;
use rusqlite::ErrorCode;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::SqliteColonyStore;
use crate::store::SqliteStoreError;
use crate::store::count_from_i64;
use crate::store::db_err;
use crate::store::requeue_running_processes;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Column list shared by every executor query.
const EXECUTOR_COLUMNS: &str = "executor_id, name, colony_name, executor_type, state, \
                                capabilities, last_heard_from, commission_time";

/// Raw executor row prior to state and capability decoding.
struct ExecutorRow {
    /// Executor identifier.
    executor_id: String,
    /// Executor name.
    name: String,
    /// Owning colony name.
    colony_name: String,
    /// Executor type label.
    executor_type: String,
    /// Stored state label.
    state: String,
    /// JSON-encoded capability list.
    capabilities: String,
    /// Last keep-alive timestamp.
    last_heard_from: i64,
    /// Commission timestamp.
    commission_time: i64,
}

/// Maps an executor row in [`EXECUTOR_COLUMNS`] order.
fn executor_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExecutorRow> {
    Ok(ExecutorRow {
        executor_id: row.get(0)?,
        name: row.get(1)?,
        colony_name: row.get(2)?,
        executor_type: row.get(3)?,
        state: row.get(4)?,
        capabilities: row.get(5)?,
        last_heard_from: row.get(6)?,
        commission_time: row.get(7)?,
    })
}

/// Decodes a raw executor row into the domain entity.
fn build_executor(row: ExecutorRow) -> Result<Executor, SqliteStoreError> {
    let state = ExecutorState::parse(&row.state).ok_or_else(|| {
        SqliteStoreError::Consistency(format!("unknown executor state: {}", row.state))
    })?;
    let capabilities: Vec<String> = serde_json::from_str(&row.capabilities).map_err(|err| {
        SqliteStoreError::Consistency(format!("malformed executor capabilities: {err}"))
    })?;
    Ok(Executor {
        id: ExecutorId::new(row.executor_id),
        name: row.name,
        colony_name: row.colony_name,
        executor_type: row.executor_type,
        state,
        capabilities,
        last_heard_from: row.last_heard_from,
        commission_time: row.commission_time,
    })
}

// ============================================================================
// SECTION: ExecutorStore
// ============================================================================

impl ExecutorStore for SqliteColonyStore {
    fn add_executor(&self, executor: &Executor) -> Result<(), StoreError> {
        let capabilities = serde_json::to_string(&executor.capabilities)
            .map_err(|err| StoreError::Invalid(format!("unencodable capabilities: {err}")))?;
        let guard = self.write_guard()?;
        let taken: Option<i64> = guard
            .query_row(
                &format!(
                    "SELECT 1 FROM {executors} WHERE colony_name = ?1 AND name = ?2",
                    executors = self.tables().executors
                ),
                params![executor.colony_name, executor.name],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if taken.is_some() {
            return Err(StoreError::already_exists("executor", executor.name.clone()));
        }
        let result = guard.execute(
            &format!(
                "INSERT INTO {executors} ({EXECUTOR_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                executors = self.tables().executors
            ),
            params![
                executor.id.as_str(),
                executor.name,
                executor.colony_name,
                executor.executor_type,
                executor.state.as_str(),
                capabilities,
                executor.last_heard_from,
                executor.commission_time,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            // A concurrent insert can slip between the pre-check and here;
            // the constraint is the actual guarantee.
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::already_exists("executor", executor.name.clone()))
            }
            Err(err) => Err(db_err(err).into()),
        }
    }

    fn get_executor_by_id(
        &self,
        executor_id: &ExecutorId,
    ) -> Result<Option<Executor>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {EXECUTOR_COLUMNS} FROM {executors} WHERE executor_id = ?1",
            executors = self.tables().executors
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let row = stmt
            .query_row(params![executor_id.as_str()], executor_row)
            .optional()
            .map_err(db_err)?;
        row.map(build_executor).transpose().map_err(StoreError::from)
    }

    fn get_executor_by_name(
        &self,
        colony_name: &str,
        name: &str,
    ) -> Result<Option<Executor>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {EXECUTOR_COLUMNS} FROM {executors} WHERE colony_name = ?1 AND name = ?2",
            executors = self.tables().executors
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let row = stmt
            .query_row(params![colony_name, name], executor_row)
            .optional()
            .map_err(db_err)?;
        row.map(build_executor).transpose().map_err(StoreError::from)
    }

    fn get_executors_by_colony(&self, colony_name: &str) -> Result<Vec<Executor>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {EXECUTOR_COLUMNS} FROM {executors} WHERE colony_name = ?1 ORDER BY name",
            executors = self.tables().executors
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![colony_name], executor_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        rows.into_iter()
            .map(|row| build_executor(row).map_err(StoreError::from))
            .collect()
    }

    fn count_executors(&self) -> Result<u64, StoreError> {
        let guard = self.read_guard()?;
        let count: i64 = guard
            .query_row(
                &format!("SELECT COUNT(1) FROM {executors}", executors = self.tables().executors),
                params![],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count_from_i64(count)?)
    }

    fn count_executors_by_colony(&self, colony_name: &str) -> Result<u64, StoreError> {
        let guard = self.read_guard()?;
        let count: i64 = guard
            .query_row(
                &format!(
                    "SELECT COUNT(1) FROM {executors} WHERE colony_name = ?1",
                    executors = self.tables().executors
                ),
                params![colony_name],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count_from_i64(count)?)
    }

    fn approve_executor(&self, executor_id: &ExecutorId) -> Result<(), StoreError> {
        self.set_executor_state(executor_id, ExecutorState::Approved)
    }

    fn reject_executor(&self, executor_id: &ExecutorId) -> Result<(), StoreError> {
        self.set_executor_state(executor_id, ExecutorState::Rejected)
    }

    fn mark_alive(&self, executor_id: &ExecutorId, heard_at: i64) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let updated = guard
            .execute(
                &format!(
                    "UPDATE {executors} SET last_heard_from = ?1 WHERE executor_id = ?2",
                    executors = self.tables().executors
                ),
                params![heard_at, executor_id.as_str()],
            )
            .map_err(db_err)?;
        if updated == 0 {
            return Err(StoreError::not_found("executor", executor_id.as_str()));
        }
        Ok(())
    }

    fn remove_executor_by_id(&self, executor_id: &ExecutorId) -> Result<(), StoreError> {
        let mut guard = self.write_guard()?;
        let tables = self.tables();
        let tx = guard.transaction().map_err(db_err)?;
        let target: Option<(String, String)> = tx
            .query_row(
                &format!(
                    "SELECT colony_name, name FROM {executors} WHERE executor_id = ?1",
                    executors = tables.executors
                ),
                params![executor_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(db_err)?;
        let Some((colony_name, name)) = target else {
            return Err(StoreError::not_found("executor", executor_id.as_str()));
        };
        // Contract order: executor row, then requeue, then functions.
        tx.execute(
            &format!(
                "DELETE FROM {executors} WHERE executor_id = ?1",
                executors = tables.executors
            ),
            params![executor_id.as_str()],
        )
        .map_err(db_err)?;
        let requeued = requeue_running_processes(&tx, tables, &colony_name, Some(&name))?;
        tx.execute(
            &format!(
                "DELETE FROM {functions} WHERE colony_name = ?1 AND executor_name = ?2",
                functions = tables.functions
            ),
            params![colony_name, name],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        debug!("removed executor {name} from colony {colony_name} (requeued {requeued})");
        Ok(())
    }

    fn remove_executors_by_colony(&self, colony_name: &str) -> Result<(), StoreError> {
        let mut guard = self.write_guard()?;
        let tables = self.tables();
        let tx = guard.transaction().map_err(db_err)?;
        tx.execute(
            &format!(
                "DELETE FROM {executors} WHERE colony_name = ?1",
                executors = tables.executors
            ),
            params![colony_name],
        )
        .map_err(db_err)?;
        let requeued = requeue_running_processes(&tx, tables, colony_name, None)?;
        tx.execute(
            &format!(
                "DELETE FROM {functions} WHERE colony_name = ?1",
                functions = tables.functions
            ),
            params![colony_name],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        debug!("removed executors of colony {colony_name} (requeued {requeued})");
        Ok(())
    }
}

// ============================================================================
// SECTION: Internal Helpers
// ============================================================================

impl SqliteColonyStore {
    /// Moves an executor to the given approval state.
    fn set_executor_state(
        &self,
        executor_id: &ExecutorId,
        state: ExecutorState,
    ) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let updated = guard
            .execute(
                &format!(
                    "UPDATE {executors} SET state = ?1 WHERE executor_id = ?2",
                    executors = self.tables().executors
                ),
                params![state.as_str(), executor_id.as_str()],
            )
            .map_err(db_err)?;
        if updated == 0 {
            return Err(StoreError::not_found("executor", executor_id.as_str()));
        }
        Ok(())
    }
}
