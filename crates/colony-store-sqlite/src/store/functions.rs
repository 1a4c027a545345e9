// crates/colony-store-sqlite/src/store/functions.rs
// ============================================================================
// Module: SQLite Function Operations
// Description: Published-function registry with in-place statistics.
// Purpose: Implement FunctionStore for SqliteColonyStore.
// Dependencies: colony-core, rusqlite
// ============================================================================

//! ## Overview
//! One row per (colony, executor, function name) triple. Statistics columns
//! are flattened into the row and replaced in place by
//! `update_function_stats`; nothing here is versioned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use colony_core::Function;
use colony_core::FunctionId;
use colony_core::FunctionStats;
use colony_core::FunctionStore;
use colony_core::StoreError;
use rusqlite::ErrorCode;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::SqliteColonyStore;
use crate::store::count_from_i64;
use crate::store::db_err;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Column list shared by every function query.
const FUNCTION_COLUMNS: &str = "function_id, executor_name, colony_name, func_name, call_count, \
                                min_wait_time, max_wait_time, min_exec_time, max_exec_time, \
                                avg_wait_time, avg_exec_time";

/// Maps a function row in [`FUNCTION_COLUMNS`] order.
fn function_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Function> {
    Ok(Function {
        function_id: FunctionId::new(row.get::<_, String>(0)?),
        executor_name: row.get(1)?,
        colony_name: row.get(2)?,
        func_name: row.get(3)?,
        stats: FunctionStats {
            call_count: row.get(4)?,
            min_wait_time: row.get(5)?,
            max_wait_time: row.get(6)?,
            min_exec_time: row.get(7)?,
            max_exec_time: row.get(8)?,
            avg_wait_time: row.get(9)?,
            avg_exec_time: row.get(10)?,
        },
    })
}

// ============================================================================
// SECTION: FunctionStore
// ============================================================================

impl FunctionStore for SqliteColonyStore {
    fn add_function(&self, function: &Function) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let result = guard.execute(
            &format!(
                "INSERT INTO {functions} ({FUNCTION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                functions = self.tables().functions
            ),
            params![
                function.function_id.as_str(),
                function.executor_name,
                function.colony_name,
                function.func_name,
                function.stats.call_count,
                function.stats.min_wait_time,
                function.stats.max_wait_time,
                function.stats.min_exec_time,
                function.stats.max_exec_time,
                function.stats.avg_wait_time,
                function.stats.avg_exec_time,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::already_exists("function", function.func_name.clone()))
            }
            Err(err) => Err(db_err(err).into()),
        }
    }

    fn get_function_by_id(
        &self,
        function_id: &FunctionId,
    ) -> Result<Option<Function>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {FUNCTION_COLUMNS} FROM {functions} WHERE function_id = ?1",
            functions = self.tables().functions
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let function = stmt
            .query_row(params![function_id.as_str()], function_from_row)
            .optional()
            .map_err(db_err)?;
        Ok(function)
    }

    fn get_functions_by_executor(
        &self,
        colony_name: &str,
        executor_name: &str,
    ) -> Result<Vec<Function>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {FUNCTION_COLUMNS} FROM {functions}
             WHERE colony_name = ?1 AND executor_name = ?2 ORDER BY func_name",
            functions = self.tables().functions
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![colony_name, executor_name], function_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn get_functions_by_colony(&self, colony_name: &str) -> Result<Vec<Function>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {FUNCTION_COLUMNS} FROM {functions}
             WHERE colony_name = ?1 ORDER BY executor_name, func_name",
            functions = self.tables().functions
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![colony_name], function_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn update_function_stats(
        &self,
        function_id: &FunctionId,
        stats: &FunctionStats,
    ) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let updated = guard
            .execute(
                &format!(
                    "UPDATE {functions}
                     SET call_count = ?1, min_wait_time = ?2, max_wait_time = ?3,
                         min_exec_time = ?4, max_exec_time = ?5, avg_wait_time = ?6,
                         avg_exec_time = ?7
                     WHERE function_id = ?8",
                    functions = self.tables().functions
                ),
                params![
                    stats.call_count,
                    stats.min_wait_time,
                    stats.max_wait_time,
                    stats.min_exec_time,
                    stats.max_exec_time,
                    stats.avg_wait_time,
                    stats.avg_exec_time,
                    function_id.as_str(),
                ],
            )
            .map_err(db_err)?;
        if updated == 0 {
            return Err(StoreError::not_found("function", function_id.as_str()));
        }
        Ok(())
    }

    fn remove_function_by_id(&self, function_id: &FunctionId) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let removed = guard
            .execute(
                &format!(
                    "DELETE FROM {functions} WHERE function_id = ?1",
                    functions = self.tables().functions
                ),
                params![function_id.as_str()],
            )
            .map_err(db_err)?;
        if removed == 0 {
            return Err(StoreError::not_found("function", function_id.as_str()));
        }
        Ok(())
    }

    fn remove_functions_by_executor(
        &self,
        colony_name: &str,
        executor_name: &str,
    ) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        guard
            .execute(
                &format!(
                    "DELETE FROM {functions} WHERE colony_name = ?1 AND executor_name = ?2",
                    functions = self.tables().functions
                ),
                params![colony_name, executor_name],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn remove_functions_by_colony(&self, colony_name: &str) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        guard
            .execute(
                &format!(
                    "DELETE FROM {functions} WHERE colony_name = ?1",
                    functions = self.tables().functions
                ),
                params![colony_name],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn count_functions_by_colony(&self, colony_name: &str) -> Result<u64, StoreError> {
        let guard = self.read_guard()?;
        let count: i64 = guard
            .query_row(
                &format!(
                    "SELECT COUNT(1) FROM {functions} WHERE colony_name = ?1",
                    functions = self.tables().functions
                ),
                params![colony_name],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count_from_i64(count)?)
    }
}
