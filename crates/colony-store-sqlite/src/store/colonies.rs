// crates/colony-store-sqlite/src/store/colonies.rs
// ============================================================================
// Module: SQLite Colony Operations
// Description: Colony registration, identity changes, and the cascade.
// Purpose: Implement ColonyStore for SqliteColonyStore.
// Dependencies: colony-core, rusqlite, log
// ============================================================================

//! ## Overview
//! Colony rows plus the two operations that touch every other table: the
//! rename (repoints current child rows, deliberately not historical log
//! rows) and the cascade removal (one transaction, explicit ordered
//! deletes). The cascade filters every statement by `colony_name`, so rows
//! of unrelated colonies are never visible to it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use colony_core::Colony;
use colony_core::ColonyId;
use colony_core::ColonyStore;
use colony_core::StoreError;
use log::debug;
use rusqlite::ErrorCode;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::SqliteColonyStore;
use crate::store::count_from_i64;
use crate::store::db_err;
use crate::store::requeue_running_processes;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Maps a colony row in `(colony_id, name)` column order.
fn colony_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Colony> {
    Ok(Colony {
        id: ColonyId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
    })
}

// ============================================================================
// SECTION: ColonyStore
// ============================================================================

impl ColonyStore for SqliteColonyStore {
    fn add_colony(&self, colony: &Colony) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let taken: Option<i64> = guard
            .query_row(
                &format!(
                    "SELECT 1 FROM {colonies} WHERE name = ?1",
                    colonies = self.tables().colonies
                ),
                params![colony.name],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if taken.is_some() {
            return Err(StoreError::already_exists("colony", colony.name.clone()));
        }
        let result = guard.execute(
            &format!(
                "INSERT INTO {colonies} (colony_id, name) VALUES (?1, ?2)",
                colonies = self.tables().colonies
            ),
            params![colony.id.as_str(), colony.name.as_str()],
        );
        match result {
            Ok(_) => Ok(()),
            // A concurrent insert can slip between the pre-check and here;
            // the constraint is the actual guarantee.
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::already_exists("colony", colony.name.clone()))
            }
            Err(err) => Err(db_err(err).into()),
        }
    }

    fn get_colonies(&self) -> Result<Vec<Colony>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT colony_id, name FROM {colonies} ORDER BY name",
            colonies = self.tables().colonies
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![], colony_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn get_colony_by_id(&self, colony_id: &ColonyId) -> Result<Option<Colony>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT colony_id, name FROM {colonies} WHERE colony_id = ?1",
            colonies = self.tables().colonies
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let colony = stmt
            .query_row(params![colony_id.as_str()], colony_from_row)
            .optional()
            .map_err(db_err)?;
        Ok(colony)
    }

    fn get_colony_by_name(&self, name: &str) -> Result<Option<Colony>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT colony_id, name FROM {colonies} WHERE name = ?1",
            colonies = self.tables().colonies
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let colony = stmt.query_row(params![name], colony_from_row).optional().map_err(db_err)?;
        Ok(colony)
    }

    fn count_colonies(&self) -> Result<u64, StoreError> {
        let guard = self.read_guard()?;
        let count: i64 = guard
            .query_row(
                &format!("SELECT COUNT(1) FROM {colonies}", colonies = self.tables().colonies),
                params![],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count_from_i64(count)?)
    }

    fn rename_colony(&self, old_name: &str, new_name: &str) -> Result<(), StoreError> {
        let mut guard = self.write_guard()?;
        let tables = self.tables();
        let tx = guard.transaction().map_err(db_err)?;
        let exists: Option<i64> = tx
            .query_row(
                &format!(
                    "SELECT 1 FROM {colonies} WHERE name = ?1",
                    colonies = tables.colonies
                ),
                params![old_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if exists.is_none() {
            return Err(StoreError::not_found("colony", old_name));
        }
        let taken: Option<i64> = tx
            .query_row(
                &format!(
                    "SELECT 1 FROM {colonies} WHERE name = ?1",
                    colonies = tables.colonies
                ),
                params![new_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if taken.is_some() {
            return Err(StoreError::already_exists("colony", new_name));
        }
        tx.execute(
            &format!(
                "UPDATE {colonies} SET name = ?1 WHERE name = ?2",
                colonies = tables.colonies
            ),
            params![new_name, old_name],
        )
        .map_err(db_err)?;
        // Historical log rows keep the colony name they captured.
        for table in [
            &tables.executors,
            &tables.functions,
            &tables.crons,
            &tables.files,
            &tables.file_counters,
            &tables.snapshots,
            &tables.processes,
            &tables.process_graphs,
            &tables.attributes,
        ] {
            tx.execute(
                &format!("UPDATE {table} SET colony_name = ?1 WHERE colony_name = ?2"),
                params![new_name, old_name],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)?;
        Ok(())
    }

    fn change_colony_id(&self, old_id: &ColonyId, new_id: &ColonyId) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let result = guard.execute(
            &format!(
                "UPDATE {colonies} SET colony_id = ?1 WHERE colony_id = ?2",
                colonies = self.tables().colonies
            ),
            params![new_id.as_str(), old_id.as_str()],
        );
        match result {
            Ok(0) => Err(StoreError::not_found("colony", old_id.as_str())),
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::already_exists("colony", new_id.as_str()))
            }
            Err(err) => Err(db_err(err).into()),
        }
    }

    fn remove_colony(&self, name: &str) -> Result<(), StoreError> {
        let mut guard = self.write_guard()?;
        let tables = self.tables();
        let tx = guard.transaction().map_err(db_err)?;
        let exists: Option<i64> = tx
            .query_row(
                &format!(
                    "SELECT 1 FROM {colonies} WHERE name = ?1",
                    colonies = tables.colonies
                ),
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if exists.is_none() {
            return Err(StoreError::not_found("colony", name));
        }
        let requeued = requeue_running_processes(&tx, tables, name, None)?;
        // Delete order: children first, colony row last.
        for table in [
            &tables.executors,
            &tables.functions,
            &tables.crons,
            &tables.files,
            &tables.file_counters,
            &tables.snapshots,
            &tables.logs,
            &tables.processes,
            &tables.process_graphs,
            &tables.attributes,
        ] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE colony_name = ?1"),
                params![name],
            )
            .map_err(db_err)?;
        }
        tx.execute(
            &format!("DELETE FROM {colonies} WHERE name = ?1", colonies = tables.colonies),
            params![name],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        debug!("removed colony {name} (requeued {requeued} running processes before delete)");
        Ok(())
    }
}
