// crates/colony-store-sqlite/src/store/crons.rs
// ============================================================================
// Module: SQLite Cron Operations
// Description: Cron registry with colony-scoped name arbitration.
// Purpose: Implement CronStore for SqliteColonyStore.
// Dependencies: colony-core, rusqlite
// ============================================================================

//! ## Overview
//! Cron rows with colony-scoped name uniqueness. Registration is the
//! operation most exposed to concurrent duplicate names (several schedulers
//! registering the same cron), so it carries both the friendly pre-check and
//! the constraint translation; a race loser sees the same already-exists
//! error as a plain duplicate. Schedule advancement mutates the row in
//! place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use colony_core::Cron;
use colony_core::CronId;
use colony_core::CronStore;
use colony_core::GraphId;
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

/// Column list shared by every cron query.
const CRON_COLUMNS: &str = "cron_id, colony_name, name, expression, interval_seconds, random, \
                            next_run, last_run, workflow_spec, prev_process_graph_id, \
                            wait_for_prev_graph";

/// Maps a cron row in [`CRON_COLUMNS`] order.
fn cron_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cron> {
    Ok(Cron {
        cron_id: CronId::new(row.get::<_, String>(0)?),
        colony_name: row.get(1)?,
        name: row.get(2)?,
        expression: row.get(3)?,
        interval_seconds: row.get(4)?,
        random: row.get(5)?,
        next_run: row.get(6)?,
        last_run: row.get(7)?,
        workflow_spec: row.get(8)?,
        prev_process_graph_id: GraphId::new(row.get::<_, String>(9)?),
        wait_for_prev_graph: row.get(10)?,
    })
}

// ============================================================================
// SECTION: CronStore
// ============================================================================

impl CronStore for SqliteColonyStore {
    fn add_cron(&self, cron: &Cron) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let taken: Option<i64> = guard
            .query_row(
                &format!(
                    "SELECT 1 FROM {crons} WHERE colony_name = ?1 AND name = ?2",
                    crons = self.tables().crons
                ),
                params![cron.colony_name, cron.name],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if taken.is_some() {
            return Err(StoreError::already_exists("cron", cron.name.clone()));
        }
        let result = guard.execute(
            &format!(
                "INSERT INTO {crons} ({CRON_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                crons = self.tables().crons
            ),
            params![
                cron.cron_id.as_str(),
                cron.colony_name,
                cron.name,
                cron.expression,
                cron.interval_seconds,
                cron.random,
                cron.next_run,
                cron.last_run,
                cron.workflow_spec,
                cron.prev_process_graph_id.as_str(),
                cron.wait_for_prev_graph,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            // Lost arbitration race after the pre-check; same outcome.
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::already_exists("cron", cron.name.clone()))
            }
            Err(err) => Err(db_err(err).into()),
        }
    }

    fn get_cron_by_id(&self, cron_id: &CronId) -> Result<Option<Cron>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {CRON_COLUMNS} FROM {crons} WHERE cron_id = ?1",
            crons = self.tables().crons
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let cron = stmt
            .query_row(params![cron_id.as_str()], cron_from_row)
            .optional()
            .map_err(db_err)?;
        Ok(cron)
    }

    fn get_crons_by_colony(&self, colony_name: &str) -> Result<Vec<Cron>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {CRON_COLUMNS} FROM {crons} WHERE colony_name = ?1 ORDER BY name",
            crons = self.tables().crons
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![colony_name], cron_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn update_cron_schedule(
        &self,
        cron_id: &CronId,
        next_run: i64,
        last_run: i64,
        prev_process_graph_id: &GraphId,
    ) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let updated = guard
            .execute(
                &format!(
                    "UPDATE {crons}
                     SET next_run = ?1, last_run = ?2, prev_process_graph_id = ?3
                     WHERE cron_id = ?4",
                    crons = self.tables().crons
                ),
                params![next_run, last_run, prev_process_graph_id.as_str(), cron_id.as_str()],
            )
            .map_err(db_err)?;
        if updated == 0 {
            return Err(StoreError::not_found("cron", cron_id.as_str()));
        }
        Ok(())
    }

    fn remove_cron_by_id(&self, cron_id: &CronId) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let removed = guard
            .execute(
                &format!("DELETE FROM {crons} WHERE cron_id = ?1", crons = self.tables().crons),
                params![cron_id.as_str()],
            )
            .map_err(db_err)?;
        if removed == 0 {
            return Err(StoreError::not_found("cron", cron_id.as_str()));
        }
        Ok(())
    }

    fn remove_crons_by_colony(&self, colony_name: &str) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        guard
            .execute(
                &format!(
                    "DELETE FROM {crons} WHERE colony_name = ?1",
                    crons = self.tables().crons
                ),
                params![colony_name],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn count_crons_by_colony(&self, colony_name: &str) -> Result<u64, StoreError> {
        let guard = self.read_guard()?;
        let count: i64 = guard
            .query_row(
                &format!(
                    "SELECT COUNT(1) FROM {crons} WHERE colony_name = ?1",
                    crons = self.tables().crons
                ),
                params![colony_name],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count_from_i64(count)?)
    }
}
