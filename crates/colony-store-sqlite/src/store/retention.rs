// crates/colony-store-sqlite/src/store/retention.rs
// ============================================================================
// Module: SQLite Retention Sweep
// Description: Time-windowed pruning of terminal historical records.
// Purpose: Implement RetentionSweep for SqliteColonyStore.
// Dependencies: colony-core, rusqlite, log
// ============================================================================

//! ## Overview
//! One transaction deletes, across all colonies, successful process graphs
//! and processes whose `end_time` predates the cutoff, and log rows whose
//! insertion time predates it. Attributes of an eligible process are removed
//! in the same transaction before the process rows, so no orphan attribute
//! can survive a sweep. Failed work is never pruned; `end_time = 0` marks
//! unfinished rows and is excluded explicitly. The sweep is driven by an
//! external scheduler, never self-triggered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use colony_core::ProcessState;
use colony_core::RetentionReport;
use colony_core::RetentionSweep;
use colony_core::StoreError;
use log::debug;
use rusqlite::params;

use crate::store::SqliteColonyStore;
use crate::store::SqliteStoreError;
use crate::store::db_err;
use crate::store::unix_millis;

// ============================================================================
// SECTION: RetentionSweep
// ============================================================================

impl RetentionSweep for SqliteColonyStore {
    fn apply_retention_policy(
        &self,
        max_age_seconds: i64,
    ) -> Result<RetentionReport, StoreError> {
        if max_age_seconds < 0 {
            return Err(SqliteStoreError::Invalid(format!(
                "max_age_seconds must not be negative: {max_age_seconds}"
            ))
            .into());
        }
        let cutoff = unix_millis().saturating_sub(max_age_seconds.saturating_mul(1_000));
        let mut guard = self.write_guard()?;
        let tables = self.tables();
        let tx = guard.transaction().map_err(db_err)?;
        let graphs_removed = tx
            .execute(
                &format!(
                    "DELETE FROM {process_graphs}
                     WHERE state = ?1 AND end_time > 0 AND end_time < ?2",
                    process_graphs = tables.process_graphs
                ),
                params![ProcessState::Success.as_str(), cutoff],
            )
            .map_err(db_err)?;
        // Attributes first: their parent process rows go next.
        let attributes_removed = tx
            .execute(
                &format!(
                    "DELETE FROM {attributes} WHERE process_id IN (
                         SELECT process_id FROM {processes}
                         WHERE state = ?1 AND end_time > 0 AND end_time < ?2
                     )",
                    attributes = tables.attributes,
                    processes = tables.processes
                ),
                params![ProcessState::Success.as_str(), cutoff],
            )
            .map_err(db_err)?;
        let processes_removed = tx
            .execute(
                &format!(
                    "DELETE FROM {processes}
                     WHERE state = ?1 AND end_time > 0 AND end_time < ?2",
                    processes = tables.processes
                ),
                params![ProcessState::Success.as_str(), cutoff],
            )
            .map_err(db_err)?;
        let logs_removed = tx
            .execute(
                &format!("DELETE FROM {logs} WHERE added < ?1", logs = tables.logs),
                params![cutoff],
            )
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        let report = RetentionReport {
            graphs_removed: rows_removed(graphs_removed)?,
            processes_removed: rows_removed(processes_removed)?,
            attributes_removed: rows_removed(attributes_removed)?,
            logs_removed: rows_removed(logs_removed)?,
        };
        debug!(
            "retention sweep (cutoff {cutoff}): {} graphs, {} processes, {} attributes, {} logs",
            report.graphs_removed,
            report.processes_removed,
            report.attributes_removed,
            report.logs_removed
        );
        Ok(report)
    }
}

/// Converts an affected-row count into the report's `u64`.
fn rows_removed(count: usize) -> Result<u64, SqliteStoreError> {
    u64::try_from(count).map_err(|_| {
        SqliteStoreError::Consistency(format!("affected row count overflow: {count}"))
    })
}
