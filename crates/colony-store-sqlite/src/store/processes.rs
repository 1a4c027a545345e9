// crates/colony-store-sqlite/src/store/processes.rs
// ============================================================================
// Module: SQLite Process Operations
// Description: Collaborator process, graph, and attribute surface.
// Purpose: Implement ProcessStore for SqliteColonyStore.
// Dependencies: colony-core, rusqlite
// ============================================================================

//! ## Overview
//! The slice of the collaborator process store this tier needs: seeding
//! process, graph, and attribute rows, reading them back, and counting by
//! state. Lifecycle transitions other than the requeue performed during
//! executor removal belong to the collaborator, not to this tier.

// ============================================================================
// SECTION: Imports
// ============================================================================

use colony_core::Attribute;
use colony_core::AttributeId;
use colony_core::GraphId;
use colony_core::Process;
use colony_core::ProcessGraph;
use colony_core::ProcessId;
use colony_core::ProcessState;
use colony_core::ProcessStore;
use colony_core::StoreError;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::SqliteColonyStore;
use crate::store::SqliteStoreError;
use crate::store::count_from_i64;
use crate::store::db_err;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Column list shared by every process query.
const PROCESS_COLUMNS: &str =
    "process_id, colony_name, assigned_executor_name, state, start_time, end_time";

/// Raw process row prior to state decoding.
struct ProcessRow {
    /// Process identifier.
    process_id: String,
    /// Owning colony name.
    colony_name: String,
    /// Assigned executor name; empty while waiting.
    assigned_executor_name: String,
    /// Stored state label.
    state: String,
    /// Execution start timestamp.
    start_time: i64,
    /// Execution end timestamp.
    end_time: i64,
}

/// Maps a process row in [`PROCESS_COLUMNS`] order.
fn process_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProcessRow> {
    Ok(ProcessRow {
        process_id: row.get(0)?,
        colony_name: row.get(1)?,
        assigned_executor_name: row.get(2)?,
        state: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
    })
}

/// Decodes a raw process row into the domain entity.
fn build_process(row: ProcessRow) -> Result<Process, SqliteStoreError> {
    let state = ProcessState::parse(&row.state).ok_or_else(|| {
        SqliteStoreError::Consistency(format!("unknown process state: {}", row.state))
    })?;
    Ok(Process {
        process_id: ProcessId::new(row.process_id),
        colony_name: row.colony_name,
        assigned_executor_name: row.assigned_executor_name,
        state,
        start_time: row.start_time,
        end_time: row.end_time,
    })
}

// ============================================================================
// SECTION: ProcessStore
// ============================================================================

impl ProcessStore for SqliteColonyStore {
    fn add_process(&self, process: &Process) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        guard
            .execute(
                &format!(
                    "INSERT INTO {processes} ({PROCESS_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    processes = self.tables().processes
                ),
                params![
                    process.process_id.as_str(),
                    process.colony_name,
                    process.assigned_executor_name,
                    process.state.as_str(),
                    process.start_time,
                    process.end_time,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn get_process_by_id(&self, process_id: &ProcessId) -> Result<Option<Process>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {PROCESS_COLUMNS} FROM {processes} WHERE process_id = ?1",
            processes = self.tables().processes
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let row = stmt
            .query_row(params![process_id.as_str()], process_row)
            .optional()
            .map_err(db_err)?;
        row.map(build_process).transpose().map_err(StoreError::from)
    }

    fn count_processes(&self, colony_name: &str, state: ProcessState) -> Result<u64, StoreError> {
        let guard = self.read_guard()?;
        let count: i64 = guard
            .query_row(
                &format!(
                    "SELECT COUNT(1) FROM {processes} WHERE colony_name = ?1 AND state = ?2",
                    processes = self.tables().processes
                ),
                params![colony_name, state.as_str()],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count_from_i64(count)?)
    }

    fn add_process_graph(&self, graph: &ProcessGraph) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        guard
            .execute(
                &format!(
                    "INSERT INTO {process_graphs} (graph_id, colony_name, state, end_time)
                     VALUES (?1, ?2, ?3, ?4)",
                    process_graphs = self.tables().process_graphs
                ),
                params![
                    graph.graph_id.as_str(),
                    graph.colony_name,
                    graph.state.as_str(),
                    graph.end_time,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn get_process_graph_by_id(
        &self,
        graph_id: &GraphId,
    ) -> Result<Option<ProcessGraph>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT graph_id, colony_name, state, end_time FROM {process_graphs}
             WHERE graph_id = ?1",
            process_graphs = self.tables().process_graphs
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let row: Option<(String, String, String, i64)> = stmt
            .query_row(params![graph_id.as_str()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .optional()
            .map_err(db_err)?;
        let Some((graph_id, colony_name, state, end_time)) = row else {
            return Ok(None);
        };
        let state = ProcessState::parse(&state).ok_or_else(|| {
            SqliteStoreError::Consistency(format!("unknown process graph state: {state}"))
        })?;
        Ok(Some(ProcessGraph {
            graph_id: GraphId::new(graph_id),
            colony_name,
            state,
            end_time,
        }))
    }

    fn add_attribute(&self, attribute: &Attribute) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        guard
            .execute(
                &format!(
                    "INSERT INTO {attributes} (attribute_id, process_id, colony_name, key, value)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    attributes = self.tables().attributes
                ),
                params![
                    attribute.attribute_id.as_str(),
                    attribute.process_id.as_str(),
                    attribute.colony_name,
                    attribute.key,
                    attribute.value,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn get_attributes_by_process(
        &self,
        process_id: &ProcessId,
    ) -> Result<Vec<Attribute>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT attribute_id, process_id, colony_name, key, value FROM {attributes}
             WHERE process_id = ?1 ORDER BY key",
            attributes = self.tables().attributes
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![process_id.as_str()], |row| {
                Ok(Attribute {
                    attribute_id: AttributeId::new(row.get::<_, String>(0)?),
                    process_id: ProcessId::new(row.get::<_, String>(1)?),
                    colony_name: row.get(2)?,
                    key: row.get(3)?,
                    value: row.get(4)?,
                })
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }
}
