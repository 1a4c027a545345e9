// crates/colony-store-sqlite/src/store/snapshots.rs
// ============================================================================
// Module: SQLite Snapshot Operations
// Description: Immutable point-in-time file groupings.
// Purpose: Implement SnapshotStore for SqliteColonyStore.
// Dependencies: colony-core, rusqlite, serde_json, log
// ============================================================================

//! ## Overview
//! Snapshot creation resolves, inside one transaction on the write
//! connection, the latest revision of every distinct file name under the
//! exact label, and freezes the resolved file identifiers as a JSON array
//! column. The set is never recomputed: later file revisions do not change
//! an existing snapshot, and removing a snapshot never touches file rows.
//! Snapshot identifiers are minted here from `SQLite`'s `randomblob`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use colony_core::FileId;
use colony_core::Snapshot;
use colony_core::SnapshotId;
use colony_core::SnapshotStore;
use colony_core::StoreError;
use log::debug;
use rusqlite::ErrorCode;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::SqliteColonyStore;
use crate::store::SqliteStoreError;
use crate::store::TableNames;
use crate::store::db_err;
use crate::store::unix_millis;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Column list shared by every snapshot query.
const SNAPSHOT_COLUMNS: &str = "snapshot_id, colony_name, label, name, file_ids, added";

/// Raw snapshot row prior to file-id decoding.
struct SnapshotRow {
    /// Snapshot identifier.
    snapshot_id: String,
    /// Owning colony name.
    colony_name: String,
    /// Label the snapshot was taken over.
    label: String,
    /// Snapshot name.
    name: String,
    /// JSON-encoded file identifier list.
    file_ids: String,
    /// Creation timestamp.
    added: i64,
}

/// Maps a snapshot row in [`SNAPSHOT_COLUMNS`] order.
fn snapshot_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SnapshotRow> {
    Ok(SnapshotRow {
        snapshot_id: row.get(0)?,
        colony_name: row.get(1)?,
        label: row.get(2)?,
        name: row.get(3)?,
        file_ids: row.get(4)?,
        added: row.get(5)?,
    })
}

/// Decodes a raw snapshot row into the domain entity.
fn build_snapshot(row: SnapshotRow) -> Result<Snapshot, SqliteStoreError> {
    let file_ids: Vec<String> = serde_json::from_str(&row.file_ids).map_err(|err| {
        SqliteStoreError::Consistency(format!("malformed snapshot file ids: {err}"))
    })?;
    Ok(Snapshot {
        snapshot_id: SnapshotId::new(row.snapshot_id),
        colony_name: row.colony_name,
        label: row.label,
        name: row.name,
        file_ids: file_ids.into_iter().map(FileId::new).collect(),
        added: row.added,
    })
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves the latest file identifier of every distinct file name under the
/// exact label, using the caller's transaction.
fn resolve_latest_file_ids(
    tx: &rusqlite::Transaction<'_>,
    tables: &TableNames,
    colony_name: &str,
    label: &str,
) -> Result<Vec<String>, SqliteStoreError> {
    let names: Vec<String> = {
        let mut stmt = tx
            .prepare_cached(&format!(
                "SELECT DISTINCT name FROM {files}
                 WHERE colony_name = ?1 AND label = ?2 ORDER BY name",
                files = tables.files
            ))
            .map_err(db_err)?;
        stmt.query_map(params![colony_name, label], |row| row.get(0))
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?
    };
    let mut file_ids = Vec::with_capacity(names.len());
    for name in &names {
        let file_id: Option<String> = tx
            .query_row(
                &format!(
                    "SELECT file_id FROM {files}
                     WHERE colony_name = ?1 AND label = ?2 AND name = ?3
                     ORDER BY sequence_number DESC LIMIT 1",
                    files = tables.files
                ),
                params![colony_name, label, name],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        // The name came from this transaction's own view of the table, so a
        // miss here means the revision rows are inconsistent.
        let Some(file_id) = file_id else {
            return Err(SqliteStoreError::Consistency(format!(
                "file name {name} under label {label} has no latest revision"
            )));
        };
        file_ids.push(file_id);
    }
    Ok(file_ids)
}

// ============================================================================
// SECTION: SnapshotStore
// ============================================================================

impl SnapshotStore for SqliteColonyStore {
    fn create_snapshot(
        &self,
        colony_name: &str,
        label: &str,
        name: &str,
    ) -> Result<Snapshot, StoreError> {
        let mut guard = self.write_guard()?;
        let tables = self.tables();
        let tx = guard.transaction().map_err(db_err)?;
        let taken: Option<i64> = tx
            .query_row(
                &format!(
                    "SELECT 1 FROM {snapshots} WHERE colony_name = ?1 AND name = ?2",
                    snapshots = tables.snapshots
                ),
                params![colony_name, name],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if taken.is_some() {
            return Err(StoreError::already_exists("snapshot", name));
        }
        let file_ids = resolve_latest_file_ids(&tx, tables, colony_name, label)?;
        let encoded = serde_json::to_string(&file_ids)
            .map_err(|err| StoreError::Invalid(format!("unencodable file ids: {err}")))?;
        let snapshot_id: String = tx
            .query_row("SELECT lower(hex(randomblob(16)))", params![], |row| row.get(0))
            .map_err(db_err)?;
        let added = unix_millis();
        let result = tx.execute(
            &format!(
                "INSERT INTO {snapshots} ({SNAPSHOT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                snapshots = tables.snapshots
            ),
            params![snapshot_id, colony_name, label, name, encoded, added],
        );
        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::already_exists("snapshot", name));
            }
            Err(err) => return Err(db_err(err).into()),
        }
        tx.commit().map_err(db_err)?;
        debug!(
            "created snapshot {name} over {colony_name}/{label} ({} files)",
            file_ids.len()
        );
        Ok(Snapshot {
            snapshot_id: SnapshotId::new(snapshot_id),
            colony_name: colony_name.to_string(),
            label: label.to_string(),
            name: name.to_string(),
            file_ids: file_ids.into_iter().map(FileId::new).collect(),
            added,
        })
    }

    fn get_snapshot_by_id(
        &self,
        snapshot_id: &SnapshotId,
    ) -> Result<Option<Snapshot>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM {snapshots} WHERE snapshot_id = ?1",
            snapshots = self.tables().snapshots
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let row = stmt
            .query_row(params![snapshot_id.as_str()], snapshot_row)
            .optional()
            .map_err(db_err)?;
        row.map(build_snapshot).transpose().map_err(StoreError::from)
    }

    fn get_snapshot_by_name(
        &self,
        colony_name: &str,
        name: &str,
    ) -> Result<Option<Snapshot>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM {snapshots} WHERE colony_name = ?1 AND name = ?2",
            snapshots = self.tables().snapshots
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let row = stmt
            .query_row(params![colony_name, name], snapshot_row)
            .optional()
            .map_err(db_err)?;
        row.map(build_snapshot).transpose().map_err(StoreError::from)
    }

    fn get_snapshots_by_colony(&self, colony_name: &str) -> Result<Vec<Snapshot>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM {snapshots}
             WHERE colony_name = ?1 ORDER BY added DESC, name",
            snapshots = self.tables().snapshots
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![colony_name], snapshot_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        rows.into_iter()
            .map(|row| build_snapshot(row).map_err(StoreError::from))
            .collect()
    }

    fn remove_snapshot_by_id(&self, snapshot_id: &SnapshotId) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let removed = guard
            .execute(
                &format!(
                    "DELETE FROM {snapshots} WHERE snapshot_id = ?1",
                    snapshots = self.tables().snapshots
                ),
                params![snapshot_id.as_str()],
            )
            .map_err(db_err)?;
        if removed == 0 {
            return Err(StoreError::not_found("snapshot", snapshot_id.as_str()));
        }
        Ok(())
    }

    fn remove_snapshot_by_name(&self, colony_name: &str, name: &str) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let removed = guard
            .execute(
                &format!(
                    "DELETE FROM {snapshots} WHERE colony_name = ?1 AND name = ?2",
                    snapshots = self.tables().snapshots
                ),
                params![colony_name, name],
            )
            .map_err(db_err)?;
        if removed == 0 {
            return Err(StoreError::not_found("snapshot", name));
        }
        Ok(())
    }

    fn remove_snapshots_by_colony(&self, colony_name: &str) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        guard
            .execute(
                &format!(
                    "DELETE FROM {snapshots} WHERE colony_name = ?1",
                    snapshots = self.tables().snapshots
                ),
                params![colony_name],
            )
            .map_err(db_err)?;
        Ok(())
    }
}
