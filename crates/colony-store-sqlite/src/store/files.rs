// crates/colony-store-sqlite/src/store/files.rs
// ============================================================================
// Module: SQLite File Operations
// Description: Versioned file metadata with store-assigned revisions.
// Purpose: Implement FileStore for SqliteColonyStore.
// Dependencies: colony-core, rusqlite, log
// ============================================================================

//! ## Overview
//! Append-only file revisions keyed by `(colony_name, label, name)`. The
//! revision number never comes from the caller: `add_file` bumps a per-key
//! counter row with an upsert and inserts the revision in the same
//! transaction, so two concurrent adds for one key commit distinct,
//! strictly increasing sequence numbers. Counters outlive their revisions:
//! deleting a file by name keeps the counter row, so a later re-add resumes
//! after the highest sequence ever issued instead of reusing one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use colony_core::File;
use colony_core::FileId;
use colony_core::FileStore;
use colony_core::StoreError;
use log::debug;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::SqliteColonyStore;
use crate::store::count_from_i64;
use crate::store::db_err;
use crate::store::unix_millis;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Column list shared by every file query.
const FILE_COLUMNS: &str = "file_id, colony_name, label, name, size_bytes, sequence_number, \
                            checksum, backing_reference, added";

/// Maps a file row in [`FILE_COLUMNS`] order.
fn file_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<File> {
    Ok(File {
        file_id: FileId::new(row.get::<_, String>(0)?),
        colony_name: row.get(1)?,
        label: row.get(2)?,
        name: row.get(3)?,
        size_bytes: row.get(4)?,
        sequence_number: row.get(5)?,
        checksum: row.get(6)?,
        backing_reference: row.get(7)?,
        added: row.get(8)?,
    })
}

// ============================================================================
// SECTION: FileStore
// ============================================================================

impl FileStore for SqliteColonyStore {
    fn add_file(&self, file: &File) -> Result<File, StoreError> {
        let mut guard = self.write_guard()?;
        let tables = self.tables();
        let tx = guard.transaction().map_err(db_err)?;
        // Counter bump and revision insert commit or roll back together, so
        // an issued sequence number is durable exactly when its row is.
        let sequence_number: i64 = tx
            .query_row(
                &format!(
                    "INSERT INTO {file_counters} (colony_name, label, name, next_sequence)
                     VALUES (?1, ?2, ?3, 1)
                     ON CONFLICT(colony_name, label, name)
                     DO UPDATE SET next_sequence = next_sequence + 1
                     RETURNING next_sequence",
                    file_counters = tables.file_counters
                ),
                params![file.colony_name, file.label, file.name],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        let added = unix_millis();
        tx.execute(
            &format!(
                "INSERT INTO {files} ({FILE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                files = tables.files
            ),
            params![
                file.file_id.as_str(),
                file.colony_name,
                file.label,
                file.name,
                file.size_bytes,
                sequence_number,
                file.checksum,
                file.backing_reference,
                added,
            ],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        debug!(
            "added file {}/{}/{} revision {sequence_number}",
            file.colony_name, file.label, file.name
        );
        let mut stored = file.clone();
        stored.sequence_number = sequence_number;
        stored.added = added;
        Ok(stored)
    }

    fn get_file_by_id(&self, file_id: &FileId) -> Result<Option<File>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM {files} WHERE file_id = ?1",
            files = self.tables().files
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let file = stmt
            .query_row(params![file_id.as_str()], file_from_row)
            .optional()
            .map_err(db_err)?;
        Ok(file)
    }

    fn get_latest_file(
        &self,
        colony_name: &str,
        label: &str,
        name: &str,
    ) -> Result<Option<File>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM {files}
             WHERE colony_name = ?1 AND label = ?2 AND name = ?3
             ORDER BY sequence_number DESC LIMIT 1",
            files = self.tables().files
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let file = stmt
            .query_row(params![colony_name, label, name], file_from_row)
            .optional()
            .map_err(db_err)?;
        Ok(file)
    }

    fn get_files_by_name(
        &self,
        colony_name: &str,
        label: &str,
        name: &str,
    ) -> Result<Vec<File>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM {files}
             WHERE colony_name = ?1 AND label = ?2 AND name = ?3
             ORDER BY sequence_number DESC",
            files = self.tables().files
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![colony_name, label, name], file_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn get_file_names_by_label(
        &self,
        colony_name: &str,
        label: &str,
    ) -> Result<Vec<String>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT DISTINCT name FROM {files}
             WHERE colony_name = ?1 AND label = ?2 ORDER BY name",
            files = self.tables().files
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![colony_name, label], |row| row.get(0))
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn get_file_labels(&self, colony_name: &str) -> Result<Vec<String>, StoreError> {
        let guard = self.read_guard()?;
        let sql = format!(
            "SELECT DISTINCT label FROM {files} WHERE colony_name = ?1 ORDER BY label",
            files = self.tables().files
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![colony_name], |row| row.get(0))
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn get_file_labels_by_prefix(
        &self,
        colony_name: &str,
        prefix: &str,
    ) -> Result<Vec<String>, StoreError> {
        let guard = self.read_guard()?;
        // substr comparison instead of LIKE: prefixes may contain `%`/`_`.
        let sql = format!(
            "SELECT DISTINCT label FROM {files}
             WHERE colony_name = ?1 AND substr(label, 1, length(?2)) = ?2
             ORDER BY label",
            files = self.tables().files
        );
        let mut stmt = guard.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![colony_name, prefix], |row| row.get(0))
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn count_files_by_colony(&self, colony_name: &str) -> Result<u64, StoreError> {
        let guard = self.read_guard()?;
        let count: i64 = guard
            .query_row(
                &format!(
                    "SELECT COUNT(1) FROM {files} WHERE colony_name = ?1",
                    files = self.tables().files
                ),
                params![colony_name],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count_from_i64(count)?)
    }

    fn remove_file_by_id(&self, file_id: &FileId) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        let removed = guard
            .execute(
                &format!("DELETE FROM {files} WHERE file_id = ?1", files = self.tables().files),
                params![file_id.as_str()],
            )
            .map_err(db_err)?;
        if removed == 0 {
            return Err(StoreError::not_found("file", file_id.as_str()));
        }
        Ok(())
    }

    fn remove_file_by_name(
        &self,
        colony_name: &str,
        label: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        let guard = self.write_guard()?;
        // All revisions go; the counter row stays so sequences are never
        // reissued for this key.
        let removed = guard
            .execute(
                &format!(
                    "DELETE FROM {files} WHERE colony_name = ?1 AND label = ?2 AND name = ?3",
                    files = self.tables().files
                ),
                params![colony_name, label, name],
            )
            .map_err(db_err)?;
        if removed == 0 {
            return Err(StoreError::not_found("file", name));
        }
        Ok(())
    }

    fn remove_files_by_colony(&self, colony_name: &str) -> Result<(), StoreError> {
        let mut guard = self.write_guard()?;
        let tables = self.tables();
        let tx = guard.transaction().map_err(db_err)?;
        tx.execute(
            &format!("DELETE FROM {files} WHERE colony_name = ?1", files = tables.files),
            params![colony_name],
        )
        .map_err(db_err)?;
        tx.execute(
            &format!(
                "DELETE FROM {file_counters} WHERE colony_name = ?1",
                file_counters = tables.file_counters
            ),
            params![colony_name],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }
}
