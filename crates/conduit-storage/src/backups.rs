//! Typed accessors for `ConfigBackup` rows.

use crate::db::{classify, Store};
use conduit_core::{BackupId, ConduitError, ConfigBackup};
use rusqlite::{params, Row};

impl Store {
    /// Insert a new backup row, created during adapter Apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] on a write failure.
    pub fn create_backup(&self, backup: &ConfigBackup, created_at: &str) -> Result<(), ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO backups (
                backup_id, change_set_id, client_id, original_path, backup_path,
                file_existed, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                backup.backup_id.as_uuid().to_string(),
                backup.change_set_id,
                backup.client_id,
                backup.original_path,
                backup.backup_path,
                backup.file_existed,
                created_at,
            ],
        )
        .map_err(classify)?;
        Ok(())
    }

    /// List every backup belonging to `change_set_id`, in creation order —
    /// the order adapter Apply wrote them, and the order Rollback undoes
    /// them in reverse.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] on a query failure.
    pub fn get_backups_by_change_set(
        &self,
        change_set_id: &str,
    ) -> Result<Vec<ConfigBackup>, ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT backup_id, change_set_id, client_id, original_path, backup_path, file_existed
                 FROM backups WHERE change_set_id = ?1 ORDER BY created_at",
            )
            .map_err(classify)?;
        let rows = stmt
            .query_map(params![change_set_id], row_to_backup)
            .map_err(classify)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(classify)?;
        Ok(rows)
    }
}

fn row_to_backup(row: &Row<'_>) -> rusqlite::Result<ConfigBackup> {
    let backup_id: String = row.get(0)?;
    Ok(ConfigBackup {
        backup_id: BackupId::parse(&backup_id).unwrap_or_default(),
        change_set_id: row.get(1)?,
        client_id: row.get(2)?,
        original_path: row.get(3)?,
        backup_path: row.get(4)?,
        file_existed: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_backup(change_set_id: &str) -> ConfigBackup {
        ConfigBackup {
            backup_id: BackupId::new(),
            change_set_id: change_set_id.to_string(),
            client_id: "claude-code".to_string(),
            original_path: "/home/user/.claude.json".to_string(),
            backup_path: "/home/user/.conduit/backups/cs-1/claude.json".to_string(),
            file_existed: true,
        }
    }

    #[test]
    fn backups_are_returned_for_their_change_set_only() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_backup(&sample_backup("cs-1"), "2026-01-01T00:00:00Z")
            .unwrap();
        store
            .create_backup(&sample_backup("cs-2"), "2026-01-01T00:00:01Z")
            .unwrap();

        let cs1 = store.get_backups_by_change_set("cs-1").unwrap();
        assert_eq!(cs1.len(), 1);
        assert_eq!(cs1[0].change_set_id, "cs-1");
    }

    #[test]
    fn unknown_change_set_is_empty_not_an_error() {
        let store = Store::open_in_memory().unwrap();
        let backups = store.get_backups_by_change_set("nonexistent").unwrap();
        assert!(backups.is_empty());
    }
}
