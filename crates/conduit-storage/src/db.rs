//! Connection management for the embedded store.
//!
//! A single `rusqlite` connection, serialized behind a mutex, backs the
//! whole daemon: one writer, write-ahead logging, a 5 s busy timeout.

use crate::migrations;
use conduit_core::ConduitError;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// The embedded SQL persistence layer.
///
/// Cheap to clone-by-reference (wrap in an `Arc` at the call site); every
/// accessor takes `&self` and serializes on the internal connection lock.
pub struct Store {
    pub(crate) conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path`, applying pragmas and any
    /// pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] if the file cannot be opened or
    /// a migration fails.
    pub fn open(path: &Path) -> Result<Self, ConduitError> {
        let mut conn =
            Connection::open(path).map_err(|e| ConduitError::StoreError(e.to_string()))?;
        Self::configure(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database. Intended for tests.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] if a migration fails.
    pub fn open_in_memory() -> Result<Self, ConduitError> {
        let mut conn = Connection::open_in_memory()
            .map_err(|e| ConduitError::StoreError(e.to_string()))?;
        Self::configure(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &mut Connection) -> Result<(), ConduitError> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| ConduitError::StoreError(e.to_string()))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| ConduitError::StoreError(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| ConduitError::StoreError(e.to_string()))?;
        migrations::apply_all(conn)?;
        Ok(())
    }
}

/// Map a constraint-violation `rusqlite::Error` to [`ConduitError::Conflict`];
/// anything else becomes [`ConduitError::StoreError`].
pub(crate) fn classify(err: rusqlite::Error) -> ConduitError {
    if let rusqlite::Error::SqliteFailure(ref sqlite_err, _) = err {
        if sqlite_err.code == rusqlite::ErrorCode::ConstraintViolation {
            return ConduitError::Conflict(err.to_string());
        }
    }
    ConduitError::StoreError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_in_memory_and_migrates() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert!(count > 0);
    }

    #[test]
    fn opens_file_backed_store_and_reopens_without_remigrating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conduit.db");
        {
            let _store = Store::open(&path).unwrap();
        }
        let store = Store::open(&path).unwrap();
        let conn = store.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }
}
