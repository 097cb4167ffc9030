//! Versioned schema migrations.
//!
//! Each migration is a single SQL script applied inside its own
//! transaction. The `migrations` table records which versions have run;
//! re-running the daemon against an already-migrated database is a no-op.

use conduit_core::ConduitError;
use rusqlite::Connection;
use tracing::info;

struct Migration {
    version: i64,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("sql/0001_core_tables.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("sql/0002_kb_stub_tables.sql"),
    },
];

/// Apply every migration with a version greater than what's already
/// recorded, in order, each inside its own transaction.
pub(crate) fn apply_all(conn: &mut Connection) -> Result<(), ConduitError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| ConduitError::StoreError(e.to_string()))?;

    for migration in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM migrations WHERE version = ?1)",
                [migration.version],
                |row| row.get(0),
            )
            .map_err(|e| ConduitError::StoreError(e.to_string()))?;
        if already_applied {
            continue;
        }

        let tx = conn
            .transaction()
            .map_err(|e| ConduitError::StoreError(e.to_string()))?;
        tx.execute_batch(migration.sql)
            .map_err(|e| ConduitError::StoreError(e.to_string()))?;
        tx.execute(
            "INSERT INTO migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![migration.version, conduit_core::time::to_rfc3339(chrono::Utc::now())],
        )
        .map_err(|e| ConduitError::StoreError(e.to_string()))?;
        tx.commit().map_err(|e| ConduitError::StoreError(e.to_string()))?;
        info!(version = migration.version, "applied migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_all(&mut conn).unwrap();
        apply_all(&mut conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[test]
    fn kb_stub_tables_exist_but_are_untouched() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_all(&mut conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM kb_sources", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
