//! The append-only consent ledger and its hash chain.
//!
//! `entry_hash = H(prev_hash ‖ canonical(entry_without_hash))`, where `H` is
//! BLAKE3 and `canonical` is the entry's compact JSON encoding. Appends are
//! serialized under the Store's connection lock so the chain stays linear.

use crate::db::{classify, Store};
use conduit_core::ConduitError;
use conduit_crypto::ContentHash;
use rusqlite::{params, Row};
use serde::Serialize;
use serde_json::Value;

/// One entry in the consent ledger, as read back for verification or display.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    /// Monotonically increasing row id.
    pub entry_id: i64,
    /// The kind of event recorded (`"policy_decision"`, `"instance_created"`, ...).
    pub event_type: String,
    /// The kind of entity the entry concerns (`"instance"`, `"binding"`, ...).
    pub entity_type: String,
    /// The entity's identifier.
    pub entity_id: String,
    /// What happened (`"create"`, `"deny"`, `"grant"`, ...).
    pub action: String,
    /// Opaque structured detail.
    pub details: Value,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
    /// Hex-encoded hash of the previous entry (`"0" * 64` for the first entry).
    pub prev_hash: String,
    /// Hex-encoded hash of this entry.
    pub entry_hash: String,
}

/// The fields that go into an entry's hash, before `prev_hash`/`entry_hash`
/// are known. Field order is fixed by struct declaration order and
/// `serde_json`'s preserve-order feature is not enabled, so we serialize
/// through an explicit tuple instead of relying on map key order.
#[derive(Serialize)]
struct CanonicalEntry<'a> {
    event_type: &'a str,
    entity_type: &'a str,
    entity_id: &'a str,
    action: &'a str,
    details: &'a Value,
    timestamp: &'a str,
}

fn canonical_bytes(
    event_type: &str,
    entity_type: &str,
    entity_id: &str,
    action: &str,
    details: &Value,
    timestamp: &str,
) -> Result<Vec<u8>, ConduitError> {
    let entry = CanonicalEntry {
        event_type,
        entity_type,
        entity_id,
        action,
        details,
        timestamp,
    };
    serde_json::to_vec(&entry).map_err(ConduitError::Serialization)
}

impl Store {
    /// Append a new entry to the consent ledger. Computes `entry_hash` from
    /// the current tail under the held connection lock, so concurrent
    /// appends cannot race the chain.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] on a write failure.
    #[allow(clippy::too_many_arguments)]
    pub fn append_ledger_entry(
        &self,
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        action: &str,
        details: Value,
        timestamp: &str,
    ) -> Result<i64, ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");

        let prev_hash: String = conn
            .query_row(
                "SELECT entry_hash FROM ledger ORDER BY entry_id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .unwrap_or_else(|_| ContentHash::zero().to_hex());

        let bytes = canonical_bytes(event_type, entity_type, entity_id, action, &details, timestamp)?;
        let mut chained = Vec::with_capacity(prev_hash.len() + bytes.len());
        chained.extend_from_slice(prev_hash.as_bytes());
        chained.extend_from_slice(&bytes);
        let entry_hash = ContentHash::hash(&chained).to_hex();

        conn.execute(
            "INSERT INTO ledger (
                event_type, entity_type, entity_id, action, details, timestamp, prev_hash, entry_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event_type,
                entity_type,
                entity_id,
                action,
                serde_json::to_string(&details).map_err(ConduitError::Serialization)?,
                timestamp,
                prev_hash,
                entry_hash,
            ],
        )
        .map_err(classify)?;

        Ok(conn.last_insert_rowid())
    }

    /// Read the full ledger in entry order.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::StoreError`] on a query failure.
    pub fn list_ledger_entries(&self) -> Result<Vec<LedgerEntry>, ConduitError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT entry_id, event_type, entity_type, entity_id, action, details,
                        timestamp, prev_hash, entry_hash
                 FROM ledger ORDER BY entry_id",
            )
            .map_err(classify)?;
        let rows = stmt
            .query_map([], row_to_entry)
            .map_err(classify)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(classify)?;
        Ok(rows)
    }

    /// Walk the chain and verify every adjacent pair's hash relationship.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Corruption`] naming the first entry at which
    /// the chain no longer verifies.
    pub fn verify_ledger_chain(&self) -> Result<(), ConduitError> {
        let entries = self.list_ledger_entries()?;
        let mut expected_prev = ContentHash::zero().to_hex();
        for entry in &entries {
            if entry.prev_hash != expected_prev {
                return Err(ConduitError::Corruption {
                    entry_id: entry.entry_id,
                    reason: "prev_hash does not match the preceding entry's entry_hash".to_string(),
                });
            }
            let bytes = canonical_bytes(
                &entry.event_type,
                &entry.entity_type,
                &entry.entity_id,
                &entry.action,
                &entry.details,
                &entry.timestamp,
            )?;
            let mut chained = Vec::with_capacity(entry.prev_hash.len() + bytes.len());
            chained.extend_from_slice(entry.prev_hash.as_bytes());
            chained.extend_from_slice(&bytes);
            let recomputed = ContentHash::hash(&chained).to_hex();
            if recomputed != entry.entry_hash {
                return Err(ConduitError::Corruption {
                    entry_id: entry.entry_id,
                    reason: "entry_hash does not match the recomputed hash".to_string(),
                });
            }
            expected_prev = entry.entry_hash.clone();
        }
        Ok(())
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let details: String = row.get(5)?;
    Ok(LedgerEntry {
        entry_id: row.get(0)?,
        event_type: row.get(1)?,
        entity_type: row.get(2)?,
        entity_id: row.get(3)?,
        action: row.get(4)?,
        details: serde_json::from_str(&details).unwrap_or(Value::Null),
        timestamp: row.get(6)?,
        prev_hash: row.get(7)?,
        entry_hash: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_entry_chains_from_genesis() {
        let store = Store::open_in_memory().unwrap();
        store
            .append_ledger_entry(
                "policy_decision",
                "instance",
                "inst-1",
                "deny",
                json!({"reason": "root filesystem"}),
                "2026-01-01T00:00:00Z",
            )
            .unwrap();
        let entries = store.list_ledger_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].prev_hash, ContentHash::zero().to_hex());
        store.verify_ledger_chain().unwrap();
    }

    #[test]
    fn chain_links_successive_entries() {
        let store = Store::open_in_memory().unwrap();
        store
            .append_ledger_entry("instance_created", "instance", "inst-1", "create", json!({}), "2026-01-01T00:00:00Z")
            .unwrap();
        store
            .append_ledger_entry("instance_started", "instance", "inst-1", "start", json!({}), "2026-01-01T00:00:01Z")
            .unwrap();

        let entries = store.list_ledger_entries().unwrap();
        assert_eq!(entries[1].prev_hash, entries[0].entry_hash);
        store.verify_ledger_chain().unwrap();
    }

    #[test]
    fn tampered_entry_fails_verification() {
        let store = Store::open_in_memory().unwrap();
        store
            .append_ledger_entry("instance_created", "instance", "inst-1", "create", json!({}), "2026-01-01T00:00:00Z")
            .unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute("UPDATE ledger SET action = 'tampered' WHERE entry_id = 1", [])
                .unwrap();
        }
        let err = store.verify_ledger_chain().unwrap_err();
        assert!(matches!(err, ConduitError::Corruption { entry_id: 1, .. }));
    }
}
