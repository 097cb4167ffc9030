//! Shared JSON document manipulation: read/parse, ensure a top-level object
//! key, insert a server entry, serialize with two-space indentation.

use conduit_core::{ConduitError, InstanceId};
use serde_json::{Map, Value};
use std::path::Path;

/// Read and parse `path` as a JSON object. Returns `Ok(None)` if the file
/// does not exist.
///
/// # Errors
/// Returns [`ConduitError::Io`] on a read failure other than not-found, or
/// [`ConduitError::InvalidConfig`] if the content is not valid JSON.
pub fn read_json_object(path: &Path) -> Result<Option<Value>, ConduitError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConduitError::Io(e)),
    };
    if raw.trim().is_empty() {
        return Ok(Some(Value::Object(Map::new())));
    }
    let value: Value = serde_json::from_str(&raw).map_err(|e| ConduitError::InvalidConfig {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(Some(value))
}

/// Ensure `doc`'s top-level `key` is a JSON object, creating it if absent.
///
/// # Panics
/// Panics if `doc` is not a JSON object; callers only pass documents
/// produced by [`read_json_object`] or a freshly built `Value::Object`.
pub fn ensure_object_key<'a>(doc: &'a mut Value, key: &str) -> &'a mut Map<String, Value> {
    let root = doc.as_object_mut().expect("config document must be a JSON object");
    root.entry(key).or_insert_with(|| Value::Object(Map::new()));
    root.get_mut(key).and_then(Value::as_object_mut).expect("servers key must be an object")
}

/// Serialize `doc` with two-space indentation, as every adapter writes it.
///
/// # Errors
/// Returns [`ConduitError::Serialization`] if `doc` cannot be serialized
/// (unreachable for documents built from [`read_json_object`]/`serde_json::Value`).
pub fn to_pretty_string(doc: &Value) -> Result<String, ConduitError> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Derive the server name `conduit-<slug(display_name)>`: lowercase, spaces
/// replaced with hyphens.
#[must_use]
pub fn slug(display_name: &str) -> String {
    display_name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

/// Build the server entry object written under the adapter's top-level key,
/// identical across clients modulo that key.
#[must_use]
pub fn build_server_entry(instance_id: InstanceId, command: &str, socket_path: &str) -> Value {
    let mut env = Map::new();
    env.insert("CONDUIT_SOCKET".to_string(), Value::String(socket_path.to_string()));

    let mut entry = Map::new();
    entry.insert("command".to_string(), Value::String(command.to_string()));
    entry.insert(
        "args".to_string(),
        Value::Array(
            ["mcp", "stdio", "--instance", &instance_id.to_string()]
                .into_iter()
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
    );
    entry.insert("env".to_string(), Value::Object(env));
    entry.insert("_managed_by".to_string(), Value::String("conduit".to_string()));
    entry.insert("_instance_id".to_string(), Value::String(instance_id.to_string()));
    Value::Object(entry)
}

/// Whether `doc`'s `key` object contains an entry whose `_instance_id`
/// equals `instance_id`.
#[must_use]
pub fn contains_instance_entry(doc: &Value, key: &str, instance_id: InstanceId) -> bool {
    let wanted = instance_id.to_string();
    doc.get(key)
        .and_then(Value::as_object)
        .is_some_and(|servers| servers.values().any(|v| v.get("_instance_id").and_then(Value::as_str) == Some(wanted.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::InstanceId;

    #[test]
    fn slug_lowercases_and_hyphenates() {
        assert_eq!(slug("Weather Forecast"), "weather-forecast");
        assert_eq!(slug("already-slugged"), "already-slugged");
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(read_json_object(&path).unwrap().is_none());
    }

    #[test]
    fn unparseable_file_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = read_json_object(&path).unwrap_err();
        assert!(matches!(err, ConduitError::InvalidConfig { .. }));
    }

    #[test]
    fn server_entry_round_trips_instance_id() {
        let instance_id = InstanceId::new();
        let mut doc = Value::Object(Map::new());
        let servers = ensure_object_key(&mut doc, "mcpServers");
        servers.insert("conduit-weather".to_string(), build_server_entry(instance_id, "conduit", "/tmp/conduit.sock"));
        assert!(contains_instance_entry(&doc, "mcpServers", instance_id));
    }
}
