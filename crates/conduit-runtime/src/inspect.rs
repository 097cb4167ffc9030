//! Parses the JSON array both `docker inspect` and `podman inspect` emit —
//! the two engines share enough of this shape that one parser covers both.

use crate::provider::ContainerInfo;
use conduit_core::ConduitError;
use std::collections::HashMap;

/// Parse the first element of a `docker inspect`/`podman inspect` JSON
/// array into a [`ContainerInfo`].
///
/// # Errors
/// Returns [`ConduitError::RuntimeFailed`] if `raw` is not a JSON array
/// with at least one object.
pub(crate) fn parse_docker_like_inspect(raw: &str) -> Result<ContainerInfo, ConduitError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ConduitError::RuntimeFailed(format!("unparseable inspect output: {e}")))?;
    let entry = value
        .as_array()
        .and_then(|arr| arr.first())
        .ok_or_else(|| ConduitError::RuntimeFailed("inspect output was empty".to_string()))?;

    let id = entry.get("Id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let name = entry
        .get("Name")
        .and_then(|v| v.as_str())
        .map(|s| s.trim_start_matches('/').to_string())
        .unwrap_or_default();
    let image = entry
        .get("Config")
        .and_then(|c| c.get("Image"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let state = entry
        .get("State")
        .and_then(|s| s.get("Status"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let status = state.clone();
    let created_at = entry.get("Created").and_then(|v| v.as_str()).map(str::to_string);
    let labels: HashMap<String, String> = entry
        .get("Config")
        .and_then(|c| c.get("Labels"))
        .and_then(|v| v.as_object())
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Ok(ContainerInfo {
        id,
        name,
        image,
        state,
        status,
        labels,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_inspect_record() {
        let raw = r#"[{
            "Id": "abc123",
            "Name": "/conduit-abc",
            "Config": {"Image": "ghcr.io/acme/echo:latest", "Labels": {"conduit.managed": "true"}},
            "State": {"Status": "running"},
            "Created": "2026-01-01T00:00:00Z"
        }]"#;
        let info = parse_docker_like_inspect(raw).unwrap();
        assert_eq!(info.id, "abc123");
        assert_eq!(info.name, "conduit-abc");
        assert_eq!(info.state, "running");
        assert_eq!(info.labels.get("conduit.managed").map(String::as_str), Some("true"));
    }

    #[test]
    fn empty_array_is_an_error() {
        assert!(parse_docker_like_inspect("[]").is_err());
    }
}
