//! The JSON request/response envelope carried over the local IPC socket.
//!
//! Wire framing itself (the 4-byte length prefix) lives in [`crate::socket`];
//! this module only defines the JSON shapes inside each frame.

use conduit_core::ConduitError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One request frame: `{id, method, params}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Caller-chosen correlation id, echoed back on the response.
    pub id: Value,
    /// Dotted method name, e.g. `"instance.create"`.
    pub method: String,
    /// Method-specific parameters, or `null` for no-argument methods.
    #[serde(default)]
    pub params: Value,
}

/// One response frame: `{id, result}` on success, `{id, error}` on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResponse {
    /// Echoes the request's `id`.
    pub id: Value,
    /// Present iff the call succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present iff the call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

/// The structured error shape named in `SPEC_FULL.md` §10.6: `kind` is one
/// of the error kinds from §7 (see [`ConduitError::kind`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// The stable error kind name.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// `block_reasons`, present only for `PolicyDenied`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_reasons: Vec<String>,
}

impl DispatchResponse {
    /// Build a success response.
    #[must_use]
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response from a [`ConduitError`].
    #[must_use]
    pub fn err(id: Value, error: &ConduitError) -> Self {
        let block_reasons = match error {
            ConduitError::PolicyDenied { block_reasons } => block_reasons.clone(),
            _ => Vec::new(),
        };
        Self {
            id,
            result: None,
            error: Some(ErrorPayload {
                kind: error.kind().to_string(),
                message: error.to_string(),
                block_reasons,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_response_omits_error_field() {
        let response = DispatchResponse::ok(json!(1), json!({"a": 1}));
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["result"], json!({"a": 1}));
    }

    #[test]
    fn err_response_carries_block_reasons_for_policy_denied() {
        let error = ConduitError::PolicyDenied {
            block_reasons: vec!["root filesystem".to_string()],
        };
        let response = DispatchResponse::err(json!(2), &error);
        let payload = response.error.unwrap();
        assert_eq!(payload.kind, "PolicyDenied");
        assert_eq!(payload.block_reasons, vec!["root filesystem".to_string()]);
    }

    #[test]
    fn err_response_leaves_block_reasons_empty_for_other_kinds() {
        let error = ConduitError::not_found("instance", "inst_abc");
        let response = DispatchResponse::err(json!(3), &error);
        assert!(response.error.unwrap().block_reasons.is_empty());
    }
}
