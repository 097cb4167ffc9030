//! Read-only registry of known client adapters, populated once at daemon
//! startup.

use crate::adapter::Adapter;
use crate::claude_code::ClaudeCodeAdapter;
use crate::cursor::CursorAdapter;
use crate::gemini_cli::GeminiCliAdapter;
use crate::vscode::VsCodeAdapter;
use conduit_core::ConduitError;
use std::collections::BTreeMap;

/// Holds one boxed [`Adapter`] per known client id.
pub struct AdapterRegistry {
    adapters: BTreeMap<&'static str, Box<dyn Adapter>>,
}

impl AdapterRegistry {
    /// Build the registry with every built-in adapter registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self { adapters: BTreeMap::new() };
        registry.register(Box::new(ClaudeCodeAdapter::new()));
        registry.register(Box::new(CursorAdapter::new()));
        registry.register(Box::new(VsCodeAdapter::new()));
        registry.register(Box::new(GeminiCliAdapter::new()));
        registry
    }

    /// Register (or replace) an adapter under its own [`Adapter::id`].
    pub fn register(&mut self, adapter: Box<dyn Adapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    /// Look up an adapter by client id.
    ///
    /// # Errors
    /// Returns [`ConduitError::InvalidRequest`] if `client_id` is not known.
    pub fn get(&self, client_id: &str) -> Result<&dyn Adapter, ConduitError> {
        self.adapters
            .get(client_id)
            .map(AsRef::as_ref)
            .ok_or_else(|| ConduitError::InvalidRequest(format!("unknown client id: {client_id}")))
    }

    /// Every registered client id, in a stable order.
    pub fn client_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.adapters.keys().copied()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_cover_all_known_clients() {
        let registry = AdapterRegistry::with_builtins();
        let ids: Vec<_> = registry.client_ids().collect();
        assert!(ids.contains(&"claude-code"));
        assert!(ids.contains(&"cursor"));
        assert!(ids.contains(&"vscode"));
        assert!(ids.contains(&"gemini-cli"));
    }

    #[test]
    fn unknown_client_id_is_invalid_request() {
        let registry = AdapterRegistry::with_builtins();
        let err = registry.get("nonexistent").unwrap_err();
        assert!(matches!(err, ConduitError::InvalidRequest(_)));
    }
}
