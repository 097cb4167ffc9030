//! Cursor adapter: `~/.cursor/mcp.json` for user scope, `<project>/.cursor/mcp.json`
//! for project scope.

use crate::adapter::Adapter;
use crate::ops::{apply_generic, detect_generic, plan_generic, rollback_generic, validate_generic};
use crate::types::{ApplyResult, ConfigRoot, DetectResult, InjectionPlan, Issue, IssueSeverity, PlanRequest, RollbackResult, ValidationResult};
use conduit_core::{BindingScope, ClientBinding, ConduitError};
use conduit_storage::Store;
use std::path::PathBuf;

const SERVERS_KEY: &str = "mcpServers";

/// Adapter for the Cursor editor.
#[derive(Debug, Default)]
pub struct CursorAdapter;

impl CursorAdapter {
    /// Construct a new adapter instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn user_config_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|b| b.home_dir().join(".cursor").join("mcp.json"))
    }

    fn resolve_path(scope: BindingScope, project_path: Option<&str>) -> Result<String, ConduitError> {
        match scope {
            BindingScope::User => Self::user_config_path()
                .map(|p| p.to_string_lossy().to_string())
                .ok_or_else(|| ConduitError::InvalidRequest("could not determine home directory".to_string())),
            BindingScope::Project => {
                let root = project_path.ok_or_else(|| ConduitError::InvalidRequest("project scope requires project_path".to_string()))?;
                Ok(PathBuf::from(root).join(".cursor").join("mcp.json").to_string_lossy().to_string())
            }
            BindingScope::Workspace => Err(ConduitError::InvalidRequest("cursor does not support workspace scope".to_string())),
        }
    }
}

impl Adapter for CursorAdapter {
    fn id(&self) -> &'static str {
        "cursor"
    }

    fn detect(&self) -> DetectResult {
        let mut roots = Vec::new();
        if let Some(path) = Self::user_config_path() {
            roots.push(ConfigRoot { exists: path.exists(), path: path.to_string_lossy().to_string(), scope: BindingScope::User });
        }
        detect_generic(None, roots)
    }

    fn plan(&self, request: &PlanRequest) -> Result<InjectionPlan, ConduitError> {
        let path = Self::resolve_path(request.scope, request.project_path.as_deref())?;
        Ok(plan_generic(self.id(), &path, request.scope, SERVERS_KEY, request))
    }

    fn apply(&self, store: &Store, plan: &InjectionPlan) -> Result<ApplyResult, ConduitError> {
        apply_generic(store, plan)
    }

    fn validate(&self, binding: &ClientBinding) -> ValidationResult {
        validate_generic(binding, SERVERS_KEY)
    }

    fn rollback(&self, store: &Store, change_set_id: &str) -> RollbackResult {
        rollback_generic(store, change_set_id)
    }

    fn doctor(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        if Self::user_config_path().is_none_or(|p| !p.exists()) {
            issues.push(Issue {
                severity: IssueSeverity::Warning,
                component: "config".to_string(),
                description: "no Cursor user config detected".to_string(),
                suggestion: Some("open Cursor at least once to create its config directory".to_string()),
                auto_fix: false,
            });
        }
        issues
    }
}
