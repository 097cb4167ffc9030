//! Claude Code adapter: `~/.claude.json` for user scope, `<project>/.mcp.json`
//! for project scope. Workspace scope is not supported by this client.

use crate::adapter::Adapter;
use crate::ops::{apply_generic, detect_generic, plan_generic, rollback_generic, validate_generic};
use crate::types::{ApplyResult, ConfigRoot, DetectResult, InjectionPlan, Issue, IssueSeverity, PlanRequest, RollbackResult, ValidationResult};
use conduit_core::{BindingScope, ClientBinding, ConduitError};
use conduit_storage::Store;
use std::path::PathBuf;

const SERVERS_KEY: &str = "mcpServers";

/// Adapter for Anthropic's Claude Code CLI.
#[derive(Debug, Default)]
pub struct ClaudeCodeAdapter;

impl ClaudeCodeAdapter {
    /// Construct a new adapter instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn user_config_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|b| b.home_dir().join(".claude.json"))
    }

    fn resolve_path(scope: BindingScope, project_path: Option<&str>) -> Result<String, ConduitError> {
        match scope {
            BindingScope::User => Self::user_config_path()
                .map(|p| p.to_string_lossy().to_string())
                .ok_or_else(|| ConduitError::InvalidRequest("could not determine home directory".to_string())),
            BindingScope::Project => {
                let root = project_path.ok_or_else(|| ConduitError::InvalidRequest("project scope requires project_path".to_string()))?;
                Ok(PathBuf::from(root).join(".mcp.json").to_string_lossy().to_string())
            }
            BindingScope::Workspace => Err(ConduitError::InvalidRequest("claude-code does not support workspace scope".to_string())),
        }
    }
}

impl Adapter for ClaudeCodeAdapter {
    fn id(&self) -> &'static str {
        "claude-code"
    }

    fn detect(&self) -> DetectResult {
        let mut roots = Vec::new();
        if let Some(path) = Self::user_config_path() {
            roots.push(ConfigRoot { exists: path.exists(), path: path.to_string_lossy().to_string(), scope: BindingScope::User });
        }
        detect_generic(Some("claude"), roots)
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
        if which::which("claude").is_err() && Self::user_config_path().is_none_or(|p| !p.exists()) {
            issues.push(Issue {
                severity: IssueSeverity::Warning,
                component: "binary".to_string(),
                description: "claude binary not found on PATH and no existing config detected".to_string(),
                suggestion: Some("install Claude Code or verify PATH".to_string()),
                auto_fix: false,
            });
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_scope_requires_project_path() {
        let err = ClaudeCodeAdapter::resolve_path(BindingScope::Project, None).unwrap_err();
        assert!(matches!(err, ConduitError::InvalidRequest(_)));
    }

    #[test]
    fn project_scope_resolves_under_project_root() {
        let path = ClaudeCodeAdapter::resolve_path(BindingScope::Project, Some("/tmp/myproj")).unwrap();
        assert_eq!(path, "/tmp/myproj/.mcp.json");
    }

    #[test]
    fn workspace_scope_is_rejected() {
        let err = ClaudeCodeAdapter::resolve_path(BindingScope::Workspace, Some("/tmp/myproj")).unwrap_err();
        assert!(matches!(err, ConduitError::InvalidRequest(_)));
    }
}
