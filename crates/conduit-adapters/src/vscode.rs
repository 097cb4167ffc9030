//! VS Code adapter: `<workspace>/.vscode/mcp.json`, under the `servers` key.
//! User-scope publishing is not supported by this client.

use crate::adapter::Adapter;
use crate::ops::{apply_generic, detect_generic, plan_generic, rollback_generic, validate_generic};
use crate::types::{ApplyResult, ConfigRoot, DetectResult, InjectionPlan, Issue, IssueSeverity, PlanRequest, RollbackResult, ValidationResult};
use conduit_core::{BindingScope, ClientBinding, ConduitError};
use conduit_storage::Store;
use std::path::PathBuf;

const SERVERS_KEY: &str = "servers";

/// Adapter for Visual Studio Code's MCP support.
#[derive(Debug, Default)]
pub struct VsCodeAdapter;

impl VsCodeAdapter {
    /// Construct a new adapter instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn resolve_path(scope: BindingScope, project_path: Option<&str>) -> Result<String, ConduitError> {
        match scope {
            BindingScope::Project | BindingScope::Workspace => {
                let root = project_path.ok_or_else(|| ConduitError::InvalidRequest("vscode requires project_path".to_string()))?;
                Ok(PathBuf::from(root).join(".vscode").join("mcp.json").to_string_lossy().to_string())
            }
            BindingScope::User => Err(ConduitError::InvalidRequest("vscode does not support user scope".to_string())),
        }
    }
}

impl Adapter for VsCodeAdapter {
    fn id(&self) -> &'static str {
        "vscode"
    }

    fn detect(&self) -> DetectResult {
        detect_generic(Some("code"), Vec::<ConfigRoot>::new())
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
        if which::which("code").is_err() {
            issues.push(Issue {
                severity: IssueSeverity::Warning,
                component: "binary".to_string(),
                description: "code binary not found on PATH".to_string(),
                suggestion: Some("install VS Code's command line tools".to_string()),
                auto_fix: false,
            });
        }
        issues
    }
}
