//! Gemini CLI adapter: `~/.gemini/settings.json` for user scope,
//! `<project>/.gemini/settings.json` for project scope. `apply` prefers
//! shelling out to `gemini mcp add` and only falls back to direct file
//! manipulation if the binary is absent or the subcommand fails.

use crate::adapter::Adapter;
use crate::ops::{apply_generic, detect_generic, plan_generic, rollback_generic, validate_generic};
use crate::types::{ApplyResult, ConfigRoot, DetectResult, InjectionPlan, Issue, IssueSeverity, PlanRequest, RollbackResult, ValidationResult, ValidationStatus};
use conduit_core::{BindingScope, ClientBinding, ConduitError};
use conduit_storage::Store;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

const SERVERS_KEY: &str = "mcpServers";

/// Adapter for the Gemini CLI.
#[derive(Debug, Default)]
pub struct GeminiCliAdapter;

impl GeminiCliAdapter {
    /// Construct a new adapter instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn user_config_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|b| b.home_dir().join(".gemini").join("settings.json"))
    }

    fn resolve_path(scope: BindingScope, project_path: Option<&str>) -> Result<String, ConduitError> {
        match scope {
            BindingScope::User => Self::user_config_path()
                .map(|p| p.to_string_lossy().to_string())
                .ok_or_else(|| ConduitError::InvalidRequest("could not determine home directory".to_string())),
            BindingScope::Project => {
                let root = project_path.ok_or_else(|| ConduitError::InvalidRequest("project scope requires project_path".to_string()))?;
                Ok(PathBuf::from(root).join(".gemini").join("settings.json").to_string_lossy().to_string())
            }
            BindingScope::Workspace => Err(ConduitError::InvalidRequest("gemini-cli does not support workspace scope".to_string())),
        }
    }

    /// Try `gemini mcp add <name> <command> <args...>`. Returns `Ok(true)` if
    /// the binary ran and exited successfully.
    fn try_gemini_mcp_add(plan: &InjectionPlan) -> bool {
        if which::which("gemini").is_err() {
            return false;
        }
        let command = plan.entry.get("command").and_then(serde_json::Value::as_str).unwrap_or("conduit");
        let args: Vec<String> = plan
            .entry
            .get("args")
            .and_then(serde_json::Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        let mut cmd = Command::new("gemini");
        cmd.arg("mcp").arg("add").arg(&plan.server_name).arg(command);
        cmd.args(&args);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        cmd.status().is_ok_and(|status| status.success())
    }

    /// Ask `gemini mcp list --json` whether any registered server's `args`
    /// carry `instance_id` (the same identifier [`build_server_entry`] embeds
    /// after `--instance`).
    fn gemini_mcp_list_contains(instance_id: &str) -> Option<bool> {
        if which::which("gemini").is_err() {
            return None;
        }
        let output = Command::new("gemini").arg("mcp").arg("list").arg("--json").stdin(Stdio::null()).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let doc: serde_json::Value = serde_json::from_str(&text).ok()?;
        Some(doc.as_array().is_some_and(|servers| {
            servers.iter().any(|s| {
                s.get("args")
                    .and_then(serde_json::Value::as_array)
                    .is_some_and(|args| args.iter().any(|a| a.as_str() == Some(instance_id)))
            })
        }))
    }
}

impl Adapter for GeminiCliAdapter {
    fn id(&self) -> &'static str {
        "gemini-cli"
    }

    fn detect(&self) -> DetectResult {
        let mut roots = Vec::new();
        if let Some(path) = Self::user_config_path() {
            roots.push(ConfigRoot { exists: path.exists(), path: path.to_string_lossy().to_string(), scope: BindingScope::User });
        }
        detect_generic(Some("gemini"), roots)
    }

    fn plan(&self, request: &PlanRequest) -> Result<InjectionPlan, ConduitError> {
        let path = Self::resolve_path(request.scope, request.project_path.as_deref())?;
        Ok(plan_generic(self.id(), &path, request.scope, SERVERS_KEY, request))
    }

    fn apply(&self, store: &Store, plan: &InjectionPlan) -> Result<ApplyResult, ConduitError> {
        if Self::try_gemini_mcp_add(plan) {
            return Ok(ApplyResult {
                success: true,
                config_path: plan.config_path.clone(),
                config_scope: plan.scope,
                files_changed: Vec::new(),
            });
        }
        apply_generic(store, plan)
    }

    fn validate(&self, binding: &ClientBinding) -> ValidationResult {
        let start = Instant::now();
        if let Some(found) = Self::gemini_mcp_list_contains(&binding.instance_id.to_string()) {
            let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            return ValidationResult {
                status: if found { ValidationStatus::Pass } else { ValidationStatus::Fail },
                latency_ms,
                tools_found: Vec::new(),
                errors: if found { Vec::new() } else { vec!["gemini mcp list did not report this server".to_string()] },
                observations: Some("validated via gemini mcp list --json".to_string()),
            };
        }
        validate_generic(binding, SERVERS_KEY)
    }

    fn rollback(&self, store: &Store, change_set_id: &str) -> RollbackResult {
        rollback_generic(store, change_set_id)
    }

    fn doctor(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        if which::which("gemini").is_err() {
            issues.push(Issue {
                severity: IssueSeverity::Warning,
                component: "binary".to_string(),
                description: "gemini binary not found on PATH; falling back to direct config file edits".to_string(),
                suggestion: Some("install the Gemini CLI for smoother registration".to_string()),
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
    fn project_scope_resolves_under_dot_gemini() {
        let path = GeminiCliAdapter::resolve_path(BindingScope::Project, Some("/tmp/myproj")).unwrap();
        assert_eq!(path, "/tmp/myproj/.gemini/settings.json");
    }

    #[test]
    fn workspace_scope_is_rejected() {
        let err = GeminiCliAdapter::resolve_path(BindingScope::Workspace, Some("/tmp/myproj")).unwrap_err();
        assert!(matches!(err, ConduitError::InvalidRequest(_)));
    }
}
