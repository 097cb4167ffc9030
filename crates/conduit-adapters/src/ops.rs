//! Generic plan/apply/validate/rollback/detect logic shared by every
//! per-client adapter. A client differs from another only in where its
//! config file lives and which JSON key holds server entries; everything
//! else is identical, so it lives here once instead of once per adapter.

use crate::atomic;
use crate::change_set::new_change_set_id;
use crate::json_doc::{build_server_entry, contains_instance_entry, ensure_object_key, read_json_object, slug, to_pretty_string};
use crate::types::{ApplyResult, ConfigRoot, DetectResult, InjectionOp, InjectionPlan, PlanRequest, RollbackResult, ValidationResult, ValidationStatus};
use conduit_core::time::to_rfc3339;
use conduit_core::{BackupId, BindingScope, ClientBinding, ConduitError, InjectionOpType};
use conduit_crypto::ContentHash;
use conduit_storage::Store;
use serde_json::Value;
use std::path::Path;
use std::time::Instant;

/// Build a [`DetectResult`] from a binary name (checked via `PATH`) and the
/// candidate config roots an adapter knows about.
#[must_use]
pub fn detect_generic(binary: Option<&str>, roots: Vec<ConfigRoot>) -> DetectResult {
    let installed = match binary {
        Some(bin) => which::which(bin).is_ok() || roots.iter().any(|r| r.exists),
        None => roots.iter().any(|r| r.exists),
    };
    let writable = roots
        .iter()
        .find(|r| r.exists)
        .map(|r| is_writable(Path::new(&r.path)))
        .unwrap_or(true);
    let version = binary.and_then(|bin| which::which(bin).ok()).map(|_| String::new());
    DetectResult {
        installed,
        version,
        config_roots: roots,
        writable,
        notes: None,
    }
}

fn is_writable(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| !m.permissions().readonly()).unwrap_or(true)
}

/// Build the change-set-specific backup location for `original`.
fn backup_path_for(change_set_id: &str, client_id: &str, original: &str) -> String {
    let base = directories::BaseDirs::new()
        .map(|b| b.data_dir().join("conduit").join("backups"))
        .unwrap_or_else(|| std::path::PathBuf::from(".conduit/backups"));
    let filename = Path::new(original).file_name().map_or_else(|| "config.json".to_string(), |f| f.to_string_lossy().to_string());
    base.join(change_set_id).join(format!("{client_id}-{filename}")).to_string_lossy().to_string()
}

/// Compute the [`InjectionPlan`] for writing `request`'s server entry into
/// `config_path`. `servers_key` is the top-level JSON key server entries
/// live under (`"mcpServers"` or `"servers"`) and is carried on the plan so
/// `apply_generic` needs nothing but the plan itself.
#[must_use]
pub fn plan_generic(client_id: &str, config_path: &str, scope: BindingScope, servers_key: &str, request: &PlanRequest) -> InjectionPlan {
    let change_set_id = new_change_set_id(chrono::Utc::now());
    let server_name = format!("conduit-{}", slug(&request.display_name));
    let command = request.command.as_deref().unwrap_or("conduit");
    let entry = build_server_entry(request.instance_id, command, &request.socket_path);
    let entry_json = serde_json::to_string_pretty(&entry).unwrap_or_default();
    let content_hash = Some(ContentHash::hash(entry_json.as_bytes()).to_hex());
    let content_preview = Some(entry_json.chars().take(200).collect::<String>());

    let exists = Path::new(config_path).exists();
    let mut ops = Vec::new();
    if exists {
        let backup_path = backup_path_for(&change_set_id, client_id, config_path);
        ops.push(InjectionOp {
            op_type: InjectionOpType::BackupFile,
            path: config_path.to_string(),
            backup_path: Some(backup_path),
            content_hash: None,
            content_preview: None,
        });
        ops.push(InjectionOp {
            op_type: InjectionOpType::UpdateFile,
            path: config_path.to_string(),
            backup_path: None,
            content_hash: content_hash.clone(),
            content_preview: content_preview.clone(),
        });
    } else {
        ops.push(InjectionOp {
            op_type: InjectionOpType::CreateFile,
            path: config_path.to_string(),
            backup_path: None,
            content_hash,
            content_preview,
        });
    }

    InjectionPlan {
        change_set_id,
        client_id: client_id.to_string(),
        ops,
        server_name,
        config_path: config_path.to_string(),
        scope,
        servers_key: servers_key.to_string(),
        entry,
    }
}

/// Apply `plan`'s ops in order: backup (recording a [`conduit_core::ConfigBackup`]
/// row), then write the merged document using `plan.entry`/`plan.servers_key`.
///
/// # Errors
/// Returns [`ConduitError::InvalidConfig`] if an `update_file` op's target
/// fails to parse, leaving the original file untouched (already protected
/// by its preceding backup). Returns [`ConduitError::Io`]/[`ConduitError::StoreError`]
/// on lower-level failures.
pub fn apply_generic(store: &Store, plan: &InjectionPlan) -> Result<ApplyResult, ConduitError> {
    let now = to_rfc3339(chrono::Utc::now());
    let mut files_changed = Vec::new();

    for op in &plan.ops {
        match op.op_type {
            InjectionOpType::BackupFile => {
                let backup_path = op.backup_path.as_ref().expect("backup_file op always carries backup_path");
                atomic::copy_aside(Path::new(&op.path), Path::new(backup_path))?;
                store.create_backup(
                    &conduit_core::ConfigBackup {
                        backup_id: BackupId::new(),
                        change_set_id: plan.change_set_id.clone(),
                        client_id: plan.client_id.clone(),
                        original_path: op.path.clone(),
                        backup_path: backup_path.clone(),
                        file_existed: true,
                    },
                    &now,
                )?;
            }
            InjectionOpType::CreateFile => {
                store.create_backup(
                    &conduit_core::ConfigBackup {
                        backup_id: BackupId::new(),
                        change_set_id: plan.change_set_id.clone(),
                        client_id: plan.client_id.clone(),
                        original_path: op.path.clone(),
                        backup_path: String::new(),
                        file_existed: false,
                    },
                    &now,
                )?;
                let mut doc = Value::Object(serde_json::Map::new());
                let servers = ensure_object_key(&mut doc, &plan.servers_key);
                servers.insert(plan.server_name.clone(), plan.entry.clone());
                atomic::write_atomic(Path::new(&op.path), &to_pretty_string(&doc)?)?;
                files_changed.push(op.path.clone());
            }
            InjectionOpType::UpdateFile => {
                let mut doc = read_json_object(Path::new(&op.path))?.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
                let servers = ensure_object_key(&mut doc, &plan.servers_key);
                servers.insert(plan.server_name.clone(), plan.entry.clone());
                atomic::write_atomic(Path::new(&op.path), &to_pretty_string(&doc)?)?;
                files_changed.push(op.path.clone());
            }
        }
    }

    Ok(ApplyResult {
        success: true,
        config_path: plan.config_path.clone(),
        config_scope: plan.scope,
        files_changed,
    })
}

/// Validate that `binding`'s config file still carries an entry for its
/// instance, under `servers_key`.
#[must_use]
pub fn validate_generic(binding: &ClientBinding, servers_key: &str) -> ValidationResult {
    let start = Instant::now();
    let result = read_json_object(Path::new(&binding.config_path));
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(Some(doc)) if contains_instance_entry(&doc, servers_key, binding.instance_id) => ValidationResult {
            status: ValidationStatus::Pass,
            latency_ms,
            tools_found: Vec::new(),
            errors: Vec::new(),
            observations: None,
        },
        Ok(Some(_)) => ValidationResult {
            status: ValidationStatus::Fail,
            latency_ms,
            tools_found: Vec::new(),
            errors: vec!["no matching server entry found".to_string()],
            observations: None,
        },
        Ok(None) => ValidationResult {
            status: ValidationStatus::Fail,
            latency_ms,
            tools_found: Vec::new(),
            errors: vec!["config file does not exist".to_string()],
            observations: None,
        },
        Err(e) => ValidationResult {
            status: ValidationStatus::Fail,
            latency_ms,
            tools_found: Vec::new(),
            errors: vec![e.to_string()],
            observations: None,
        },
    }
}

/// Roll back every backup recorded for `change_set_id`. Never aborts early
/// on a single error; `success` is true iff none occurred.
#[must_use]
pub fn rollback_generic(store: &Store, change_set_id: &str) -> RollbackResult {
    let backups = match store.get_backups_by_change_set(change_set_id) {
        Ok(b) => b,
        Err(e) => return RollbackResult { success: false, files_restored: Vec::new(), errors: vec![e.to_string()] },
    };

    let mut files_restored = Vec::new();
    let mut errors = Vec::new();
    for backup in &backups {
        let original = Path::new(&backup.original_path);
        if backup.file_existed {
            match atomic::copy_aside(Path::new(&backup.backup_path), original) {
                Ok(()) => files_restored.push(backup.original_path.clone()),
                Err(e) => errors.push(format!("{}: {e}", backup.original_path)),
            }
        } else if original.exists() {
            match std::fs::remove_file(original) {
                Ok(()) => files_restored.push(backup.original_path.clone()),
                Err(e) => errors.push(format!("{}: {e}", backup.original_path)),
            }
        }
    }

    RollbackResult { success: errors.is_empty(), files_restored, errors }
}
