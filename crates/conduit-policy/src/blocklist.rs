//! The non-overridable blocklist rules (`SPEC_FULL.md` §4.2, priority 0).
//!
//! No grant, however broad, can override these. A request naming one of
//! these paths is rejected outright and never reaches grant matching.

/// System paths that are forbidden outright, along with everything under
/// them, unless they fall under [`ALLOWLIST_EXCEPTIONS`].
const FORBIDDEN_ROOTS: &[&str] = &[
    "/etc",
    "/var",
    "/root",
    "/System",
    "/Library",
    "/private",
    "C:\\Windows",
    "C:\\Program Files",
    "C:\\ProgramData",
];

/// Paths under a [`FORBIDDEN_ROOTS`] entry that are nonetheless permitted —
/// scratch/temp directories a connector legitimately needs.
const ALLOWLIST_EXCEPTIONS: &[&str] = &["/tmp", "/var/folders", "/private/var/folders", "/var/tmp"];

/// Credential directories, each relative to the user's home directory.
const CREDENTIAL_PATTERNS: &[&str] = &[
    ".ssh",
    ".gnupg",
    ".aws",
    ".config/gcloud",
    ".azure",
    ".kube",
    ".docker",
    "Library/Keychains",
    "AppData/Roaming",
];

fn under_or_equal(path: &str, root: &str) -> bool {
    path == root || path.starts_with(&format!("{root}/")) || path.starts_with(&format!("{root}\\"))
}

/// Evaluate `normalized` (already passed through
/// [`crate::normalize::normalize_path`]) against the blocklist. Returns the
/// human-readable reason it was blocked, or `None` if it passes.
#[must_use]
pub fn check(normalized: &str, home_dir: &str) -> Option<String> {
    if normalized == "/" {
        return Some("path names the root filesystem".to_string());
    }
    if !home_dir.is_empty() && normalized == home_dir {
        return Some("path names the user's home directory".to_string());
    }

    let allowlisted = ALLOWLIST_EXCEPTIONS
        .iter()
        .any(|exception| under_or_equal(normalized, exception));
    if !allowlisted {
        if let Some(root) = FORBIDDEN_ROOTS.iter().find(|root| under_or_equal(normalized, root)) {
            return Some(format!("path is under the forbidden system path {root}"));
        }
    }

    if !home_dir.is_empty() {
        for pattern in CREDENTIAL_PATTERNS {
            let full = format!("{home_dir}/{pattern}");
            if under_or_equal(normalized, &full) {
                return Some(format!("path is under the credential directory ~/{pattern}"));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = "/home/user";

    #[test]
    fn root_is_blocked() {
        assert!(check("/", HOME).is_some());
    }

    #[test]
    fn home_directory_itself_is_blocked() {
        assert!(check(HOME, HOME).is_some());
    }

    #[test]
    fn etc_is_blocked() {
        assert!(check("/etc/passwd", HOME).is_some());
    }

    #[test]
    fn tmp_under_var_is_allowed() {
        assert!(check("/var/tmp/scratch", HOME).is_none());
        assert!(check("/tmp/scratch", HOME).is_none());
    }

    #[test]
    fn ssh_directory_is_blocked() {
        assert!(check("/home/user/.ssh/id_rsa", HOME).is_some());
    }

    #[test]
    fn unrelated_home_subdirectory_is_allowed() {
        assert!(check("/home/user/project", HOME).is_none());
    }

    #[test]
    fn gcloud_config_subpath_is_blocked() {
        assert!(check("/home/user/.config/gcloud/creds.json", HOME).is_some());
    }

    #[test]
    fn windows_forbidden_root_is_blocked() {
        assert!(check("C:\\Windows\\System32", HOME).is_some());
    }
}
