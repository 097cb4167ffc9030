//! Path normalization for blocklist/grant comparisons.
//!
//! Expands a leading `~`, resolves `.`/`..` components lexically, and
//! uppercases a Windows drive letter. Deliberately does **not** resolve
//! symbolic links: `SPEC_FULL.md` §9 flags this as a known, preserved
//! limitation of the source system rather than an oversight to silently fix.
//! A connector that plants a symlink pointing out of a granted directory
//! is a separate security concern this normalization does not address.

/// Normalize `raw` into its canonical comparison form, expanding `~` against
/// `home_dir`.
#[must_use]
pub fn normalize_path(raw: &str, home_dir: &str) -> String {
    let mut expanded = expand_home(raw, home_dir);
    let is_windows = is_windows_path(&expanded);

    if is_windows {
        let drive = expanded[0..1].to_ascii_uppercase();
        expanded.replace_range(0..1, &drive);
    }

    let mut components: Vec<&str> = Vec::new();
    for part in expanded.split(['/', '\\']) {
        match part {
            "" | "." => continue,
            ".." => {
                components.pop();
            }
            other => components.push(other),
        }
    }

    if is_windows {
        let drive = components.first().copied().unwrap_or("");
        let rest = if components.is_empty() {
            &components[..]
        } else {
            &components[1..]
        };
        if rest.is_empty() {
            format!("{drive}\\")
        } else {
            format!("{drive}\\{}", rest.join("\\"))
        }
    } else {
        format!("/{}", components.join("/"))
    }
}

fn expand_home(raw: &str, home_dir: &str) -> String {
    if let Some(rest) = raw.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') {
            return format!("{home_dir}{rest}");
        }
    }
    raw.to_string()
}

fn is_windows_path(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_tilde() {
        assert_eq!(normalize_path("~/docs", "/home/user"), "/home/user/docs");
        assert_eq!(normalize_path("~", "/home/user"), "/home/user");
    }

    #[test]
    fn does_not_expand_tilde_in_the_middle_of_a_component() {
        assert_eq!(normalize_path("/a/~b", "/home/user"), "/a/~b");
    }

    #[test]
    fn resolves_dot_and_dotdot_lexically() {
        assert_eq!(normalize_path("/a/./b/../c", "/home/user"), "/a/c");
        assert_eq!(normalize_path("/a/../../b", "/home/user"), "/b");
    }

    #[test]
    fn uppercases_windows_drive_letter() {
        assert_eq!(
            normalize_path("c:\\Windows\\System32", "/home/user"),
            "C:\\Windows\\System32"
        );
    }

    #[test]
    fn root_normalizes_to_single_slash() {
        assert_eq!(normalize_path("/", "/home/user"), "/");
        assert_eq!(normalize_path("/a/..", "/home/user"), "/");
    }
}
