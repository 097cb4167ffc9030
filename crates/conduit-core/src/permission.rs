//! The [`PermissionSet`] value type and its merge semantics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Network exposure mode requested or granted to a connector instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NetworkMode {
    /// No outbound network access.
    #[default]
    None,
    /// Outbound access limited to [`NetworkPermission::egress_domains`].
    Egress,
}

impl NetworkMode {
    /// `Egress` wins over `None`; used by [`PermissionSet::merge`].
    #[must_use]
    fn upgrade(self, other: Self) -> Self {
        if self == Self::Egress || other == Self::Egress {
            Self::Egress
        } else {
            Self::None
        }
    }
}

/// Filesystem permission category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilesystemPermission {
    /// Paths the connector may read but not write.
    pub readonly_paths: BTreeSet<String>,
    /// Paths the connector may read and write.
    pub readwrite_paths: BTreeSet<String>,
}

impl FilesystemPermission {
    fn is_empty(&self) -> bool {
        self.readonly_paths.is_empty() && self.readwrite_paths.is_empty()
    }

    fn merge(&self, other: &Self) -> Self {
        Self {
            readonly_paths: self
                .readonly_paths
                .union(&other.readonly_paths)
                .cloned()
                .collect(),
            readwrite_paths: self
                .readwrite_paths
                .union(&other.readwrite_paths)
                .cloned()
                .collect(),
        }
    }
}

/// Network permission category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkPermission {
    /// Whether outbound egress is permitted at all.
    pub mode: NetworkMode,
    /// Domain patterns allowed when `mode == Egress`. A single leading
    /// `*.` wildcard is permitted per pattern.
    pub egress_domains: BTreeSet<String>,
}

impl NetworkPermission {
    fn is_empty(&self) -> bool {
        self.mode == NetworkMode::None && self.egress_domains.is_empty()
    }

    fn merge(&self, other: &Self) -> Self {
        Self {
            mode: self.mode.upgrade(other.mode),
            egress_domains: self
                .egress_domains
                .union(&other.egress_domains)
                .cloned()
                .collect(),
        }
    }
}

/// A single secret binding: which secret, and under which environment
/// variable name it is injected into the container.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecretRef {
    /// Opaque identifier of the secret in the secret store.
    pub secret_id: String,
    /// Environment variable name the secret is exposed as.
    pub env_key: String,
}

/// Secrets permission category: an ordered, secret_id-deduplicated sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecretsPermission {
    /// The granted/requested secret bindings, in insertion order.
    pub secrets: Vec<SecretRef>,
}

impl SecretsPermission {
    fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    fn contains(&self, secret_id: &str) -> bool {
        self.secrets.iter().any(|s| s.secret_id == secret_id)
    }

    fn merge(&self, other: &Self) -> Self {
        let mut merged = self.secrets.clone();
        for s in &other.secrets {
            if !merged.iter().any(|m| m.secret_id == s.secret_id) {
                merged.push(s.clone());
            }
        }
        Self { secrets: merged }
    }
}

/// Exposure permission category: whether a secure public link may be minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExposurePermission {
    /// Whether the instance may be reached via a public endpoint.
    pub secure_link: bool,
}

impl ExposurePermission {
    fn is_empty(&self) -> bool {
        !self.secure_link
    }

    fn merge(&self, other: &Self) -> Self {
        Self {
            secure_link: self.secure_link || other.secure_link,
        }
    }
}

/// The full set of capabilities a connector instance requests, is granted,
/// or is ultimately permitted (the "effective" set).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    /// Filesystem category.
    pub filesystem: FilesystemPermission,
    /// Network category.
    pub network: NetworkPermission,
    /// Secrets category.
    pub secrets: SecretsPermission,
    /// Exposure category.
    pub exposure: ExposurePermission,
}

impl PermissionSet {
    /// An empty permission set (no access of any kind).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// True iff every category is empty: no filesystem paths, network mode
    /// `None`, no secrets, and `secure_link == false`.
    ///
    /// The ambiguity this resolves is documented in `SPEC_FULL.md` §9: a
    /// strict reading of the source could treat `network.mode == ""` alone
    /// as sufficient. We require every category to be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filesystem.is_empty()
            && self.network.is_empty()
            && self.secrets.is_empty()
            && self.exposure.is_empty()
    }

    /// The permissive union of two permission sets: see each category's
    /// `merge` for the per-field rule. Commutative, associative, idempotent.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            filesystem: self.filesystem.merge(&other.filesystem),
            network: self.network.merge(&other.network),
            secrets: self.secrets.merge(&other.secrets),
            exposure: self.exposure.merge(&other.exposure),
        }
    }

    /// Whether `path` is covered by a granted filesystem path: equal to a
    /// granted path, or strictly nested under one (`granted + "/"` prefix).
    #[must_use]
    pub fn covers_path(&self, path: &str) -> bool {
        let covered = |set: &BTreeSet<String>| {
            set.iter()
                .any(|granted| granted == path || path.starts_with(&format!("{granted}/")))
        };
        covered(&self.filesystem.readonly_paths) || covered(&self.filesystem.readwrite_paths)
    }

    /// Whether `domain` is covered by a granted domain or `*.suffix` pattern.
    #[must_use]
    pub fn covers_domain(&self, domain: &str) -> bool {
        self.network.egress_domains.iter().any(|pattern| {
            if let Some(suffix) = pattern.strip_prefix("*.") {
                domain != suffix && domain.ends_with(&format!(".{suffix}"))
            } else {
                pattern == domain
            }
        })
    }

    /// Whether `secret_id` has a granted binding.
    #[must_use]
    pub fn covers_secret(&self, secret_id: &str) -> bool {
        self.secrets.contains(secret_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs(paths: &[&str]) -> PermissionSet {
        let mut set = PermissionSet::empty();
        set.filesystem.readwrite_paths = paths.iter().map(|s| (*s).to_string()).collect();
        set
    }

    #[test]
    fn empty_set_is_empty() {
        assert!(PermissionSet::empty().is_empty());
    }

    #[test]
    fn non_empty_network_mode_is_not_empty() {
        let mut set = PermissionSet::empty();
        set.network.mode = NetworkMode::Egress;
        assert!(!set.is_empty());
    }

    #[test]
    fn merge_is_commutative() {
        let a = fs(&["/home/user/a"]);
        let b = fs(&["/home/user/b"]);
        assert_eq!(a.merge(&b), b.merge(&a));
    }

    #[test]
    fn merge_is_associative() {
        let a = fs(&["/a"]);
        let b = fs(&["/b"]);
        let c = fs(&["/c"]);
        assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
    }

    #[test]
    fn merge_is_idempotent() {
        let a = fs(&["/a"]);
        assert_eq!(a.merge(&a), a);
    }

    #[test]
    fn merge_upgrades_network_mode_to_egress() {
        let mut a = PermissionSet::empty();
        a.network.mode = NetworkMode::Egress;
        let b = PermissionSet::empty();
        let merged = a.merge(&b);
        assert_eq!(merged.network.mode, NetworkMode::Egress);
    }

    #[test]
    fn serde_round_trip() {
        let set = fs(&["/tmp/scratch"]);
        let json = serde_json::to_string(&set).unwrap();
        let back: PermissionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set, back);
    }

    #[test]
    fn covers_path_requires_trailing_separator_for_prefix_match() {
        let set = fs(&["/home/user/docsX"]);
        assert!(!set.covers_path("/home/user/docs"));
        let set = fs(&["/home/user/docs"]);
        assert!(set.covers_path("/home/user/docs/subdir"));
        assert!(set.covers_path("/home/user/docs"));
    }

    #[test]
    fn wildcard_domain_matches_subdomains_only() {
        let mut set = PermissionSet::empty();
        set.network.egress_domains.insert("*.example.com".to_string());
        assert!(set.covers_domain("api.example.com"));
        assert!(set.covers_domain("x.y.example.com"));
        assert!(!set.covers_domain("example.com"));
    }
}
