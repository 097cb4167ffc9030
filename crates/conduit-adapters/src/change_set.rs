//! Change-set id generation.

use chrono::{DateTime, Utc};

/// Build a change set id of the form `cs_<utc-timestamp>_<8-hex-random>`.
#[must_use]
pub fn new_change_set_id(now: DateTime<Utc>) -> String {
    let ts = now.format("%Y%m%dT%H%M%SZ");
    let rand = uuid::Uuid::new_v4().simple().to_string();
    format!("cs_{ts}_{}", &rand[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_expected_shape() {
        let id = new_change_set_id(Utc::now());
        assert!(id.starts_with("cs_"));
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn two_calls_differ() {
        let now = Utc::now();
        assert_ne!(new_change_set_id(now), new_change_set_id(now));
    }
}
