//! RFC 3339 UTC timestamp helpers.
//!
//! The specification notes that the original system mixed RFC 3339 strings
//! with SQLite's space-separated `datetime('now')` format across
//! migrations (`SPEC_FULL.md` §9). This implementation picks RFC 3339 UTC
//! as the single on-disk format; nothing in this crate ever produces the
//! space-separated form.

use chrono::{DateTime, Utc};

/// Render `ts` as an RFC 3339 string in UTC, e.g. `2026-07-28T12:00:00Z`.
#[must_use]
pub fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse an RFC 3339 string (any offset) into a UTC timestamp.
///
/// # Errors
/// Returns an error if `s` is not a valid RFC 3339 timestamp.
pub fn from_rfc3339(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let now = Utc::now();
        let s = to_rfc3339(now);
        let back = from_rfc3339(&s).unwrap();
        assert_eq!(now.timestamp(), back.timestamp());
    }
}
