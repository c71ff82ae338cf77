use crate::error::{Result, TimestampKind, TrendError};
use chrono::{DateTime, Utc};

/// Tracker fields, e.g. `2020-01-15T10:00:00.000+0000`. Exactly three
/// fraction digits.
pub const TRACKER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%3f%z";

/// `git log --pretty=%ci`, e.g. `2020-01-15 10:00:00 +0100`
pub const COMMIT_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Parses the two timestamp formats the run consumes into UTC instants
pub struct TimestampParser;

impl TimestampParser {
    /// Parse a tracker `resolutiondate` / `created` field
    pub fn parse_tracker(text: &str) -> Result<DateTime<Utc>> {
        Self::parse(text, TRACKER_FORMAT)
            .ok_or_else(|| TrendError::malformed_timestamp(TimestampKind::Tracker, text))
    }

    /// Parse a commit date as printed by `%ci`
    pub fn parse_commit(text: &str) -> Result<DateTime<Utc>> {
        Self::parse(text.trim(), COMMIT_FORMAT)
            .ok_or_else(|| TrendError::malformed_timestamp(TimestampKind::Commit, text))
    }

    fn parse(text: &str, format: &str) -> Option<DateTime<Utc>> {
        // chrono's %z also takes `+00:00`; only `+hhmm` is valid here
        if !has_compact_offset(text) {
            return None;
        }
        DateTime::parse_from_str(text, format)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// True when `text` ends in a `[+-]hhmm` offset
fn has_compact_offset(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() < 5 {
        return false;
    }
    let offset = &bytes[bytes.len() - 5..];
    matches!(offset[0], b'+' | b'-') && offset[1..].iter().all(u8::is_ascii_digit)
}
