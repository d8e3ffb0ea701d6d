// Timestamp helpers used across the indexer.
//
// IMPORTANT NOTE:
// The functions in this module use SystemTime::now() / Utc::now(), which
// are non-deterministic wall-clock reads. That is fine here: unlike a
// consensus client, nothing in this pipeline orders state by wall clock.
// The authoritative ordering key is always the block number.
//
// SAFE USAGE:
// - Logging timestamps, metrics, cache TTL management
// - Populating `mined_at` / `first_seen` / `last_activity` columns
//
// Never use these to decide processing order between two items — use
// the block number (or, within a block, log_index) instead.

use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

pub type TimestampSeconds = u64;
pub type TimestampMillis = u64;

#[inline]
pub fn now_seconds() -> TimestampSeconds {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

#[inline]
pub fn now_millis() -> TimestampMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as TimestampMillis
}

/// Render a block/chain timestamp (seconds since epoch) as RFC3339, the
/// wire format used for every timestamp field.
pub fn seconds_to_rfc3339(seconds: TimestampSeconds) -> String {
    DateTime::<Utc>::from_timestamp(seconds as i64, 0)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap())
        .to_rfc3339()
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_to_rfc3339_roundtrips_through_chrono() {
        let s = seconds_to_rfc3339(1_718_244_174);
        assert!(s.starts_with("2024-06-13"));
    }

    #[test]
    fn now_millis_is_monotonically_plausible() {
        let a = now_millis();
        let b = now_millis();
        assert!(b >= a);
    }
}
