// Validator (QBFT signer) domain record. Keyed by address.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::time::TimestampSeconds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    pub address: String,
    pub proposed_block_count: U256,
    pub last_proposed_block: Option<u64>,
    pub status: ValidatorStatus,
    pub uptime_percentage: f64,
    pub last_seen: TimestampSeconds,
}

impl Validator {
    /// Rolling ratio of observed proposals over the polling window.
    /// `window_blocks` is the number of blocks the roster poll covers;
    /// `proposals_in_window` the count attributed to this validator
    /// within it.
    pub fn uptime_ratio(proposals_in_window: u64, window_blocks: u64) -> f64 {
        if window_blocks == 0 {
            return 0.0;
        }
        (proposals_in_window as f64 / window_blocks as f64).min(1.0) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_ratio_is_percentage_capped_at_100() {
        assert_eq!(Validator::uptime_ratio(5, 10), 50.0);
        assert_eq!(Validator::uptime_ratio(20, 10), 100.0);
        assert_eq!(Validator::uptime_ratio(0, 0), 0.0);
    }
}
