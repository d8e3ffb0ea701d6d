// Event (decoded contract log) domain record. Keyed by
// `(transaction_hash, log_index)`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time::TimestampSeconds;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub transaction_hash: String,
    pub log_index: u32,
    pub contract_address: String,
    pub block_number: u64,
    pub block_hash: String,
    pub topics: Vec<String>,
    pub data: String,
    pub event_name: String,
    pub event_signature: Option<String>,
    pub decoded_data: BTreeMap<String, Value>,
    pub removed: bool,
    pub timestamp: TimestampSeconds,
}

impl Event {
    /// `event_signature = topics[0]` when topics is non-empty.
    pub fn is_well_formed(&self) -> bool {
        match self.topics.first() {
            Some(topic0) => self.event_signature.as_deref() == Some(topic0.as_str()),
            None => self.event_signature.is_none(),
        }
    }

    pub fn key(&self) -> (String, u32) {
        (self.transaction_hash.clone(), self.log_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(topics: Vec<String>, signature: Option<String>) -> Event {
        Event {
            transaction_hash: "0xabc".into(),
            log_index: 0,
            contract_address: "0xcontract".into(),
            block_number: 1,
            block_hash: "0xblock".into(),
            topics,
            data: "0x".into(),
            event_name: "Transfer".into(),
            event_signature: signature,
            decoded_data: BTreeMap::new(),
            removed: false,
            timestamp: 0,
        }
    }

    #[test]
    fn signature_must_equal_topic0_when_present() {
        let event = sample(
            vec!["0xsig".into()],
            Some("0xsig".into()),
        );
        assert!(event.is_well_formed());

        let mismatched = sample(vec!["0xsig".into()], Some("0xother".into()));
        assert!(!mismatched.is_well_formed());
    }

    #[test]
    fn anonymous_log_has_no_signature() {
        let event = sample(vec![], None);
        assert!(event.is_well_formed());
    }

    #[test]
    fn key_is_tx_hash_and_log_index() {
        let event = sample(vec![], None);
        assert_eq!(event.key(), ("0xabc".to_string(), 0));
    }
}
