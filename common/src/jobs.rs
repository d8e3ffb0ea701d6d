// Work items placed on the broker queues. Each is a small, additive-only
// payload schema: consumers tolerate unknown fields, enforced here by
// `#[serde(default)]` on every field a future producer might omit.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::time::TimestampSeconds;

/// Published by the block listener, consumed by the transaction
/// extractor and (after re-publish) the block handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockJob {
    pub number: u64,
    pub hash: String,
    pub timestamp: TimestampSeconds,
}

/// Published by the transaction extractor, consumed by the transaction
/// handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub hash: String,
    pub block_number: Option<u64>,
    pub block_hash: Option<String>,
    pub from: String,
    pub to: Option<String>,
    pub value: U256,
    pub gas: u64,
    pub gas_price: Option<U256>,
    pub nonce: u64,
}

/// Published by the mempool listener, consumed by the transaction
/// handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTxJob {
    pub hash: String,
}

/// Published by the event-log listener, consumed by the event handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventJob {
    pub transaction_hash: String,
    pub log_index: u32,
    pub contract_address: String,
    pub block_number: u64,
    pub block_hash: String,
    pub topics: Vec<String>,
    pub data: String,
    pub timestamp: TimestampSeconds,
    pub resolved_name: Option<String>,
}

/// Published by the account indexer, consumed by the account-discovered
/// handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDiscovered {
    pub address: String,
    pub is_contract: bool,
    pub creator_address: Option<String>,
    pub creation_tx_hash: Option<String>,
    pub block_number: u64,
    pub timestamp: TimestampSeconds,
}

/// Published by the account indexer, consumed by the
/// account-balance-update handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalanceUpdate {
    pub address: String,
    pub balance: U256,
    pub block_number: u64,
}

/// Published by the account indexer for contract-creation transactions
/// that look like ERC-4337 smart accounts, consumed by the
/// smart-account-processing handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartAccountProcessing {
    pub address: String,
    pub creator_address: String,
    pub creation_tx_hash: String,
    pub factory_address: Option<String>,
    pub implementation_address: Option<String>,
    pub owner_address: Option<String>,
    pub block_number: u64,
}

/// Published by the account indexer, consumed by the
/// contract-interaction handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractInteractionJob {
    pub account: String,
    pub contract_address: String,
    pub transaction_hash: String,
    pub method_selector: Option<String>,
    pub gas_used: u64,
    pub value: U256,
    pub block_number: u64,
    pub timestamp: TimestampSeconds,
}

/// Consumed by the token-holding-update handler. Not currently emitted
/// by the account indexer itself (token-transfer decoding lives
/// downstream, in the event handler's ERC-20/721 `Transfer` decode
/// path) but the queue and payload are first-class on the named-queue
/// list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHoldingUpdate {
    pub account: String,
    pub token_address: String,
    pub balance: U256,
    pub block_number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_job_round_trips_through_json() {
        let job = BlockJob {
            number: 389_152,
            hash: "0xe08d".into(),
            timestamp: 1_718_244_174,
        };
        let encoded = serde_json::to_string(&job).unwrap();
        let decoded: BlockJob = serde_json::from_str(&encoded).unwrap();
        assert_eq!(job, decoded);
    }

    #[test]
    fn event_job_round_trips_with_unresolved_name() {
        let job = EventJob {
            transaction_hash: "0xabc".into(),
            log_index: 0,
            contract_address: "0xcontract".into(),
            block_number: 1,
            block_hash: "0xblock".into(),
            topics: vec!["0xsig".into()],
            data: "0x".into(),
            timestamp: 0,
            resolved_name: None,
        };
        let encoded = serde_json::to_string(&job).unwrap();
        let decoded: EventJob = serde_json::from_str(&encoded).unwrap();
        assert_eq!(job, decoded);
    }
}
