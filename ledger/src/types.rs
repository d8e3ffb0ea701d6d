// Typed, alloy-independent shapes returned by `LedgerClient`. Listeners
// depend on these, not on `alloy`'s RPC types directly, so the rest of
// the pipeline never has to track an upstream crate's type churn.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: u64,
    pub miner: String,
    pub difficulty: U256,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub base_fee_per_gas: Option<U256>,
    pub extra_data: String,
    pub mix_hash: String,
    pub nonce: String,
    pub receipts_root: String,
    pub state_root: String,
    pub transactions_root: String,
    pub logs_bloom: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcBlock {
    pub header: Header,
    pub size: u64,
    pub uncle_hashes: Vec<String>,
    pub transactions: Vec<RpcTransaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcTransaction {
    pub hash: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: U256,
    pub gas: u64,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub nonce: u64,
    pub input: String,
    pub tx_type: u8,
    pub block_number: Option<u64>,
    pub block_hash: Option<String>,
    pub transaction_index: Option<u32>,
    pub chain_id: Option<u64>,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcReceipt {
    pub transaction_hash: String,
    pub status: bool,
    pub gas_used: u64,
    pub contract_address: Option<String>,
    pub logs: Vec<RpcLog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: u64,
    pub block_hash: String,
    pub transaction_hash: String,
    pub log_index: u32,
    pub removed: bool,
}

/// A log subscription/backfill filter. An empty
/// `addresses` subscribes to all logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogFilter {
    pub addresses: Vec<String>,
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}
