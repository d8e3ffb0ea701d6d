// Block domain record. Keyed by `(number, hash)`, both unique.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::time::TimestampSeconds;

/// Zero hash used as the canonical `parent_hash` of the genesis block.
pub const ZERO_HASH: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: TimestampSeconds,
    pub miner: String,
    pub difficulty: U256,
    pub size: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub base_fee: Option<U256>,
    pub tx_count: u32,
    pub uncle_count: u32,
    pub bloom: String,
    pub extra_data: String,
    pub mix_digest: String,
    pub nonce: String,
    pub receipts_root: String,
    pub state_root: String,
    pub tx_root: String,
    pub deleted_at: Option<TimestampSeconds>,
}

impl Block {
    /// True for the genesis block — the only block allowed to carry the
    /// zero hash as its parent.
    pub fn is_genesis(&self) -> bool {
        self.number == 0 && self.parent_hash == ZERO_HASH
    }
}

/// A compact copy of a block's hot fields, the shape mirrored into the
/// `latest_block` / `recent_blocks` cache entries. Kept
/// distinct from `Block` so a cache-only consumer never assumes it has
/// every relational column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub number: u64,
    pub hash: String,
    pub timestamp: TimestampSeconds,
    pub miner: String,
    pub tx_count: u32,
    pub gas_used: u64,
}

impl From<&Block> for BlockSummary {
    fn from(block: &Block) -> Self {
        Self {
            number: block.number,
            hash: block.hash.clone(),
            timestamp: block.timestamp,
            miner: block.miner.clone(),
            tx_count: block.tx_count,
            gas_used: block.gas_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block {
            number: 389_152,
            hash: "0xe08d".into(),
            parent_hash: "0xparent".into(),
            timestamp: 1_718_244_174,
            miner: "0xminer".into(),
            difficulty: U256::from(2),
            size: 1024,
            gas_limit: 30_000_000,
            gas_used: 21_000,
            base_fee: Some(U256::from(1_000_000_000u64)),
            tx_count: 0,
            uncle_count: 0,
            bloom: "0x00".into(),
            extra_data: "0x".into(),
            mix_digest: "0x00".into(),
            nonce: "0x00".into(),
            receipts_root: "0x00".into(),
            state_root: "0x00".into(),
            tx_root: "0x00".into(),
            deleted_at: None,
        }
    }

    #[test]
    fn genesis_requires_zero_parent_and_number_zero() {
        let mut block = sample_block();
        block.number = 0;
        block.parent_hash = ZERO_HASH.to_string();
        assert!(block.is_genesis());

        let not_genesis = sample_block();
        assert!(!not_genesis.is_genesis());
    }

    #[test]
    fn summary_copies_hot_fields_only() {
        let block = sample_block();
        let summary = BlockSummary::from(&block);
        assert_eq!(summary.number, block.number);
        assert_eq!(summary.hash, block.hash);
    }
}
