// Block storage provider. Batch operations run inside a single
// transaction per flush.

use async_trait::async_trait;
use besuscan_common::block::{Block, BlockSummary};

use crate::error::StoreError;

#[async_trait]
pub trait BlockProvider {
    /// Splits `hashes` into those already present and returns the
    /// subset found, so the caller can partition new-vs-existing.
    async fn check_exists_batch(&self, hashes: &[String]) -> Result<Vec<String>, StoreError>;

    /// Inserts every block in `blocks` inside one transaction.
    /// Idempotent: a block whose `(number, hash)` already exists is
    /// left untouched by `ON CONFLICT DO NOTHING` semantics at the
    /// `save_batch` layer — callers are expected to have already
    /// partitioned new-vs-existing via `check_exists_batch`.
    async fn save_batch(&self, blocks: &[Block]) -> Result<u64, StoreError>;

    /// Updates every block in `blocks` that already exists, inside one
    /// transaction. A no-op (0 affected rows) for a hash that doesn't
    /// exist.
    async fn update_batch(&self, blocks: &[Block]) -> Result<u64, StoreError>;

    async fn get_by_hash(&self, hash: &str) -> Result<Option<Block>, StoreError>;

    async fn get_by_number(&self, number: u64) -> Result<Option<Block>, StoreError>;

    /// `FindByRange(from=to)` returns exactly one row or none.
    async fn find_by_range(&self, from: u64, to: u64) -> Result<Vec<Block>, StoreError>;

    async fn latest(&self) -> Result<Option<BlockSummary>, StoreError>;

    async fn soft_delete(&self, hash: &str) -> Result<(), StoreError>;
}
