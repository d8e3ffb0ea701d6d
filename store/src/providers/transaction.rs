// Transaction storage provider.

use async_trait::async_trait;
use besuscan_common::transaction::Transaction;

use crate::error::StoreError;

#[async_trait]
pub trait TransactionProvider {
    /// Idempotent upsert by `hash`. A pre-existing `pending`
    /// row transitions to the incoming status; a row already in
    /// `success`/`failed` never moves back to `pending`.
    async fn upsert(&self, tx: &Transaction) -> Result<(), StoreError>;

    async fn get_by_hash(&self, hash: &str) -> Result<Option<Transaction>, StoreError>;

    async fn find_by_block(&self, block_hash: &str) -> Result<Vec<Transaction>, StoreError>;

    async fn count_by_block(&self, block_hash: &str) -> Result<u32, StoreError>;
}
