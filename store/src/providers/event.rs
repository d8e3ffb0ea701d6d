// Event storage provider. Idempotency key is
// `(transaction_hash, log_index)`.

use async_trait::async_trait;
use besuscan_common::event::Event;

use crate::error::StoreError;

#[async_trait]
pub trait EventProvider {
    async fn upsert(&self, event: &Event) -> Result<(), StoreError>;

    async fn get(&self, transaction_hash: &str, log_index: u32) -> Result<Option<Event>, StoreError>;

    async fn find_by_contract(&self, contract_address: &str) -> Result<Vec<Event>, StoreError>;

    async fn find_by_transaction(&self, transaction_hash: &str) -> Result<Vec<Event>, StoreError>;
}
