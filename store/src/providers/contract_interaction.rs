use async_trait::async_trait;
use besuscan_common::account::ContractInteraction;

use crate::error::StoreError;

#[async_trait]
pub trait ContractInteractionProvider {
    /// Idempotent per `(account, contract_address, transaction_hash)`.
    async fn upsert(&self, interaction: &ContractInteraction) -> Result<(), StoreError>;

    async fn find_by_account(&self, account: &str) -> Result<Vec<ContractInteraction>, StoreError>;
}
