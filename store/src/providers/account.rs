// Account storage provider.

use async_trait::async_trait;
use besuscan_common::account::Account;
use primitive_types::U256;

use crate::error::StoreError;

#[async_trait]
pub trait AccountProvider {
    /// First-insert-wins upsert: sets `compliance_status = pending`,
    /// `risk_score = 0` on insert; never overwrites either on a later
    /// discovery of the same address.
    async fn upsert_discovered(&self, account: &Account) -> Result<(), StoreError>;

    async fn update_balance(&self, address: &str, balance: U256, block_number: u64) -> Result<(), StoreError>;

    async fn update_contract_shape(
        &self,
        address: &str,
        factory_address: Option<&str>,
        implementation_address: Option<&str>,
        owner_address: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn bump_tx_count(&self, address: &str) -> Result<(), StoreError>;

    async fn get_by_address(&self, address: &str) -> Result<Option<Account>, StoreError>;
}
