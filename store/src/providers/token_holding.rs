use async_trait::async_trait;
use besuscan_common::account::TokenHolding;
use primitive_types::U256;

use crate::error::StoreError;

#[async_trait]
pub trait TokenHoldingProvider {
    /// Idempotent per `(account, token_address)`; the highest
    /// `last_updated_block` observed wins.
    async fn upsert_balance(
        &self,
        account: &str,
        token_address: &str,
        balance: U256,
        block_number: u64,
    ) -> Result<(), StoreError>;

    async fn holdings_for(&self, account: &str) -> Result<Vec<TokenHolding>, StoreError>;
}
