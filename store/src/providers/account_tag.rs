use async_trait::async_trait;
use besuscan_common::account::AccountTag;

use crate::error::StoreError;

#[async_trait]
pub trait AccountTagProvider {
    async fn upsert_tag(&self, tag: &AccountTag) -> Result<(), StoreError>;

    async fn tags_for(&self, address: &str) -> Result<Vec<AccountTag>, StoreError>;
}
