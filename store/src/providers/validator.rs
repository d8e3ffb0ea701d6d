use async_trait::async_trait;
use besuscan_common::validator::Validator;

use crate::error::StoreError;

#[async_trait]
pub trait ValidatorProvider {
    /// Upserts the full roster in one pass : members of
    /// `active` become `status = active`; every previously known
    /// validator not in the set becomes `status = inactive`.
    async fn upsert_roster(&self, active: &[Validator]) -> Result<(), StoreError>;

    async fn get_by_address(&self, address: &str) -> Result<Option<Validator>, StoreError>;

    async fn list_active(&self) -> Result<Vec<Validator>, StoreError>;
}
