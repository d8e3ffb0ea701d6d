use async_trait::async_trait;
use besuscan_common::account::AccountAnalytics;

use crate::error::StoreError;

#[async_trait]
pub trait AccountAnalyticsProvider {
    /// Idempotent per-day aggregate upsert, keyed by `(address, day)`.
    async fn upsert_daily(&self, analytics: &AccountAnalytics) -> Result<(), StoreError>;

    async fn get_daily(&self, address: &str, day: &str) -> Result<Option<AccountAnalytics>, StoreError>;
}
