// Hybrid cache policy. The cache is an accelerator, never
// a source of truth: every operation here is a short-TTL or capped-list
// mirror of state the relational store already owns.

use async_trait::async_trait;
use besuscan_common::{block::BlockSummary, transaction::TransactionSummary};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub total_blocks: u64,
    pub total_transactions: u64,
    pub total_accounts: u64,
    pub total_events: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub latest_block: Option<BlockSummary>,
    pub recent_transactions: Vec<TransactionSummary>,
    pub network_stats: NetworkStats,
}

#[async_trait]
pub trait CachePolicy: Send + Sync {
    /// `latest_block`, TTL 30s.
    async fn set_latest_block(&self, block: &BlockSummary) -> Result<(), CacheError>;

    async fn get_latest_block(&self) -> Result<Option<BlockSummary>, CacheError>;

    /// Prepend to the capped list `recent_blocks` (cap 10), trimming the
    /// tail.
    async fn push_recent_block(&self, block: &BlockSummary) -> Result<(), CacheError>;

    async fn get_recent_blocks(&self) -> Result<Vec<BlockSummary>, CacheError>;

    /// Prepend to the capped list `recent_transactions` (cap 10), TTL
    /// 30s.
    async fn push_recent_transaction(&self, tx: &TransactionSummary) -> Result<(), CacheError>;

    async fn get_recent_transactions(&self) -> Result<Vec<TransactionSummary>, CacheError>;

    /// Denormalized counters, TTL 60s.
    async fn bump_network_stats(&self, delta: NetworkStatsDelta) -> Result<(), CacheError>;

    async fn get_network_stats(&self) -> Result<NetworkStats, CacheError>;

    /// On-demand warm-up, TTL 5 min.
    async fn warm_block(&self, number: u64, payload: &[u8]) -> Result<(), CacheError>;

    async fn get_warm_block(&self, number: u64) -> Result<Option<Vec<u8>>, CacheError>;

    /// On-demand warm-up, TTL 5 min.
    async fn warm_transaction(&self, hash: &str, payload: &[u8]) -> Result<(), CacheError>;

    async fn get_warm_transaction(&self, hash: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// `dashboard_data`, TTL 1s.
    async fn get_dashboard_data(&self) -> Result<DashboardData, CacheError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkStatsDelta {
    pub blocks: u64,
    pub transactions: u64,
    pub accounts: u64,
    pub events: u64,
}
