// In-process `CachePolicy` fake for tests — no Redis connection needed.

use std::sync::Mutex;

use async_trait::async_trait;
use besuscan_common::{block::BlockSummary, config::RECENT_LIST_CAP, transaction::TransactionSummary};

use crate::{
    error::CacheError,
    policy::{CachePolicy, DashboardData, NetworkStats, NetworkStatsDelta},
};

#[derive(Default)]
struct State {
    latest_block: Option<BlockSummary>,
    recent_blocks: Vec<BlockSummary>,
    recent_transactions: Vec<TransactionSummary>,
    network_stats: NetworkStats,
    warm_blocks: std::collections::HashMap<u64, Vec<u8>>,
    warm_transactions: std::collections::HashMap<String, Vec<u8>>,
}

#[derive(Default)]
pub struct InMemoryCachePolicy {
    state: Mutex<State>,
}

impl InMemoryCachePolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CachePolicy for InMemoryCachePolicy {
    async fn set_latest_block(&self, block: &BlockSummary) -> Result<(), CacheError> {
        self.state.lock().unwrap().latest_block = Some(block.clone());
        Ok(())
    }

    async fn get_latest_block(&self) -> Result<Option<BlockSummary>, CacheError> {
        Ok(self.state.lock().unwrap().latest_block.clone())
    }

    async fn push_recent_block(&self, block: &BlockSummary) -> Result<(), CacheError> {
        let mut state = self.state.lock().unwrap();
        state.recent_blocks.insert(0, block.clone());
        state.recent_blocks.truncate(RECENT_LIST_CAP);
        Ok(())
    }

    async fn get_recent_blocks(&self) -> Result<Vec<BlockSummary>, CacheError> {
        Ok(self.state.lock().unwrap().recent_blocks.clone())
    }

    async fn push_recent_transaction(&self, tx: &TransactionSummary) -> Result<(), CacheError> {
        let mut state = self.state.lock().unwrap();
        state.recent_transactions.insert(0, tx.clone());
        state.recent_transactions.truncate(RECENT_LIST_CAP);
        Ok(())
    }

    async fn get_recent_transactions(&self) -> Result<Vec<TransactionSummary>, CacheError> {
        Ok(self.state.lock().unwrap().recent_transactions.clone())
    }

    async fn bump_network_stats(&self, delta: NetworkStatsDelta) -> Result<(), CacheError> {
        let mut state = self.state.lock().unwrap();
        state.network_stats.total_blocks += delta.blocks;
        state.network_stats.total_transactions += delta.transactions;
        state.network_stats.total_accounts += delta.accounts;
        state.network_stats.total_events += delta.events;
        Ok(())
    }

    async fn get_network_stats(&self) -> Result<NetworkStats, CacheError> {
        Ok(self.state.lock().unwrap().network_stats.clone())
    }

    async fn warm_block(&self, number: u64, payload: &[u8]) -> Result<(), CacheError> {
        self.state
            .lock()
            .unwrap()
            .warm_blocks
            .insert(number, payload.to_vec());
        Ok(())
    }

    async fn get_warm_block(&self, number: u64) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.state.lock().unwrap().warm_blocks.get(&number).cloned())
    }

    async fn warm_transaction(&self, hash: &str, payload: &[u8]) -> Result<(), CacheError> {
        self.state
            .lock()
            .unwrap()
            .warm_transactions
            .insert(hash.to_string(), payload.to_vec());
        Ok(())
    }

    async fn get_warm_transaction(&self, hash: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.state.lock().unwrap().warm_transactions.get(hash).cloned())
    }

    async fn get_dashboard_data(&self) -> Result<DashboardData, CacheError> {
        let state = self.state.lock().unwrap();
        Ok(DashboardData {
            latest_block: state.latest_block.clone(),
            recent_transactions: state.recent_transactions.clone(),
            network_stats: state.network_stats.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(number: u64) -> BlockSummary {
        BlockSummary {
            number,
            hash: format!("0x{number}"),
            timestamp: 0,
            miner: "0xminer".into(),
            tx_count: 0,
            gas_used: 0,
        }
    }

    #[tokio::test]
    async fn recent_blocks_cap_at_ten_and_prepend() {
        let cache = InMemoryCachePolicy::new();
        for n in 0..15 {
            cache.push_recent_block(&block(n)).await.unwrap();
        }
        let recent = cache.get_recent_blocks().await.unwrap();
        assert_eq!(recent.len(), RECENT_LIST_CAP);
        assert_eq!(recent[0].number, 14);
    }

    #[tokio::test]
    async fn latest_block_is_monotone_non_decreasing_when_caller_only_advances() {
        let cache = InMemoryCachePolicy::new();
        cache.set_latest_block(&block(5)).await.unwrap();
        cache.set_latest_block(&block(6)).await.unwrap();
        let latest = cache.get_latest_block().await.unwrap().unwrap();
        assert_eq!(latest.number, 6);
    }
}
