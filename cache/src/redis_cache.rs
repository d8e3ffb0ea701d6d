// `redis`-backed `CachePolicy` implementation. Uses a
// multiplexed, auto-reconnecting `ConnectionManager` — one shared
// client per process.

use async_trait::async_trait;
use besuscan_common::{
    block::BlockSummary,
    config::{DASHBOARD_DATA_TTL, LATEST_BLOCK_TTL, NETWORK_STATS_TTL, RECENT_LIST_CAP, WARM_ENTRY_TTL},
    transaction::TransactionSummary,
};
use redis::{aio::ConnectionManager, AsyncCommands, Client};

use crate::{
    error::CacheError,
    policy::{CachePolicy, DashboardData, NetworkStats, NetworkStatsDelta},
};

const KEY_LATEST_BLOCK: &str = "latest_block";
const KEY_RECENT_BLOCKS: &str = "recent_blocks";
const KEY_RECENT_TRANSACTIONS: &str = "recent_transactions";
const KEY_NETWORK_STATS: &str = "network_stats";

pub struct RedisCachePolicy {
    manager: ConnectionManager,
}

impl RedisCachePolicy {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self { manager })
    }

    fn warm_block_key(number: u64) -> String {
        format!("block:{number}")
    }

    fn warm_transaction_key(hash: &str) -> String {
        format!("tx:{hash}")
    }

    async fn push_capped<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        cap: usize,
    ) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let encoded = serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let _: () = conn
            .lpush(key, encoded)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        let _: () = conn
            .ltrim(key, 0, cap as isize - 1)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn get_list<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, CacheError> {
        let mut conn = self.manager.clone();
        let raw: Vec<String> = conn
            .lrange(key, 0, -1)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        raw.into_iter()
            .map(|s| serde_json::from_str(&s).map_err(|e| CacheError::Serialization(e.to_string())))
            .collect()
    }
}

#[async_trait]
impl CachePolicy for RedisCachePolicy {
    async fn set_latest_block(&self, block: &BlockSummary) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let encoded = serde_json::to_string(block).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let _: () = conn
            .set_ex(KEY_LATEST_BLOCK, encoded, LATEST_BLOCK_TTL.as_secs())
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn get_latest_block(&self) -> Result<Option<BlockSummary>, CacheError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn
            .get(KEY_LATEST_BLOCK)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        raw.map(|s| serde_json::from_str(&s).map_err(|e| CacheError::Serialization(e.to_string())))
            .transpose()
    }

    async fn push_recent_block(&self, block: &BlockSummary) -> Result<(), CacheError> {
        self.push_capped(KEY_RECENT_BLOCKS, block, RECENT_LIST_CAP).await
    }

    async fn get_recent_blocks(&self) -> Result<Vec<BlockSummary>, CacheError> {
        self.get_list(KEY_RECENT_BLOCKS).await
    }

    async fn push_recent_transaction(&self, tx: &TransactionSummary) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        self.push_capped(KEY_RECENT_TRANSACTIONS, tx, RECENT_LIST_CAP).await?;
        let _: () = conn
            .expire(KEY_RECENT_TRANSACTIONS, LATEST_BLOCK_TTL.as_secs() as i64)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn get_recent_transactions(&self) -> Result<Vec<TransactionSummary>, CacheError> {
        self.get_list(KEY_RECENT_TRANSACTIONS).await
    }

    async fn bump_network_stats(&self, delta: NetworkStatsDelta) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .hincr(KEY_NETWORK_STATS, "total_blocks", delta.blocks)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        let _: () = conn
            .hincr(KEY_NETWORK_STATS, "total_transactions", delta.transactions)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        let _: () = conn
            .hincr(KEY_NETWORK_STATS, "total_accounts", delta.accounts)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        let _: () = conn
            .hincr(KEY_NETWORK_STATS, "total_events", delta.events)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        let _: () = conn
            .expire(KEY_NETWORK_STATS, NETWORK_STATS_TTL.as_secs() as i64)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn get_network_stats(&self) -> Result<NetworkStats, CacheError> {
        let mut conn = self.manager.clone();
        let (total_blocks, total_transactions, total_accounts, total_events): (
            Option<u64>,
            Option<u64>,
            Option<u64>,
            Option<u64>,
        ) = redis::pipe()
            .hget(KEY_NETWORK_STATS, "total_blocks")
            .hget(KEY_NETWORK_STATS, "total_transactions")
            .hget(KEY_NETWORK_STATS, "total_accounts")
            .hget(KEY_NETWORK_STATS, "total_events")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;

        Ok(NetworkStats {
            total_blocks: total_blocks.unwrap_or_default(),
            total_transactions: total_transactions.unwrap_or_default(),
            total_accounts: total_accounts.unwrap_or_default(),
            total_events: total_events.unwrap_or_default(),
        })
    }

    async fn warm_block(&self, number: u64, payload: &[u8]) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .set_ex(Self::warm_block_key(number), payload, WARM_ENTRY_TTL.as_secs())
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn get_warm_block(&self, number: u64) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.manager.clone();
        conn.get(Self::warm_block_key(number))
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))
    }

    async fn warm_transaction(&self, hash: &str, payload: &[u8]) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .set_ex(Self::warm_transaction_key(hash), payload, WARM_ENTRY_TTL.as_secs())
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn get_warm_transaction(&self, hash: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.manager.clone();
        conn.get(Self::warm_transaction_key(hash))
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))
    }

    async fn get_dashboard_data(&self) -> Result<DashboardData, CacheError> {
        let latest_block = self.get_latest_block().await?;
        let recent_transactions = self.get_recent_transactions().await?;
        let network_stats = self.get_network_stats().await?;
        let data = DashboardData {
            latest_block,
            recent_transactions,
            network_stats,
        };
        let mut conn = self.manager.clone();
        if let Ok(encoded) = serde_json::to_string(&data) {
            let _: Result<(), _> = conn
                .set_ex("dashboard_data", encoded, DASHBOARD_DATA_TTL.as_secs().max(1))
                .await;
        }
        Ok(data)
    }
}
