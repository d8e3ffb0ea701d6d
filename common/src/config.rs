// Process configuration, loaded once from the environment at startup.
// Tunables are collected as named constants with a short rationale
// comment; the defaults below live next to the env vars that override
// them.

use std::{env, time::Duration};

use crate::error::IndexerError;

// Default chain id used when CHAIN_ID is unset — matches a typical
// Besu/QBFT private network default.
pub const DEFAULT_CHAIN_ID: u64 = 1337;

pub const DEFAULT_WORKER_CONCURRENCY: usize = 5;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

// Block listener tuning.
pub const HEAD_SUBSCRIPTION_BUFFER: usize = 1000;
pub const BLOCK_PREPARE_WORKERS: usize = 10;
pub const BLOCK_PUBLISH_BATCH_SIZE: usize = 50;
pub const BLOCK_PUBLISH_FLUSH_INTERVAL: Duration = Duration::from_secs(2);
pub const BACKFILL_PACING_DELAY: Duration = Duration::from_millis(100);

// Event-log listener tuning.
pub const EVENT_BACKFILL_WINDOW_BLOCKS: u64 = 1000;
pub const EVENT_BACKFILL_PACING_DELAY: Duration = Duration::from_millis(500);
pub const EVENT_LOG_BUFFER: usize = 1000;
pub const ABI_RESOLUTION_TIMEOUT: Duration = Duration::from_secs(5);

// Block handler tuning.
pub const DEFAULT_BATCH_SIZE: usize = 25;
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(8);

// Cache TTLs / caps.
pub const LATEST_BLOCK_TTL: Duration = Duration::from_secs(30);
pub const RECENT_LIST_CAP: usize = 10;
pub const NETWORK_STATS_TTL: Duration = Duration::from_secs(60);
pub const DASHBOARD_DATA_TTL: Duration = Duration::from_secs(1);
pub const WARM_ENTRY_TTL: Duration = Duration::from_secs(5 * 60);

// Transport reconnection backoff.
pub const RECONNECT_BACKOFF_START: Duration = Duration::from_secs(5);
pub const RECONNECT_BACKOFF_MAX: Duration = Duration::from_secs(60);

// Validator handler tuning. The roster changes rarely
// relative to block production, so polling is slow compared to the
// other handlers.
pub const VALIDATOR_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const VALIDATOR_UPTIME_WINDOW_BLOCKS: u64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rabbitmq_url: String,
    pub rabbitmq_exchange: String,
    pub redis_url: String,
    pub eth_rpc_url: String,
    pub eth_ws_url: Option<String>,
    pub chain_id: u64,
    pub starting_block: Option<u64>,
    pub monitored_contracts: Vec<String>,
    pub worker_concurrency: usize,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub api_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, IndexerError> {
        let database_url = require_env("DATABASE_URL")?;
        let rabbitmq_url = require_env("RABBITMQ_URL")?;
        let rabbitmq_exchange = env::var("RABBITMQ_EXCHANGE").unwrap_or_else(|_| "besuscan".into());
        let redis_url = require_env("REDIS_URL")?;
        let eth_rpc_url = require_env("ETH_RPC_URL")?;
        let eth_ws_url = env::var("ETH_WS_URL").ok();
        let chain_id = env::var("CHAIN_ID")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CHAIN_ID);
        let starting_block = env::var("STARTING_BLOCK").ok().and_then(|v| v.parse().ok());
        let monitored_contracts = env::var("MONITORED_CONTRACTS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| crate::hex_encoding::normalize_hex(s.trim()))
                    .filter(|s| s.len() > 2)
                    .collect()
            })
            .unwrap_or_default();
        let worker_concurrency = env::var("WORKER_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_WORKER_CONCURRENCY);
        let retry_attempts = env::var("RETRY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RETRY_ATTEMPTS);
        let retry_delay = env::var("RETRY_DELAY")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RETRY_DELAY);
        let api_base_url = env::var("API_BASE_URL").ok();

        Ok(Self {
            database_url,
            rabbitmq_url,
            rabbitmq_exchange,
            redis_url,
            eth_rpc_url,
            eth_ws_url,
            chain_id,
            starting_block,
            monitored_contracts,
            worker_concurrency,
            retry_attempts,
            retry_delay,
            api_base_url,
        })
    }
}

fn require_env(key: &str) -> Result<String, IndexerError> {
    env::var(key).map_err(|_| IndexerError::Config(format!("{key} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable mutation is process-global; serialize the
    // handful of tests that touch it so they don't race each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_required_var_is_a_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        for key in [
            "DATABASE_URL",
            "RABBITMQ_URL",
            "REDIS_URL",
            "ETH_RPC_URL",
        ] {
            env::remove_var(key);
        }
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, IndexerError::Config(_)));
    }

    #[test]
    fn monitored_contracts_are_normalized() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("DATABASE_URL", "postgres://x");
        env::set_var("RABBITMQ_URL", "amqp://x");
        env::set_var("REDIS_URL", "redis://x");
        env::set_var("ETH_RPC_URL", "http://x");
        env::set_var("MONITORED_CONTRACTS", "0xABC, 0xDEF");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.monitored_contracts, vec!["0xabc", "0xdef"]);
        env::remove_var("MONITORED_CONTRACTS");
    }
}
