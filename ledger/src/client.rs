// Typed ledger adapter. `LedgerClient` is the interface every listener
// and handler depends on; `AlloyLedgerClient` is the only
// implementation, wrapping an `alloy` `RootProvider` behind it — real
// behavior behind a trait, same as `Storage` sits over `sqlx`.

use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address as AlloyAddress, B256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{Filter, Log as AlloyLog},
};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::time::sleep;

use besuscan_common::{config::{RECONNECT_BACKOFF_MAX, RECONNECT_BACKOFF_START}, hex_encoding::{bytes_to_hex, hex_to_bytes, normalize_hex}};

use crate::{
    error::LedgerError,
    signer::recover_sender_from_rpc,
    types::{Header, LogFilter, RpcBlock, RpcLog, RpcReceipt, RpcTransaction},
};

/// Typed JSON-RPC + streaming-subscription operations over a Besu QBFT
/// node.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn subscribe_new_heads(
        &self,
    ) -> Result<Box<dyn Stream<Item = Header> + Send + Unpin>, LedgerError>;

    async fn subscribe_pending_tx_hashes(
        &self,
    ) -> Result<Box<dyn Stream<Item = String> + Send + Unpin>, LedgerError>;

    async fn subscribe_logs(
        &self,
        filter: LogFilter,
    ) -> Result<Box<dyn Stream<Item = RpcLog> + Send + Unpin>, LedgerError>;

    /// One-shot historical query (`eth_getLogs`). Unlike
    /// `subscribe_logs`, this respects `from_block`/`to_block` and
    /// returns once the window has been fully read — the only way to
    /// actually backfill, since `eth_subscribe("logs", …)` is
    /// forward-only and ignores the filter's block range.
    async fn get_logs(&self, filter: LogFilter) -> Result<Vec<RpcLog>, LedgerError>;

    async fn block_by_number(&self, number: u64) -> Result<Option<RpcBlock>, LedgerError>;

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<RpcTransaction>, LedgerError>;

    async fn receipt_by_hash(&self, hash: &str) -> Result<Option<RpcReceipt>, LedgerError>;

    async fn code_at(&self, address: &str) -> Result<Vec<u8>, LedgerError>;

    async fn balance_at(&self, address: &str) -> Result<primitive_types::U256, LedgerError>;

    async fn block_number(&self) -> Result<u64, LedgerError>;

    /// Raw JSON-RPC escape hatch, used for the QBFT consensus methods
    /// that `alloy` has no typed namespace for.
    async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError>;
}

/// Wraps an `alloy` `RootProvider`. Prefers a WS transport
/// (`ETH_WS_URL`) when configured; falls back to HTTP (`ETH_RPC_URL`)
/// otherwise.
pub struct AlloyLedgerClient {
    provider: RootProvider,
    chain_id: u64,
}

impl AlloyLedgerClient {
    pub async fn connect(
        http_url: &str,
        ws_url: Option<&str>,
        chain_id: u64,
    ) -> Result<Self, LedgerError> {
        let provider = if let Some(ws) = ws_url {
            ProviderBuilder::new()
                .connect_ws(alloy::providers::WsConnect::new(ws))
                .await
                .map_err(|e| LedgerError::Transport(e.to_string()))?
        } else {
            let url: url::Url = http_url
                .parse()
                .map_err(|e: url::ParseError| LedgerError::Transport(e.to_string()))?;
            ProviderBuilder::new().connect_http(url)
        };

        Ok(Self { provider, chain_id })
    }

    /// Sleep a bounded exponential backoff before reconnecting.
    pub async fn backoff_sleep(attempt: u32) {
        let backoff = RECONNECT_BACKOFF_START.saturating_mul(1 << attempt.min(4));
        sleep(backoff.min(RECONNECT_BACKOFF_MAX)).await;
    }
}

#[async_trait]
impl LedgerClient for AlloyLedgerClient {
    async fn subscribe_new_heads(
        &self,
    ) -> Result<Box<dyn Stream<Item = Header> + Send + Unpin>, LedgerError> {
        let subscription = self
            .provider
            .subscribe_blocks()
            .await
            .map_err(|e| LedgerError::SubscriptionDropped(e.to_string()))?;
        let stream = subscription.into_stream().map(header_from_alloy);
        Ok(Box::new(Box::pin(stream)))
    }

    async fn subscribe_pending_tx_hashes(
        &self,
    ) -> Result<Box<dyn Stream<Item = String> + Send + Unpin>, LedgerError> {
        let subscription = self
            .provider
            .subscribe_pending_transactions()
            .await
            .map_err(|e| LedgerError::SubscriptionDropped(e.to_string()))?;
        let stream = subscription
            .into_stream()
            .map(|hash: B256| bytes_to_hex(hash.as_slice()));
        Ok(Box::new(Box::pin(stream)))
    }

    async fn subscribe_logs(
        &self,
        filter: LogFilter,
    ) -> Result<Box<dyn Stream<Item = RpcLog> + Send + Unpin>, LedgerError> {
        let alloy_filter = to_alloy_filter(&filter);
        let subscription = self
            .provider
            .subscribe_logs(&alloy_filter)
            .await
            .map_err(|e| LedgerError::SubscriptionDropped(e.to_string()))?;
        let stream = subscription.into_stream().map(log_from_alloy);
        Ok(Box::new(Box::pin(stream)))
    }

    async fn get_logs(&self, filter: LogFilter) -> Result<Vec<RpcLog>, LedgerError> {
        let alloy_filter = to_alloy_filter(&filter);
        let logs = self
            .provider
            .get_logs(&alloy_filter)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        Ok(logs.into_iter().map(log_from_alloy).collect())
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<RpcBlock>, LedgerError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .full()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        Ok(block.map(|b| block_from_alloy(b, self.chain_id)))
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<RpcTransaction>, LedgerError> {
        let hash = parse_b256(hash)?;
        let tx = self
            .provider
            .get_transaction_by_hash(hash)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        Ok(tx.map(|t| transaction_from_alloy(t, self.chain_id)))
    }

    async fn receipt_by_hash(&self, hash: &str) -> Result<Option<RpcReceipt>, LedgerError> {
        let hash = parse_b256(hash)?;
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        Ok(receipt.map(receipt_from_alloy))
    }

    async fn code_at(&self, address: &str) -> Result<Vec<u8>, LedgerError> {
        let address = parse_address(address)?;
        let code = self
            .provider
            .get_code_at(address)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        Ok(code.to_vec())
    }

    async fn balance_at(&self, address: &str) -> Result<primitive_types::U256, LedgerError> {
        let address = parse_address(address)?;
        let balance = self
            .provider
            .get_balance(address)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        let bytes: [u8; 32] = balance.to_be_bytes();
        Ok(primitive_types::U256::from_big_endian(&bytes))
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        self.provider
            .client()
            .request(method, params)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))
    }
}

fn parse_b256(hash: &str) -> Result<B256, LedgerError> {
    let bytes = hex_to_bytes(hash).map_err(|e| LedgerError::Rpc(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(LedgerError::Rpc(format!("{hash} is not a 32-byte hash")));
    }
    Ok(B256::from_slice(&bytes))
}

fn parse_address(address: &str) -> Result<AlloyAddress, LedgerError> {
    let bytes = hex_to_bytes(address).map_err(|e| LedgerError::Rpc(e.to_string()))?;
    AlloyAddress::try_from(bytes.as_slice())
        .map_err(|_| LedgerError::Rpc(format!("{address} is not a 20-byte address")))
}

fn to_alloy_filter(filter: &LogFilter) -> Filter {
    let mut f = Filter::new();
    if !filter.addresses.is_empty() {
        let addresses: Vec<AlloyAddress> = filter
            .addresses
            .iter()
            .filter_map(|a| parse_address(a).ok())
            .collect();
        f = f.address(addresses);
    }
    if let Some(from) = filter.from_block {
        f = f.from_block(from);
    }
    if let Some(to) = filter.to_block {
        f = f.to_block(to);
    }
    f
}

fn header_from_alloy(header: alloy::rpc::types::Header) -> Header {
    Header {
        number: header.number,
        hash: bytes_to_hex(header.hash.as_slice()),
        parent_hash: bytes_to_hex(header.parent_hash.as_slice()),
        timestamp: header.timestamp,
        miner: bytes_to_hex(header.inner.beneficiary.as_slice()),
        difficulty: u256_from_alloy(header.inner.difficulty),
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        base_fee_per_gas: header.base_fee_per_gas.map(|v| primitive_types::U256::from(v)),
        extra_data: bytes_to_hex(&header.inner.extra_data),
        mix_hash: bytes_to_hex(header.inner.mix_hash.as_slice()),
        nonce: bytes_to_hex(header.inner.nonce.as_slice()),
        receipts_root: bytes_to_hex(header.inner.receipts_root.as_slice()),
        state_root: bytes_to_hex(header.inner.state_root.as_slice()),
        transactions_root: bytes_to_hex(header.inner.transactions_root.as_slice()),
        logs_bloom: bytes_to_hex(header.inner.logs_bloom.as_slice()),
    }
}

fn u256_from_alloy(value: alloy::primitives::U256) -> primitive_types::U256 {
    primitive_types::U256::from_big_endian(&value.to_be_bytes::<32>())
}

fn block_from_alloy(block: alloy::rpc::types::Block, chain_id: u64) -> RpcBlock {
    let header = header_from_alloy(block.header);
    RpcBlock {
        header,
        size: block.size().unwrap_or_default().to::<u64>(),
        uncle_hashes: block
            .uncles
            .iter()
            .map(|h| bytes_to_hex(h.as_slice()))
            .collect(),
        transactions: block
            .transactions
            .into_transactions()
            .map(|tx| transaction_from_alloy(tx, chain_id))
            .collect(),
    }
}

fn transaction_from_alloy(tx: alloy::rpc::types::Transaction, chain_id: u64) -> RpcTransaction {
    let inner = &tx.inner;
    let rpc_tx = RpcTransaction {
        hash: bytes_to_hex(tx.inner.tx_hash().as_slice()),
        from: Some(bytes_to_hex(tx.from.as_slice())),
        to: inner.to().map(|a| bytes_to_hex(a.as_slice())),
        value: u256_from_alloy(inner.value()),
        gas: inner.gas_limit(),
        gas_price: inner.gas_price().map(primitive_types::U256::from),
        max_fee_per_gas: Some(primitive_types::U256::from(inner.max_fee_per_gas())),
        max_priority_fee_per_gas: inner.max_priority_fee_per_gas().map(primitive_types::U256::from),
        nonce: inner.nonce(),
        input: bytes_to_hex(inner.input()),
        tx_type: inner.ty(),
        block_number: tx.block_number,
        block_hash: tx.block_hash.map(|h| bytes_to_hex(h.as_slice())),
        transaction_index: tx.transaction_index.map(|i| i as u32),
        chain_id: inner.chain_id().or(Some(chain_id)),
        v: 0,
        r: primitive_types::U256::zero(),
        s: primitive_types::U256::zero(),
    };
    rpc_tx
}

fn receipt_from_alloy(receipt: alloy::rpc::types::TransactionReceipt) -> RpcReceipt {
    RpcReceipt {
        transaction_hash: bytes_to_hex(receipt.transaction_hash.as_slice()),
        status: receipt.status(),
        gas_used: receipt.gas_used,
        contract_address: receipt.contract_address.map(|a| bytes_to_hex(a.as_slice())),
        logs: receipt
            .inner
            .logs()
            .iter()
            .cloned()
            .map(log_from_alloy)
            .collect(),
    }
}

fn log_from_alloy(log: AlloyLog) -> RpcLog {
    RpcLog {
        address: bytes_to_hex(log.address().as_slice()),
        topics: log
            .topics()
            .iter()
            .map(|t| bytes_to_hex(t.as_slice()))
            .collect(),
        data: bytes_to_hex(log.data().data.as_ref()),
        block_number: log.block_number.unwrap_or_default(),
        block_hash: log
            .block_hash
            .map(|h| bytes_to_hex(h.as_slice()))
            .unwrap_or_default(),
        transaction_hash: log
            .transaction_hash
            .map(|h| bytes_to_hex(h.as_slice()))
            .unwrap_or_default(),
        log_index: log.log_index.unwrap_or_default() as u32,
        removed: log.removed,
    }
}

/// Resolve a transaction's sender when the node didn't already supply
/// one inline.
pub fn resolve_sender(tx: &RpcTransaction, chain_id: u64) -> String {
    recover_sender_from_rpc(tx, chain_id)
}

#[allow(dead_code)]
fn normalize(addr: &str) -> String {
    normalize_hex(addr)
}
