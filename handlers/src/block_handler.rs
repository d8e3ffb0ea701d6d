// Block handler. Consumes `block-processed`, batches by size
// or timeout, partitions new-vs-existing via `check_exists_batch`, writes
// each partition in one store transaction, then mirrors the most recent
// block of the batch into the cache.

use std::{collections::HashMap, sync::Arc};

use besuscan_broker::{Broker, QueueName};
use besuscan_common::{
    block::{Block, BlockSummary},
    config::{DEFAULT_BATCH_SIZE, DEFAULT_BATCH_TIMEOUT},
    jobs::BlockJob,
};
use besuscan_ledger::{types::RpcBlock, LedgerClient};
use besuscan_store::Storage;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

pub struct BlockHandler<L: LedgerClient, B: Broker, S: Storage, C: besuscan_cache::CachePolicy> {
    ledger: Arc<L>,
    broker: Arc<B>,
    storage: Arc<S>,
    cache: Arc<C>,
}

impl<L, B, S, C> BlockHandler<L, B, S, C>
where
    L: LedgerClient + 'static,
    B: Broker + 'static,
    S: Storage + 'static,
    C: besuscan_cache::CachePolicy + 'static,
{
    pub fn new(ledger: Arc<L>, broker: Arc<B>, storage: Arc<S>, cache: Arc<C>) -> Self {
        Self {
            ledger,
            broker,
            storage,
            cache,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let consumer_tag = besuscan_broker::consumer_tag(QueueName::BlockProcessed);
        let mut deliveries = match self.broker.consume(QueueName::BlockProcessed, &consumer_tag).await {
            Ok(stream) => stream,
            Err(err) => {
                log::error!("block handler failed to open consumer: {err}");
                return;
            }
        };

        let mut batch: HashMap<String, (BlockJob, Box<dyn besuscan_broker::Delivery>)> = HashMap::new();

        loop {
            let timeout = tokio::time::sleep(DEFAULT_BATCH_TIMEOUT);
            tokio::pin!(timeout);

            tokio::select! {
                _ = cancel.cancelled() => {
                    self.flush(&mut batch).await;
                    return;
                }
                next = deliveries.next() => {
                    match next {
                        Some(Ok(delivery)) => {
                            match serde_json::from_slice::<BlockJob>(delivery.payload()) {
                                Ok(job) => {
                                    // Dedup by hash within the batch.
                                    batch.insert(job.hash.clone(), (job, delivery));
                                    if batch.len() >= DEFAULT_BATCH_SIZE {
                                        self.flush(&mut batch).await;
                                    }
                                }
                                Err(err) => {
                                    log::error!("malformed block-processed payload: {err}");
                                    let _ = delivery.nack(false).await;
                                }
                            }
                        }
                        Some(Err(err)) => log::error!("block-processed consume error: {err}"),
                        None => {
                            self.flush(&mut batch).await;
                            return;
                        }
                    }
                }
                _ = &mut timeout => {
                    self.flush(&mut batch).await;
                }
            }
        }
    }

    async fn flush(&self, batch: &mut HashMap<String, (BlockJob, Box<dyn besuscan_broker::Delivery>)>) {
        if batch.is_empty() {
            return;
        }
        let items = std::mem::take(batch);

        let mut blocks = Vec::with_capacity(items.len());
        let mut deliveries = Vec::with_capacity(items.len());
        for (job, delivery) in items.into_values() {
            match self.fetch_full_block(&job).await {
                Ok(Some(block)) => {
                    blocks.push(block);
                    deliveries.push(delivery);
                }
                Ok(None) => {
                    log::warn!("block {} disappeared before store write, dropping", job.number);
                    let _ = delivery.nack(false).await;
                }
                Err(err) => {
                    log::error!("failed to fetch block {} for store write: {err}", job.number);
                    let _ = delivery.nack(true).await;
                }
            }
        }

        if blocks.is_empty() {
            return;
        }

        let hashes: Vec<String> = blocks.iter().map(|b| b.hash.clone()).collect();
        let existing = match self.storage.check_exists_batch(&hashes).await {
            Ok(existing) => existing,
            Err(err) => {
                log::error!("check_exists_batch failed: {err}");
                for delivery in deliveries {
                    let _ = delivery.nack(true).await;
                }
                return;
            }
        };
        let existing: std::collections::HashSet<String> = existing.into_iter().collect();

        let (to_update, to_insert): (Vec<Block>, Vec<Block>) =
            blocks.into_iter().partition(|b| existing.contains(&b.hash));

        let mut write_ok = true;
        if !to_insert.is_empty() {
            if let Err(err) = self.storage.save_batch(&to_insert).await {
                log::error!("save_batch failed: {err}");
                write_ok = false;
            }
        }
        if !to_update.is_empty() {
            if let Err(err) = self.storage.update_batch(&to_update).await {
                log::error!("update_batch failed: {err}");
                write_ok = false;
            }
        }

        if !write_ok {
            for delivery in deliveries {
                let _ = delivery.nack(true).await;
            }
            return;
        }

        let mut all_written = to_insert;
        all_written.extend(to_update);
        if let Some(latest) = all_written.iter().max_by_key(|b| b.number) {
            self.mirror_to_cache(latest).await;
        }

        for delivery in deliveries {
            if let Err(err) = delivery.ack().await {
                log::error!("failed to ack block-processed delivery: {err}");
            }
        }
    }

    async fn mirror_to_cache(&self, block: &Block) {
        let summary = BlockSummary::from(block);
        if let Err(err) = self.cache.set_latest_block(&summary).await {
            log::warn!("cache set_latest_block failed: {err}");
        }
        if let Err(err) = self.cache.push_recent_block(&summary).await {
            log::warn!("cache push_recent_block failed: {err}");
        }
        if let Err(err) = self
            .cache
            .bump_network_stats(besuscan_cache::NetworkStatsDelta {
                blocks: 1,
                transactions: block.tx_count as u64,
                accounts: 0,
                events: 0,
            })
            .await
        {
            log::warn!("cache bump_network_stats failed: {err}");
        }
    }

    async fn fetch_full_block(&self, job: &BlockJob) -> Result<Option<Block>, anyhow::Error> {
        let rpc_block = self.ledger.block_by_number(job.number).await?;
        Ok(rpc_block.map(|b| block_from_rpc(&b)))
    }
}

fn block_from_rpc(rpc: &RpcBlock) -> Block {
    let header = &rpc.header;
    Block {
        number: header.number,
        hash: header.hash.clone(),
        parent_hash: header.parent_hash.clone(),
        timestamp: header.timestamp,
        miner: header.miner.clone(),
        difficulty: header.difficulty,
        size: rpc.size,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        base_fee: header.base_fee_per_gas,
        tx_count: rpc.transactions.len() as u32,
        uncle_count: rpc.uncle_hashes.len() as u32,
        bloom: header.logs_bloom.clone(),
        extra_data: header.extra_data.clone(),
        mix_digest: header.mix_hash.clone(),
        nonce: header.nonce.clone(),
        receipts_root: header.receipts_root.clone(),
        state_root: header.state_root.clone(),
        tx_root: header.transactions_root.clone(),
        deleted_at: None,
    }
}
