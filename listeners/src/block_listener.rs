// Block listener. Backfills `[S, T]` on start, then
// subscribes to new heads. A bounded channel decouples the subscription
// from a worker pool that prepares `BlockJob`s, which a single publisher
// batches into the broker.

use std::sync::Arc;

use besuscan_broker::{Broker, QueueName};
use besuscan_common::{
    config::{
        BACKFILL_PACING_DELAY, BLOCK_PREPARE_WORKERS, BLOCK_PUBLISH_BATCH_SIZE,
        BLOCK_PUBLISH_FLUSH_INTERVAL, HEAD_SUBSCRIPTION_BUFFER,
    },
    jobs::BlockJob,
};
use besuscan_ledger::{types::Header, LedgerClient};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct BlockListener<L: LedgerClient, B: Broker> {
    ledger: Arc<L>,
    broker: Arc<B>,
    starting_block: Option<u64>,
}

impl<L: LedgerClient + 'static, B: Broker + 'static> BlockListener<L, B> {
    pub fn new(ledger: Arc<L>, broker: Arc<B>, starting_block: Option<u64>) -> Self {
        Self {
            ledger,
            broker,
            starting_block,
        }
    }

    /// Runs until `cancel` trips. Backfills once, then subscribes to new
    /// heads, reconnecting with backoff on subscription drop.
    pub async fn run(&self, cancel: CancellationToken) {
        if let Err(err) = self.backfill(&cancel).await {
            log::error!("block listener backfill failed: {err}");
        }

        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return;
            }
            match self.stream_new_heads(&cancel).await {
                Ok(()) => return,
                Err(err) => {
                    log::warn!("head subscription dropped: {err}, reconnecting");
                    besuscan_ledger::AlloyLedgerClient::backoff_sleep(attempt).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn backfill(&self, cancel: &CancellationToken) -> Result<(), anyhow::Error> {
        let tip = self.ledger.block_number().await?;
        let start = self.starting_block.unwrap_or(tip).min(tip);

        // starting_block > tip disables backfill.
        if start >= tip {
            return Ok(());
        }

        for number in start..=tip {
            if cancel.is_cancelled() {
                return Ok(());
            }
            match self.ledger.block_by_number(number).await {
                Ok(Some(block)) => {
                    let job = BlockJob {
                        number: block.header.number,
                        hash: block.header.hash.clone(),
                        timestamp: block.header.timestamp,
                    };
                    if let Err(err) = self.publish_job(job).await {
                        log::error!("failed to publish backfilled block {number}: {err}");
                    }
                }
                Ok(None) => log::warn!("backfill: block {number} not found, skipping"),
                Err(err) => log::error!("backfill: RPC failure for block {number}: {err}, skipping"),
            }
            tokio::time::sleep(BACKFILL_PACING_DELAY).await;
        }
        Ok(())
    }

    async fn stream_new_heads(&self, cancel: &CancellationToken) -> Result<(), anyhow::Error> {
        let mut headers = self.ledger.subscribe_new_heads().await?;

        let (header_tx, header_rx) = mpsc::channel::<Header>(HEAD_SUBSCRIPTION_BUFFER);
        let (job_tx, mut job_rx) = mpsc::channel::<BlockJob>(HEAD_SUBSCRIPTION_BUFFER);

        let header_rx = Arc::new(tokio::sync::Mutex::new(header_rx));
        let mut prepare_handles = Vec::with_capacity(BLOCK_PREPARE_WORKERS);
        for _ in 0..BLOCK_PREPARE_WORKERS {
            let header_rx = header_rx.clone();
            let job_tx = job_tx.clone();
            prepare_handles.push(tokio::spawn(async move {
                loop {
                    let header = {
                        let mut rx = header_rx.lock().await;
                        rx.recv().await
                    };
                    match header {
                        Some(header) => {
                            let job = BlockJob {
                                number: header.number,
                                hash: header.hash,
                                timestamp: header.timestamp,
                            };
                            if job_tx.send(job).await.is_err() {
                                return;
                            }
                        }
                        None => return,
                    }
                }
            }));
        }
        drop(job_tx);

        let publisher = {
            let broker = self.broker.clone();
            tokio::spawn(async move {
                publish_batches(broker, &mut job_rx).await;
            })
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = headers.next() => {
                    match next {
                        Some(header) => {
                            if header_tx.send(header).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            drop(header_tx);
                            break;
                        }
                    }
                }
            }
        }

        for handle in prepare_handles {
            let _ = handle.await;
        }
        let _ = publisher.await;
        Ok(())
    }

    async fn publish_job(&self, job: BlockJob) -> Result<(), anyhow::Error> {
        let payload = serde_json::to_vec(&job)?;
        self.broker.publish(QueueName::BlockMined, &payload).await?;
        Ok(())
    }
}

/// Drains `job_rx` into the broker in batches of up to
/// `BLOCK_PUBLISH_BATCH_SIZE`, flushing early after
/// `BLOCK_PUBLISH_FLUSH_INTERVAL`.
async fn publish_batches<B: Broker>(broker: Arc<B>, job_rx: &mut mpsc::Receiver<BlockJob>) {
    let mut batch = Vec::with_capacity(BLOCK_PUBLISH_BATCH_SIZE);
    loop {
        let deadline = tokio::time::sleep(BLOCK_PUBLISH_FLUSH_INTERVAL);
        tokio::pin!(deadline);

        tokio::select! {
            job = job_rx.recv() => {
                match job {
                    Some(job) => {
                        batch.push(job);
                        if batch.len() >= BLOCK_PUBLISH_BATCH_SIZE {
                            flush(&broker, &mut batch).await;
                        }
                    }
                    None => {
                        flush(&broker, &mut batch).await;
                        return;
                    }
                }
            }
            _ = &mut deadline => {
                flush(&broker, &mut batch).await;
            }
        }
    }
}

async fn flush<B: Broker>(broker: &Arc<B>, batch: &mut Vec<BlockJob>) {
    if batch.is_empty() {
        return;
    }
    for job in batch.drain(..) {
        match serde_json::to_vec(&job) {
            Ok(payload) => {
                if let Err(err) = broker.publish(QueueName::BlockMined, &payload).await {
                    log::error!("failed to publish block-mined for {}: {err}", job.number);
                }
            }
            Err(err) => log::error!("failed to encode block job {}: {err}", job.number),
        }
    }
}
