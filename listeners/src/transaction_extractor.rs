// Transaction extractor. Consumes `block-mined`; fetches the
// full block; emits one `TransactionEvent` per transaction, then the
// original `BlockJob` to `block-processed`. Input is acked only after
// both have succeeded.

use std::sync::Arc;

use besuscan_broker::{Broker, QueueName};
use besuscan_common::{
    config::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY},
    jobs::{BlockJob, TransactionEvent},
};
use besuscan_ledger::LedgerClient;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

pub struct TransactionExtractor<L: LedgerClient, B: Broker> {
    ledger: Arc<L>,
    broker: Arc<B>,
    chain_id: u64,
}

impl<L: LedgerClient + 'static, B: Broker + 'static> TransactionExtractor<L, B> {
    pub fn new(ledger: Arc<L>, broker: Arc<B>, chain_id: u64) -> Self {
        Self {
            ledger,
            broker,
            chain_id,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let consumer_tag = besuscan_broker::consumer_tag(QueueName::BlockMined);
        let mut deliveries = match self.broker.consume(QueueName::BlockMined, &consumer_tag).await {
            Ok(stream) => stream,
            Err(err) => {
                log::error!("transaction extractor failed to open consumer: {err}");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                next = deliveries.next() => {
                    match next {
                        Some(Ok(delivery)) => self.handle_delivery(delivery).await,
                        Some(Err(err)) => log::error!("block-mined consume error: {err}"),
                        None => return,
                    }
                }
            }
        }
    }

    async fn handle_delivery(&self, delivery: Box<dyn besuscan_broker::Delivery>) {
        let job: BlockJob = match serde_json::from_slice(delivery.payload()) {
            Ok(job) => job,
            Err(err) => {
                log::error!("malformed block-mined payload: {err}");
                let _ = delivery.nack(false).await;
                return;
            }
        };

        match self.extract(&job).await {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    log::error!("failed to ack block-mined {}: {err}", job.number);
                }
            }
            Err(err) => {
                log::warn!("failed to extract transactions for block {}: {err}", job.number);
                let _ = delivery.nack(true).await;
            }
        }
    }

    async fn extract(&self, job: &BlockJob) -> Result<(), anyhow::Error> {
        let block = self
            .fetch_block_with_retry(job.number)
            .await?
            .ok_or_else(|| anyhow::anyhow!("block {} disappeared between listing and fetch", job.number))?;

        for rpc_tx in &block.transactions {
            let sender = besuscan_ledger::client::resolve_sender(rpc_tx, self.chain_id);
            let event = TransactionEvent {
                hash: rpc_tx.hash.clone(),
                block_number: rpc_tx.block_number,
                block_hash: rpc_tx.block_hash.clone(),
                from: sender,
                to: rpc_tx.to.clone(),
                value: rpc_tx.value,
                gas: rpc_tx.gas,
                gas_price: rpc_tx.gas_price,
                nonce: rpc_tx.nonce,
            };

            let payload = serde_json::to_vec(&event)?;
            if let Err(err) = self.broker.publish(QueueName::TransactionMined, &payload).await {
                log::error!("failed to publish transaction-mined for {}: {err}", event.hash);
            }
        }

        let payload = serde_json::to_vec(job)?;
        self.broker.publish(QueueName::BlockProcessed, &payload).await?;
        Ok(())
    }

    async fn fetch_block_with_retry(
        &self,
        number: u64,
    ) -> Result<Option<besuscan_ledger::types::RpcBlock>, anyhow::Error> {
        let mut last_err = None;
        for attempt in 0..DEFAULT_RETRY_ATTEMPTS {
            match self.ledger.block_by_number(number).await {
                Ok(block) => return Ok(block),
                Err(err) => {
                    last_err = Some(err);
                    if attempt + 1 < DEFAULT_RETRY_ATTEMPTS {
                        tokio::time::sleep(DEFAULT_RETRY_DELAY).await;
                    }
                }
            }
        }
        Err(anyhow::anyhow!(
            "block {number} fetch failed after {DEFAULT_RETRY_ATTEMPTS} attempts: {:?}",
            last_err
        ))
    }
}
