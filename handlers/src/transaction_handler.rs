// Transaction handler. Consumes `transaction-mined`,
// idempotently upserts by hash, attaches receipt status/gas/contract
// address when available, classifies `method` by selector, and mirrors
// the latest N to the cache.

use std::sync::Arc;

use besuscan_broker::{Broker, QueueName};
use besuscan_common::{
    hex_encoding::method_selector,
    jobs::TransactionEvent,
    transaction::{BlockCoordinates, Transaction, TransactionStatus, TransactionType},
};
use besuscan_ledger::LedgerClient;
use besuscan_store::Storage;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

pub struct TransactionHandler<L: LedgerClient, B: Broker, S: Storage, C: besuscan_cache::CachePolicy> {
    ledger: Arc<L>,
    broker: Arc<B>,
    storage: Arc<S>,
    cache: Arc<C>,
}

impl<L, B, S, C> TransactionHandler<L, B, S, C>
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
        let consumer_tag = besuscan_broker::consumer_tag(QueueName::TransactionMined);
        let mut deliveries = match self
            .broker
            .consume(QueueName::TransactionMined, &consumer_tag)
            .await
        {
            Ok(stream) => stream,
            Err(err) => {
                log::error!("transaction handler failed to open consumer: {err}");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                next = deliveries.next() => {
                    match next {
                        Some(Ok(delivery)) => self.handle_delivery(delivery).await,
                        Some(Err(err)) => log::error!("transaction-mined consume error: {err}"),
                        None => return,
                    }
                }
            }
        }
    }

    async fn handle_delivery(&self, delivery: Box<dyn besuscan_broker::Delivery>) {
        let event: TransactionEvent = match serde_json::from_slice(delivery.payload()) {
            Ok(event) => event,
            Err(err) => {
                log::error!("malformed transaction-mined payload: {err}");
                let _ = delivery.nack(false).await;
                return;
            }
        };

        match self.process(&event).await {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    log::error!("failed to ack transaction-mined {}: {err}", event.hash);
                }
            }
            Err(err) => {
                log::warn!("failed to process transaction {}: {err}", event.hash);
                let _ = delivery.nack(true).await;
            }
        }
    }

    async fn process(&self, event: &TransactionEvent) -> Result<(), anyhow::Error> {
        let prior = self.storage.get_by_hash(&event.hash).await?;

        let receipt = self.ledger.receipt_by_hash(&event.hash).await.ok().flatten();
        let full_tx = self.ledger.transaction_by_hash(&event.hash).await.ok().flatten();

        let coordinates = match (&event.block_number, &event.block_hash) {
            (Some(number), Some(hash)) => Some(BlockCoordinates {
                block_number: *number,
                block_hash: hash.clone(),
                transaction_index: full_tx
                    .as_ref()
                    .and_then(|tx| tx.transaction_index)
                    .unwrap_or_default(),
            }),
            _ => None,
        };

        let next_status = match (&coordinates, &receipt) {
            (Some(_), Some(r)) => {
                if r.status {
                    TransactionStatus::Success
                } else {
                    TransactionStatus::Failed
                }
            }
            (Some(_), None) => TransactionStatus::Success,
            (None, _) => TransactionStatus::Pending,
        };

        let status = match &prior {
            Some(prior) if prior.status.can_transition_to(next_status) => next_status,
            Some(prior) => prior.status,
            None => next_status,
        };

        let method = full_tx
            .as_ref()
            .and_then(|tx| hex::decode(tx.input.trim_start_matches("0x")).ok())
            .and_then(|bytes| method_selector(&bytes));

        let contract_address = receipt.as_ref().and_then(|r| r.contract_address.clone());

        let mined_at = if coordinates.is_some() {
            Some(besuscan_common::time::now_seconds())
        } else {
            None
        };

        let tx = Transaction {
            hash: event.hash.clone(),
            status,
            coordinates,
            from: event.from.clone(),
            to: event.to.clone(),
            value: event.value,
            gas: event.gas,
            gas_used: receipt.as_ref().map(|r| r.gas_used),
            gas_price: event.gas_price,
            max_fee_per_gas: full_tx.as_ref().and_then(|t| t.max_fee_per_gas),
            max_priority_fee_per_gas: full_tx.as_ref().and_then(|t| t.max_priority_fee_per_gas),
            nonce: event.nonce,
            data: full_tx.as_ref().map(|t| t.input.clone()).unwrap_or_default(),
            tx_type: full_tx
                .as_ref()
                .map(|t| tx_type_from_u8(t.tx_type))
                .unwrap_or(TransactionType::Legacy),
            method,
            contract_address,
            mined_at,
        };

        self.storage.upsert(&tx).await?;

        if let Err(err) = self.cache.push_recent_transaction(&tx.summary()).await {
            log::warn!("cache push_recent_transaction failed: {err}");
        }

        Ok(())
    }
}

fn tx_type_from_u8(tx_type: u8) -> TransactionType {
    match tx_type {
        1 => TransactionType::Eip2930,
        2 => TransactionType::Eip1559,
        _ => TransactionType::Legacy,
    }
}
