// Event handler. Consumes `event-discovered`, decodes what
// it can from the raw log, persists keyed by `(transaction_hash,
// log_index)`, and republishes to `event-processed` for the fan-out
// service.

use std::{collections::BTreeMap, sync::Arc};

use besuscan_broker::{Broker, QueueName};
use besuscan_common::{erc_signatures::UNKNOWN_EVENT_NAME, event::Event, jobs::EventJob};
use besuscan_store::Storage;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

pub struct EventHandler<B: Broker, S: Storage> {
    broker: Arc<B>,
    storage: Arc<S>,
}

impl<B, S> EventHandler<B, S>
where
    B: Broker + 'static,
    S: Storage + 'static,
{
    pub fn new(broker: Arc<B>, storage: Arc<S>) -> Self {
        Self { broker, storage }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let consumer_tag = besuscan_broker::consumer_tag(QueueName::EventDiscovered);
        let mut deliveries = match self.broker.consume(QueueName::EventDiscovered, &consumer_tag).await {
            Ok(stream) => stream,
            Err(err) => {
                log::error!("event handler failed to open consumer: {err}");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                next = deliveries.next() => {
                    match next {
                        Some(Ok(delivery)) => self.handle_delivery(delivery).await,
                        Some(Err(err)) => log::error!("event-discovered consume error: {err}"),
                        None => return,
                    }
                }
            }
        }
    }

    async fn handle_delivery(&self, delivery: Box<dyn besuscan_broker::Delivery>) {
        let job: EventJob = match serde_json::from_slice(delivery.payload()) {
            Ok(job) => job,
            Err(err) => {
                log::error!("malformed event-discovered payload: {err}");
                let _ = delivery.nack(false).await;
                return;
            }
        };

        match self.process(&job).await {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    log::error!(
                        "failed to ack event-discovered {}#{}: {err}",
                        job.transaction_hash,
                        job.log_index
                    );
                }
            }
            Err(err) => {
                log::warn!(
                    "failed to process event {}#{}: {err}",
                    job.transaction_hash,
                    job.log_index
                );
                let _ = delivery.nack(true).await;
            }
        }
    }

    async fn process(&self, job: &EventJob) -> Result<(), anyhow::Error> {
        let event = Event {
            transaction_hash: job.transaction_hash.clone(),
            log_index: job.log_index,
            contract_address: job.contract_address.clone(),
            block_number: job.block_number,
            block_hash: job.block_hash.clone(),
            topics: job.topics.clone(),
            data: job.data.clone(),
            event_name: job
                .resolved_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_EVENT_NAME.to_string()),
            event_signature: job.topics.first().cloned(),
            decoded_data: decode_best_effort(job),
            removed: false,
            timestamp: job.timestamp,
        };

        self.storage.upsert(&event).await?;

        let payload = serde_json::to_vec(&event)?;
        self.broker.publish(QueueName::EventProcessed, &payload).await?;
        Ok(())
    }
}

/// Without the contract's full ABI this only surfaces what the raw log
/// already carries: indexed topics beyond `topics[0]` and the raw data
/// blob. A handler with access to a resolved ABI (via the same
/// ABI-resolution interface the event-log listener consults) could
/// decode further; that enrichment is out of this handler's scope.
fn decode_best_effort(job: &EventJob) -> BTreeMap<String, serde_json::Value> {
    let mut decoded = BTreeMap::new();
    for (i, topic) in job.topics.iter().skip(1).enumerate() {
        decoded.insert(format!("indexed_{i}"), serde_json::Value::String(topic.clone()));
    }
    decoded.insert("data".to_string(), serde_json::Value::String(job.data.clone()));
    decoded
}
