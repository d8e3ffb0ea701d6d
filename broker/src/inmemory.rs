// Channel-backed `Broker` fake for tests — avoids standing up a real
// RabbitMQ broker for listener/handler unit tests.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::{
    broker_trait::{Broker, Delivery},
    error::BrokerError,
    queue::QueueName,
};

pub struct InMemoryBroker {
    senders: Mutex<HashMap<&'static str, mpsc::UnboundedSender<Vec<u8>>>>,
    receivers: Mutex<HashMap<&'static str, mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
            receivers: Mutex::new(HashMap::new()),
        }
    }

    fn channel_for(&self, queue: QueueName) -> mpsc::UnboundedSender<Vec<u8>> {
        let mut senders = self.senders.lock().unwrap();
        senders
            .entry(queue.as_str())
            .or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                self.receivers.lock().unwrap().insert(queue.as_str(), rx);
                tx
            })
            .clone()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn publish(&self, queue: QueueName, payload: &[u8]) -> Result<(), BrokerError> {
        // Fan out to every queue bound to this routing key, mirroring
        // the topic-exchange delivery `LapinBroker` does against real
        // RabbitMQ.
        for target in QueueName::bound_to(queue.routing_key()) {
            let sender = self.channel_for(target);
            sender
                .send(payload.to_vec())
                .map_err(|e| BrokerError::Publish(e.to_string()))?;
        }
        Ok(())
    }

    async fn consume(
        &self,
        queue: QueueName,
        _consumer_tag: &str,
    ) -> Result<Box<dyn Stream<Item = Result<Box<dyn Delivery>, BrokerError>> + Send + Unpin>, BrokerError>
    {
        self.channel_for(queue);
        let receiver = self
            .receivers
            .lock()
            .unwrap()
            .remove(queue.as_str())
            .ok_or_else(|| BrokerError::Consume(format!("queue {queue} already has a consumer")))?;

        let stream = UnboundedReceiverStream::new(receiver).map(|payload| {
            Ok(Box::new(InMemoryDelivery { payload }) as Box<dyn Delivery>)
        });
        Ok(Box::new(Box::pin(stream)))
    }
}

struct InMemoryDelivery {
    payload: Vec<u8>,
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(self: Box<Self>) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn nack(self: Box<Self>, _requeue: bool) -> Result<(), BrokerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_payload_is_delivered_in_order() {
        let broker = InMemoryBroker::new();
        broker.publish(QueueName::BlockMined, b"one").await.unwrap();
        broker.publish(QueueName::BlockMined, b"two").await.unwrap();

        let mut stream = broker
            .consume(QueueName::BlockMined, "worker-test-1-block-mined")
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.payload(), b"one");
        first.ack().await.unwrap();

        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.payload(), b"two");
    }

    #[tokio::test]
    async fn duplicate_consumer_on_same_queue_errors() {
        let broker = InMemoryBroker::new();
        let _first = broker.consume(QueueName::PendingTx, "a").await.unwrap();
        let second = broker.consume(QueueName::PendingTx, "b").await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn transaction_mined_reaches_both_the_handler_and_the_account_indexer() {
        let broker = InMemoryBroker::new();
        let mut tx_handler = broker
            .consume(QueueName::TransactionMined, "worker-test-1-transaction-mined")
            .await
            .unwrap();
        let mut account_indexer = broker
            .consume(QueueName::AccountIndexing, "worker-test-1-account-indexing")
            .await
            .unwrap();

        broker.publish(QueueName::TransactionMined, b"tx").await.unwrap();

        let delivered_to_handler = tx_handler.next().await.unwrap().unwrap();
        assert_eq!(delivered_to_handler.payload(), b"tx");
        let delivered_to_indexer = account_indexer.next().await.unwrap().unwrap();
        assert_eq!(delivered_to_indexer.payload(), b"tx");
    }
}
