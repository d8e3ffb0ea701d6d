// `lapin`-backed `Broker` implementation. A
// `deadpool-lapin` pool supplies connections; each consumer opens its
// own channel and sets `basic_qos(prefetch_count = 1)`. Every queue is
// declared and bound to one durable topic exchange (`RABBITMQ_EXCHANGE`)
// by routing key, so queues sharing a routing key each receive an
// independent copy of a publish instead of competing for it.

use async_trait::async_trait;
use deadpool_lapin::{Config as PoolConfig, Pool, Runtime};
use futures::{Stream, StreamExt};
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
        BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, ExchangeKind,
};

use crate::{
    broker_trait::{Broker, Delivery},
    error::BrokerError,
    queue::QueueName,
};

pub struct LapinBroker {
    pool: Pool,
    exchange: String,
}

impl LapinBroker {
    pub async fn connect(amqp_url: &str, exchange: impl Into<String>) -> Result<Self, BrokerError> {
        let mut cfg = PoolConfig::default();
        cfg.url = Some(amqp_url.to_string());
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        Ok(Self {
            pool,
            exchange: exchange.into(),
        })
    }

    /// Declares the workspace's topic exchange — named by
    /// `RABBITMQ_EXCHANGE` — that every queue is bound into. Routing
    /// through it (rather than the default exchange, where a routing
    /// key can address only one queue) is what lets more than one
    /// independent consumer — e.g. the transaction handler and the
    /// account indexer — each bind their own queue to the same
    /// published message.
    async fn declare_exchange(&self, channel: &lapin::Channel) -> Result<(), BrokerError> {
        channel
            .exchange_declare(
                &self.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn declare_and_bind(&self, channel: &lapin::Channel, queue: QueueName) -> Result<(), BrokerError> {
        channel
            .queue_declare(
                queue.as_str(),
                QueueDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    exclusive: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        channel
            .queue_bind(
                queue.as_str(),
                &self.exchange,
                queue.routing_key(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Broker for LapinBroker {
    async fn publish(&self, queue: QueueName, payload: &[u8]) -> Result<(), BrokerError> {
        let connection = self
            .pool
            .get()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        self.declare_exchange(&channel).await?;
        self.declare_and_bind(&channel, queue).await?;
        channel
            .basic_publish(
                &self.exchange,
                queue.routing_key(),
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;
        Ok(())
    }

    async fn consume(
        &self,
        queue: QueueName,
        consumer_tag: &str,
    ) -> Result<Box<dyn Stream<Item = Result<Box<dyn Delivery>, BrokerError>> + Send + Unpin>, BrokerError>
    {
        let connection = self
            .pool
            .get()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        self.declare_exchange(&channel).await?;
        self.declare_and_bind(&channel, queue).await?;
        channel
            .basic_qos(1, BasicQosOptions { global: false })
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        let consumer = channel
            .basic_consume(
                queue.as_str(),
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))?;

        let stream = consumer.map(|item| {
            item.map(|delivery| {
                Box::new(LapinDelivery { delivery }) as Box<dyn Delivery>
            })
            .map_err(|e| BrokerError::Consume(e.to_string()))
        });

        Ok(Box::new(Box::pin(stream)))
    }
}

struct LapinDelivery {
    delivery: lapin::message::Delivery,
}

#[async_trait]
impl Delivery for LapinDelivery {
    fn payload(&self) -> &[u8] {
        &self.delivery.data
    }

    async fn ack(self: Box<Self>) -> Result<(), BrokerError> {
        self.delivery
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| BrokerError::Acknowledge(e.to_string()))
    }

    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), BrokerError> {
        self.delivery
            .nack(BasicNackOptions {
                requeue,
                ..Default::default()
            })
            .await
            .map_err(|e| BrokerError::Acknowledge(e.to_string()))
    }
}
