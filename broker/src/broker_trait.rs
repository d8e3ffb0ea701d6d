// Durable message broker abstraction. Listeners publish,
// handlers consume; the broker is the only coupling between them.

use async_trait::async_trait;
use futures::Stream;

use crate::{error::BrokerError, queue::QueueName};

/// One delivered message. The processor decides `ack`/`nack` only after
/// its side effects (DB write, cache update) have succeeded.
#[async_trait]
pub trait Delivery: Send {
    fn payload(&self) -> &[u8];

    async fn ack(self: Box<Self>) -> Result<(), BrokerError>;

    /// `requeue = true` asks the broker to redeliver (transient
    /// failure); `requeue = false` drops the message — never requeue a
    /// poison message that will fail identically on every redelivery.
    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), BrokerError>;
}

#[async_trait]
pub trait Broker: Send + Sync {
    /// Synchronous enqueue; the caller decides whether to retry on
    /// error.
    async fn publish(&self, queue: QueueName, payload: &[u8]) -> Result<(), BrokerError>;

    /// Opens a consumer on `queue` with `prefetch = 1`
    /// and the supplied consumer tag.
    async fn consume(
        &self,
        queue: QueueName,
        consumer_tag: &str,
    ) -> Result<Box<dyn Stream<Item = Result<Box<dyn Delivery>, BrokerError>> + Send + Unpin>, BrokerError>;
}

/// `worker-<hostname>-<pid>-<queue>` consumer tag convention. Not
/// enforced at runtime — idempotent writes make duplicate consumers
/// correct by construction — but every consumer registers one so
/// operators can spot duplicates in broker tooling.
pub fn consumer_tag(queue: QueueName) -> String {
    let hostname = hostname_or_unknown();
    let pid = std::process::id();
    format!("worker-{hostname}-{pid}-{queue}")
}

fn hostname_or_unknown() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown-host".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumer_tag_embeds_queue_name_and_pid() {
        let tag = consumer_tag(QueueName::BlockMined);
        assert!(tag.contains("block-mined"));
        assert!(tag.contains(&std::process::id().to_string()));
    }
}
