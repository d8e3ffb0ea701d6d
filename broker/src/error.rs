use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("consume failed: {0}")]
    Consume(String),

    #[error("ack/nack failed: {0}")]
    Acknowledge(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
