use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("subscription dropped: {0}")]
    SubscriptionDropped(String),

    #[error("rpc call failed: {0}")]
    Rpc(String),

    #[error("sender recovery failed: {0}")]
    SenderRecovery(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
