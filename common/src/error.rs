use thiserror::Error;

/// Shared error type returned from domain-level operations that don't
/// own a more specific error enum of their own (ledger, broker, cache
/// and store each keep their own `thiserror` enum at their crate
/// boundary; this one covers `besuscan-common` and the listener/handler
/// glue code that sits above all of them).
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IndexerError {
    /// True for errors that should never be requeued — a poison message
    /// that will fail identically on every redelivery.
    pub fn is_poison(&self) -> bool {
        matches!(self, IndexerError::MalformedPayload(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_payload_is_poison() {
        let err = IndexerError::MalformedPayload("missing field `hash`".into());
        assert!(err.is_poison());
    }

    #[test]
    fn config_error_is_not_poison() {
        let err = IndexerError::Config("DATABASE_URL not set".into());
        assert!(!err.is_poison());
    }
}
