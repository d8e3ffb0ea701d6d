// Mempool listener. Streams pending-tx hashes and republishes
// them unenriched — the pending-tx handler decides whether to fetch the
// transaction body.

use std::sync::Arc;

use besuscan_broker::{Broker, QueueName};
use besuscan_common::jobs::PendingTxJob;
use besuscan_ledger::LedgerClient;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

pub struct MempoolListener<L: LedgerClient, B: Broker> {
    ledger: Arc<L>,
    broker: Arc<B>,
}

impl<L: LedgerClient + 'static, B: Broker + 'static> MempoolListener<L, B> {
    pub fn new(ledger: Arc<L>, broker: Arc<B>) -> Self {
        Self { ledger, broker }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return;
            }
            match self.stream_once(&cancel).await {
                Ok(()) => return,
                Err(err) => {
                    log::warn!("pending-tx subscription dropped: {err}, reconnecting");
                    besuscan_ledger::AlloyLedgerClient::backoff_sleep(attempt).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn stream_once(&self, cancel: &CancellationToken) -> Result<(), anyhow::Error> {
        let mut hashes = self.ledger.subscribe_pending_tx_hashes().await?;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                next = hashes.next() => {
                    match next {
                        Some(hash) => self.publish(hash).await,
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    async fn publish(&self, hash: String) {
        let job = PendingTxJob { hash: hash.clone() };
        match serde_json::to_vec(&job) {
            Ok(payload) => {
                if let Err(err) = self.broker.publish(QueueName::PendingTx, &payload).await {
                    log::error!("failed to publish pending-tx {hash}: {err}");
                }
            }
            Err(err) => log::error!("failed to encode pending-tx job {hash}: {err}"),
        }
    }
}
