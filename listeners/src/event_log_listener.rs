// Event-log listener. Backfills in 1000-block windows, then
// subscribes to live logs. Resolves event names via the external ABI
// interface, falling back to the compiled-in static signature table.

use std::sync::Arc;

use besuscan_broker::{Broker, QueueName};
use besuscan_common::{
    config::{EVENT_BACKFILL_PACING_DELAY, EVENT_BACKFILL_WINDOW_BLOCKS, EVENT_LOG_BUFFER},
    erc_signatures::{resolve_static, UNKNOWN_EVENT_NAME},
    jobs::EventJob,
};
use besuscan_ledger::{types::LogFilter, LedgerClient};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::abi_resolver::AbiResolver;

pub struct EventLogListener<L: LedgerClient, B: Broker> {
    ledger: Arc<L>,
    broker: Arc<B>,
    abi_resolver: Arc<AbiResolver>,
    monitored_contracts: Vec<String>,
    starting_block: Option<u64>,
}

impl<L: LedgerClient + 'static, B: Broker + 'static> EventLogListener<L, B> {
    pub fn new(
        ledger: Arc<L>,
        broker: Arc<B>,
        abi_resolver: Arc<AbiResolver>,
        monitored_contracts: Vec<String>,
        starting_block: Option<u64>,
    ) -> Self {
        Self {
            ledger,
            broker,
            abi_resolver,
            monitored_contracts,
            starting_block,
        }
    }

    fn filter(&self, from_block: Option<u64>, to_block: Option<u64>) -> LogFilter {
        // An empty contract filter subscribes to all logs.
        LogFilter {
            addresses: self.monitored_contracts.clone(),
            from_block,
            to_block,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        if let Err(err) = self.backfill(&cancel).await {
            log::error!("event-log listener backfill failed: {err}");
        }

        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return;
            }
            match self.stream_live(&cancel).await {
                Ok(()) => return,
                Err(err) => {
                    log::warn!("log subscription dropped: {err}, reconnecting");
                    besuscan_ledger::AlloyLedgerClient::backoff_sleep(attempt).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn backfill(&self, cancel: &CancellationToken) -> Result<(), anyhow::Error> {
        let tip = self.ledger.block_number().await?;
        let start = match self.starting_block {
            Some(s) if s < tip => s,
            _ => return Ok(()),
        };

        let mut window_start = start;
        while window_start < tip {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let window_end = (window_start + EVENT_BACKFILL_WINDOW_BLOCKS - 1).min(tip);
            let filter = self.filter(Some(window_start), Some(window_end));
            match self.ledger.get_logs(filter).await {
                Ok(logs) => {
                    for log in logs {
                        self.process_log(log).await;
                    }
                }
                Err(err) => {
                    log::error!("event-log backfill window [{window_start},{window_end}] failed: {err}");
                }
            }
            window_start = window_end + 1;
            tokio::time::sleep(EVENT_BACKFILL_PACING_DELAY).await;
        }
        Ok(())
    }

    async fn stream_live(&self, cancel: &CancellationToken) -> Result<(), anyhow::Error> {
        let filter = self.filter(None, None);
        let mut logs = self.ledger.subscribe_logs(filter).await?;

        let (tx, mut rx) = mpsc::channel(EVENT_LOG_BUFFER);
        let producer = tokio::spawn(async move {
            loop {
                match logs.next().await {
                    Some(log) => {
                        if tx.try_send(log).is_err() {
                            // Buffer full: live stream fidelity over completeness.
                            log::warn!("event-log buffer full, dropping log");
                        }
                    }
                    None => return,
                }
            }
        });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                log = rx.recv() => {
                    match log {
                        Some(log) => self.process_log(log).await,
                        None => break,
                    }
                }
            }
        }
        producer.abort();
        Ok(())
    }

    async fn process_log(&self, log: besuscan_ledger::types::RpcLog) {
        let event_name = self.resolve_event_name(&log).await;

        let job = EventJob {
            transaction_hash: log.transaction_hash.clone(),
            log_index: log.log_index,
            contract_address: log.address,
            block_number: log.block_number,
            block_hash: log.block_hash,
            topics: log.topics,
            data: log.data,
            timestamp: besuscan_common::time::now_seconds(),
            resolved_name: Some(event_name),
        };

        match serde_json::to_vec(&job) {
            Ok(payload) => {
                if let Err(err) = self.broker.publish(QueueName::EventDiscovered, &payload).await {
                    log::error!(
                        "failed to publish event-discovered for {}#{}: {err}",
                        job.transaction_hash,
                        job.log_index
                    );
                }
            }
            Err(err) => log::error!("failed to encode event job: {err}"),
        }
    }

    async fn resolve_event_name(&self, log: &besuscan_ledger::types::RpcLog) -> String {
        let Some(topic0) = log.topics.first() else {
            return UNKNOWN_EVENT_NAME.to_string();
        };

        if let Some(abi) = self.abi_resolver.resolve_abi(&log.address).await {
            if let Some(name) = AbiResolver::find_event_name(&abi, topic0) {
                return name;
            }
        }

        resolve_static(topic0)
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_EVENT_NAME.to_string())
    }
}
