// Validator handler. Not a queue consumer: polls the
// consensus-specific RPC on a timer and upserts the full roster in one
// pass, since `upsert_roster` itself decides who drops to inactive.

use std::sync::Arc;

use besuscan_common::{
    config::{VALIDATOR_POLL_INTERVAL, VALIDATOR_UPTIME_WINDOW_BLOCKS},
    time::now_seconds,
    validator::{Validator, ValidatorStatus},
};
use besuscan_ledger::LedgerClient;
use besuscan_store::Storage;
use primitive_types::U256;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

pub struct ValidatorHandler<L: LedgerClient, S: Storage> {
    ledger: Arc<L>,
    storage: Arc<S>,
}

impl<L, S> ValidatorHandler<L, S>
where
    L: LedgerClient + 'static,
    S: Storage + 'static,
{
    pub fn new(ledger: Arc<L>, storage: Arc<S>) -> Self {
        Self { ledger, storage }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            if let Err(err) = self.poll_once().await {
                log::warn!("validator roster poll failed: {err}");
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(VALIDATOR_POLL_INTERVAL) => {}
            }
        }
    }

    async fn poll_once(&self) -> Result<(), anyhow::Error> {
        let tip = self.ledger.block_number().await?;
        let window_start = tip.saturating_sub(VALIDATOR_UPTIME_WINDOW_BLOCKS);

        let addresses = self
            .ledger
            .call("qbft_getValidatorsByBlockNumber", json!(["latest"]))
            .await?;
        let addresses = parse_address_list(&addresses);

        let metrics = self
            .ledger
            .call(
                "qbft_getSignerMetrics",
                json!([format!("0x{window_start:x}"), "latest"]),
            )
            .await?;
        let metrics = parse_signer_metrics(&metrics);

        let now = now_seconds();
        let window_blocks = tip.saturating_sub(window_start).max(1);

        let active: Vec<Validator> = addresses
            .into_iter()
            .map(|address| {
                let (proposed_block_count, last_proposed_block) = metrics
                    .get(&address)
                    .cloned()
                    .unwrap_or((U256::zero(), None));
                let proposals_in_window = proposed_block_count.min(U256::from(window_blocks)).as_u64();
                Validator {
                    address,
                    proposed_block_count,
                    last_proposed_block,
                    status: ValidatorStatus::Active,
                    uptime_percentage: Validator::uptime_ratio(proposals_in_window, window_blocks),
                    last_seen: now,
                }
            })
            .collect();

        self.storage.upsert_roster(&active).await?;
        Ok(())
    }
}

fn parse_address_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_lowercase()))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_signer_metrics(value: &Value) -> std::collections::HashMap<String, (U256, Option<u64>)> {
    let mut out = std::collections::HashMap::new();
    let Some(items) = value.as_array() else {
        return out;
    };
    for item in items {
        let Some(address) = item.get("address").and_then(Value::as_str) else {
            continue;
        };
        let proposed = item
            .get("proposedBlockCount")
            .and_then(Value::as_str)
            .and_then(|s| U256::from_str_radix(s.trim_start_matches("0x"), 16).ok())
            .unwrap_or_default();
        let last_proposed = item
            .get("lastProposedBlockNumber")
            .and_then(Value::as_str)
            .and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok());
        out.insert(address.to_lowercase(), (proposed, last_proposed));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_address_list_lowercased() {
        let value = json!(["0xABC", "0xDEF"]);
        assert_eq!(parse_address_list(&value), vec!["0xabc", "0xdef"]);
    }

    #[test]
    fn parses_signer_metrics_hex_fields() {
        let value = json!([
            { "address": "0xABC", "proposedBlockCount": "0x5", "lastProposedBlockNumber": "0x64" }
        ]);
        let metrics = parse_signer_metrics(&value);
        let (count, last) = metrics.get("0xabc").unwrap();
        assert_eq!(*count, U256::from(5));
        assert_eq!(*last, Some(100));
    }
}
