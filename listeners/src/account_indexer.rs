// Account indexer. Consumes `account-indexing` — its own
// copy of every mined transaction, fanned out alongside
// `transaction-mined` off the same publish — derives
// account/contract-interaction/balance-update/smart-account facts, and
// publishes one job per derived fact.

use std::sync::Arc;

use besuscan_broker::{Broker, QueueName};
use besuscan_common::{
    hex_encoding::method_selector,
    jobs::{AccountBalanceUpdate, AccountDiscovered, ContractInteractionJob, SmartAccountProcessing, TransactionEvent},
};
use besuscan_ledger::{signer::derive_contract_address, LedgerClient};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

/// ERC-4337-style selectors a contract-creation's runtime code is probed
/// for to decide whether it looks like a smart account. `validateUserOp(UserOperation,bytes32,uint256)`.
const SMART_ACCOUNT_SELECTOR: &str = "0x3a871cdd";

pub struct AccountIndexer<L: LedgerClient, B: Broker> {
    ledger: Arc<L>,
    broker: Arc<B>,
}

impl<L: LedgerClient + 'static, B: Broker + 'static> AccountIndexer<L, B> {
    pub fn new(ledger: Arc<L>, broker: Arc<B>) -> Self {
        Self { ledger, broker }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        // A distinct queue from the transaction handler's own
        // `TransactionMined` consumer — both are bound to the same
        // routing key (see `QueueName::routing_key`), so each gets an
        // independent copy of every mined transaction instead of the
        // two competing for one queue's deliveries.
        let consumer_tag = besuscan_broker::consumer_tag(QueueName::AccountIndexing);
        let mut deliveries = match self
            .broker
            .consume(QueueName::AccountIndexing, &consumer_tag)
            .await
        {
            Ok(stream) => stream,
            Err(err) => {
                log::error!("account indexer failed to open consumer: {err}");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                next = deliveries.next() => {
                    match next {
                        Some(Ok(delivery)) => self.handle_delivery(delivery).await,
                        Some(Err(err)) => log::error!("account-indexing consume error: {err}"),
                        None => return,
                    }
                }
            }
        }
    }

    async fn handle_delivery(&self, delivery: Box<dyn besuscan_broker::Delivery>) {
        let event: TransactionEvent = match serde_json::from_slice(delivery.payload()) {
            Ok(event) => event,
            Err(err) => {
                log::error!("malformed account-indexing payload: {err}");
                let _ = delivery.nack(false).await;
                return;
            }
        };

        self.index(&event).await;
        if let Err(err) = delivery.ack().await {
            log::error!("failed to ack account-indexing {}: {err}", event.hash);
        }
    }

    async fn index(&self, event: &TransactionEvent) {
        let block_number = event.block_number.unwrap_or_default();
        let now = besuscan_common::time::now_seconds();
        let is_creation = event.to.is_none();

        self.publish_discovered(&event.from, false, None, None, block_number, now).await;
        self.publish_balance_update(&event.from, block_number).await;

        if is_creation {
            match derive_contract_address(&event.from, event.nonce) {
                Ok(contract_address) => {
                    self.publish_discovered(
                        &contract_address,
                        true,
                        Some(event.from.clone()),
                        Some(event.hash.clone()),
                        block_number,
                        now,
                    )
                    .await;
                    self.publish_balance_update(&contract_address, block_number).await;
                    self.classify_smart_account(&contract_address, &event.from, &event.hash, block_number)
                        .await;
                }
                Err(err) => log::warn!(
                    "failed to derive contract address for creation tx {}: {err}",
                    event.hash
                ),
            }
            return;
        }

        let Some(to) = event.to.clone() else { return };
        self.publish_discovered(&to, false, None, None, block_number, now).await;
        self.publish_balance_update(&to, block_number).await;

        match self.ledger.code_at(&to).await {
            Ok(code) if !code.is_empty() => {
                self.publish_contract_interaction(event, &to, &code, block_number, now)
                    .await;
            }
            Ok(_) => {}
            Err(err) => log::warn!("code_at({to}) failed: {err}"),
        }
    }

    async fn publish_discovered(
        &self,
        address: &str,
        is_contract: bool,
        creator_address: Option<String>,
        creation_tx_hash: Option<String>,
        block_number: u64,
        timestamp: u64,
    ) {
        let job = AccountDiscovered {
            address: address.to_string(),
            is_contract,
            creator_address,
            creation_tx_hash,
            block_number,
            timestamp,
        };
        self.publish(QueueName::AccountDiscovered, &job).await;
    }

    async fn publish_balance_update(&self, address: &str, block_number: u64) {
        match self.ledger.balance_at(address).await {
            Ok(balance) => {
                let job = AccountBalanceUpdate {
                    address: address.to_string(),
                    balance,
                    block_number,
                };
                self.publish(QueueName::AccountBalanceUpdate, &job).await;
            }
            Err(err) => log::warn!("balance_at({address}) failed: {err}"),
        }
    }

    async fn publish_contract_interaction(
        &self,
        event: &TransactionEvent,
        contract_address: &str,
        code: &[u8],
        block_number: u64,
        timestamp: u64,
    ) {
        let _ = code;
        let selector = match self.ledger.transaction_by_hash(&event.hash).await {
            Ok(Some(tx)) => hex::decode(tx.input.trim_start_matches("0x"))
                .ok()
                .and_then(|bytes| method_selector(&bytes)),
            Ok(None) => None,
            Err(err) => {
                log::warn!("transaction_by_hash({}) failed: {err}", event.hash);
                None
            }
        };
        let gas_used = match self.ledger.receipt_by_hash(&event.hash).await {
            Ok(Some(receipt)) => receipt.gas_used,
            Ok(None) => 0,
            Err(err) => {
                log::warn!("receipt_by_hash({}) failed: {err}", event.hash);
                0
            }
        };

        let job = ContractInteractionJob {
            account: event.from.clone(),
            contract_address: contract_address.to_string(),
            transaction_hash: event.hash.clone(),
            method_selector: selector,
            gas_used,
            value: event.value,
            block_number,
            timestamp,
        };
        self.publish(QueueName::ContractInteraction, &job).await;
    }

    async fn classify_smart_account(
        &self,
        contract_address: &str,
        creator_address: &str,
        creation_tx_hash: &str,
        block_number: u64,
    ) {
        let code = match self.ledger.code_at(contract_address).await {
            Ok(code) => code,
            Err(err) => {
                log::warn!("code_at({contract_address}) failed during classification: {err}");
                return;
            }
        };
        let hex_code = besuscan_common::hex_encoding::bytes_to_hex(&code);
        if !hex_code.contains(&SMART_ACCOUNT_SELECTOR[2..]) {
            return;
        }

        let job = SmartAccountProcessing {
            address: contract_address.to_string(),
            creator_address: creator_address.to_string(),
            creation_tx_hash: creation_tx_hash.to_string(),
            factory_address: None,
            implementation_address: None,
            owner_address: None,
            block_number,
        };
        self.publish(QueueName::SmartAccountProcessing, &job).await;
    }

    async fn publish<T: serde::Serialize>(&self, queue: QueueName, job: &T) {
        match serde_json::to_vec(job) {
            Ok(payload) => {
                if let Err(err) = self.broker.publish(queue, &payload).await {
                    log::error!("failed to publish to {queue}: {err}");
                }
            }
            Err(err) => log::error!("failed to encode job for {queue}: {err}"),
        }
    }
}
