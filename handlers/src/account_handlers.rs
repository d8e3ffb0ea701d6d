// Account handlers. One handler per named queue, each
// performing an idempotent upsert through the store. `account-discovered`
// is first-insert-wins: compliance stays `pending` and risk stays 0 on
// every later discovery of the same address.

use std::sync::Arc;

use besuscan_broker::{Broker, QueueName};
use besuscan_common::{
    account::{Account, AccountType},
    jobs::{AccountBalanceUpdate, AccountDiscovered, ContractInteractionJob, SmartAccountProcessing, TokenHoldingUpdate},
};
use besuscan_store::Storage;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

macro_rules! consume_loop {
    ($self:ident, $queue:expr, $cancel:ident, $handle_fn:ident) => {{
        let consumer_tag = besuscan_broker::consumer_tag($queue);
        let mut deliveries = match $self.broker.consume($queue, &consumer_tag).await {
            Ok(stream) => stream,
            Err(err) => {
                log::error!("{} handler failed to open consumer: {err}", $queue);
                return;
            }
        };
        loop {
            tokio::select! {
                _ = $cancel.cancelled() => return,
                next = deliveries.next() => {
                    match next {
                        Some(Ok(delivery)) => $self.$handle_fn(delivery).await,
                        Some(Err(err)) => log::error!("{} consume error: {err}", $queue),
                        None => return,
                    }
                }
            }
        }
    }};
}

pub struct AccountDiscoveredHandler<B: Broker, S: Storage> {
    broker: Arc<B>,
    storage: Arc<S>,
}

impl<B: Broker + 'static, S: Storage + 'static> AccountDiscoveredHandler<B, S> {
    pub fn new(broker: Arc<B>, storage: Arc<S>) -> Self {
        Self { broker, storage }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        consume_loop!(self, QueueName::AccountDiscovered, cancel, handle)
    }

    async fn handle(&self, delivery: Box<dyn besuscan_broker::Delivery>) {
        let job: AccountDiscovered = match serde_json::from_slice(delivery.payload()) {
            Ok(job) => job,
            Err(err) => {
                log::error!("malformed account-discovered payload: {err}");
                let _ = delivery.nack(false).await;
                return;
            }
        };

        let account_type = if job.is_contract {
            AccountType::SmartAccount
        } else {
            AccountType::Eoa
        };
        let mut account = Account::new_discovered(job.address.clone(), account_type, job.timestamp);
        account.creator_address = job.creator_address;
        account.creation_tx_hash = job.creation_tx_hash;

        match self.storage.upsert_discovered(&account).await {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    log::error!("failed to ack account-discovered {}: {err}", job.address);
                }
            }
            Err(err) => {
                log::warn!("failed to upsert discovered account {}: {err}", job.address);
                let _ = delivery.nack(true).await;
            }
        }
    }
}

pub struct AccountBalanceHandler<B: Broker, S: Storage> {
    broker: Arc<B>,
    storage: Arc<S>,
}

impl<B: Broker + 'static, S: Storage + 'static> AccountBalanceHandler<B, S> {
    pub fn new(broker: Arc<B>, storage: Arc<S>) -> Self {
        Self { broker, storage }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        consume_loop!(self, QueueName::AccountBalanceUpdate, cancel, handle)
    }

    async fn handle(&self, delivery: Box<dyn besuscan_broker::Delivery>) {
        let job: AccountBalanceUpdate = match serde_json::from_slice(delivery.payload()) {
            Ok(job) => job,
            Err(err) => {
                log::error!("malformed account-balance-update payload: {err}");
                let _ = delivery.nack(false).await;
                return;
            }
        };

        match self
            .storage
            .update_balance(&job.address, job.balance, job.block_number)
            .await
        {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    log::error!("failed to ack account-balance-update {}: {err}", job.address);
                }
            }
            Err(err) => {
                log::warn!("failed to update balance for {}: {err}", job.address);
                let _ = delivery.nack(true).await;
            }
        }
    }
}

pub struct SmartAccountHandler<B: Broker, S: Storage> {
    broker: Arc<B>,
    storage: Arc<S>,
}

impl<B: Broker + 'static, S: Storage + 'static> SmartAccountHandler<B, S> {
    pub fn new(broker: Arc<B>, storage: Arc<S>) -> Self {
        Self { broker, storage }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        consume_loop!(self, QueueName::SmartAccountProcessing, cancel, handle)
    }

    async fn handle(&self, delivery: Box<dyn besuscan_broker::Delivery>) {
        let job: SmartAccountProcessing = match serde_json::from_slice(delivery.payload()) {
            Ok(job) => job,
            Err(err) => {
                log::error!("malformed smart-account-processing payload: {err}");
                let _ = delivery.nack(false).await;
                return;
            }
        };

        match self
            .storage
            .update_contract_shape(
                &job.address,
                job.factory_address.as_deref(),
                job.implementation_address.as_deref(),
                job.owner_address.as_deref(),
            )
            .await
        {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    log::error!("failed to ack smart-account-processing {}: {err}", job.address);
                }
            }
            Err(err) => {
                log::warn!("failed to update contract shape for {}: {err}", job.address);
                let _ = delivery.nack(true).await;
            }
        }
    }
}

pub struct ContractInteractionHandler<B: Broker, S: Storage> {
    broker: Arc<B>,
    storage: Arc<S>,
}

impl<B: Broker + 'static, S: Storage + 'static> ContractInteractionHandler<B, S> {
    pub fn new(broker: Arc<B>, storage: Arc<S>) -> Self {
        Self { broker, storage }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        consume_loop!(self, QueueName::ContractInteraction, cancel, handle)
    }

    async fn handle(&self, delivery: Box<dyn besuscan_broker::Delivery>) {
        let job: ContractInteractionJob = match serde_json::from_slice(delivery.payload()) {
            Ok(job) => job,
            Err(err) => {
                log::error!("malformed contract-interaction payload: {err}");
                let _ = delivery.nack(false).await;
                return;
            }
        };

        let interaction = besuscan_common::account::ContractInteraction {
            account: job.account.clone(),
            contract_address: job.contract_address.clone(),
            transaction_hash: job.transaction_hash.clone(),
            method_selector: job.method_selector,
            gas_used: job.gas_used,
            value: job.value,
            block_number: job.block_number,
            timestamp: job.timestamp,
        };

        match self.storage.upsert(&interaction).await {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    log::error!(
                        "failed to ack contract-interaction {}/{}: {err}",
                        job.account,
                        job.contract_address
                    );
                }
            }
            Err(err) => {
                log::warn!("failed to upsert contract interaction: {err}");
                let _ = delivery.nack(true).await;
            }
        }
    }
}

pub struct TokenHoldingHandler<B: Broker, S: Storage> {
    broker: Arc<B>,
    storage: Arc<S>,
}

impl<B: Broker + 'static, S: Storage + 'static> TokenHoldingHandler<B, S> {
    pub fn new(broker: Arc<B>, storage: Arc<S>) -> Self {
        Self { broker, storage }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        consume_loop!(self, QueueName::TokenHoldingUpdate, cancel, handle)
    }

    async fn handle(&self, delivery: Box<dyn besuscan_broker::Delivery>) {
        let job: TokenHoldingUpdate = match serde_json::from_slice(delivery.payload()) {
            Ok(job) => job,
            Err(err) => {
                log::error!("malformed token-holding-update payload: {err}");
                let _ = delivery.nack(false).await;
                return;
            }
        };

        match self
            .storage
            .upsert_balance(&job.account, &job.token_address, job.balance, job.block_number)
            .await
        {
            Ok(()) => {
                if let Err(err) = delivery.ack().await {
                    log::error!("failed to ack token-holding-update {}: {err}", job.account);
                }
            }
            Err(err) => {
                log::warn!("failed to upsert token holding for {}: {err}", job.account);
                let _ = delivery.nack(true).await;
            }
        }
    }
}
