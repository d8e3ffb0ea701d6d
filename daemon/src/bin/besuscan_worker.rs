// `besuscan-worker` binary (SPEC_FULL.md §8): starts every consumer —
// block/transaction/event/account*/validator handlers — sharing one
// storage pool, one cache connection, and one broker connection, plus
// the Prometheus `/metrics` endpoint.

use std::sync::Arc;

use besuscan_common::config::Config;
use besuscan_daemon::{cli::WorkerArgs, logger, shutdown::run_until_shutdown};
use besuscan_handlers::{
    AccountBalanceHandler, AccountDiscoveredHandler, BlockHandler, ContractInteractionHandler, EventHandler,
    SmartAccountHandler, TokenHoldingHandler, TransactionHandler, ValidatorHandler,
};
use besuscan_ledger::AlloyLedgerClient;
use besuscan_store::PgStorage;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = WorkerArgs::parse();
    logger::init(
        args.log.log_level,
        std::path::Path::new(&args.log.log_dir),
        args.log.disable_log_color,
        args.log.disable_file_logging,
    )?;

    let config = Config::from_env()?;
    log::info!("besuscan-worker starting, chain id {}", config.chain_id);

    let metrics_addr: std::net::SocketAddr = args.metrics_bind_address.parse()?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()?;
    log::info!("metrics endpoint listening on {metrics_addr}");

    let ledger = Arc::new(
        AlloyLedgerClient::connect(&config.eth_rpc_url, config.eth_ws_url.as_deref(), config.chain_id).await?,
    );
    let broker = Arc::new(
        besuscan_broker::LapinBroker::connect(&config.rabbitmq_url, config.rabbitmq_exchange.clone()).await?,
    );
    let cache = Arc::new(besuscan_cache::RedisCachePolicy::connect(&config.redis_url).await?);
    let storage = Arc::new(PgStorage::connect(&config.database_url).await?);
    storage.migrate().await?;

    let cancel = CancellationToken::new();

    let block_handler = Arc::new(BlockHandler::new(ledger.clone(), broker.clone(), storage.clone(), cache.clone()));
    let transaction_handler = Arc::new(TransactionHandler::new(
        ledger.clone(),
        broker.clone(),
        storage.clone(),
        cache.clone(),
    ));
    let event_handler = Arc::new(EventHandler::new(broker.clone(), storage.clone()));
    let account_discovered = Arc::new(AccountDiscoveredHandler::new(broker.clone(), storage.clone()));
    let account_balance = Arc::new(AccountBalanceHandler::new(broker.clone(), storage.clone()));
    let smart_account = Arc::new(SmartAccountHandler::new(broker.clone(), storage.clone()));
    let contract_interaction = Arc::new(ContractInteractionHandler::new(broker.clone(), storage.clone()));
    let token_holding = Arc::new(TokenHoldingHandler::new(broker.clone(), storage.clone()));
    let validator_handler = Arc::new(ValidatorHandler::new(ledger.clone(), storage.clone()));

    let tasks = vec![
        spawn_task("block-handler", cancel.clone(), move |c| {
            let handler = block_handler.clone();
            async move { handler.run(c).await }
        }),
        spawn_task("transaction-handler", cancel.clone(), move |c| {
            let handler = transaction_handler.clone();
            async move { handler.run(c).await }
        }),
        spawn_task("event-handler", cancel.clone(), move |c| {
            let handler = event_handler.clone();
            async move { handler.run(c).await }
        }),
        spawn_task("account-discovered-handler", cancel.clone(), move |c| {
            let handler = account_discovered.clone();
            async move { handler.run(c).await }
        }),
        spawn_task("account-balance-handler", cancel.clone(), move |c| {
            let handler = account_balance.clone();
            async move { handler.run(c).await }
        }),
        spawn_task("smart-account-handler", cancel.clone(), move |c| {
            let handler = smart_account.clone();
            async move { handler.run(c).await }
        }),
        spawn_task("contract-interaction-handler", cancel.clone(), move |c| {
            let handler = contract_interaction.clone();
            async move { handler.run(c).await }
        }),
        spawn_task("token-holding-handler", cancel.clone(), move |c| {
            let handler = token_holding.clone();
            async move { handler.run(c).await }
        }),
        spawn_task("validator-handler", cancel.clone(), move |c| {
            let handler = validator_handler.clone();
            async move { handler.run(c).await }
        }),
    ];

    run_until_shutdown(tasks, cancel).await;
    Ok(())
}

fn spawn_task<F, Fut>(name: &'static str, cancel: CancellationToken, f: F) -> tokio::task::JoinHandle<()>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        log::info!("{name} started");
        f(cancel).await;
        log::info!("{name} stopped");
    })
}
