// `besuscan-listener` binary (SPEC_FULL.md §8): starts every producer
// task — block listener, mempool listener, event-log listener,
// transaction extractor, account indexer — sharing one ledger
// connection and one broker connection.

use std::sync::Arc;

use besuscan_common::config::{Config, ABI_RESOLUTION_TIMEOUT};
use besuscan_daemon::{cli::ListenerArgs, logger, shutdown::run_until_shutdown};
use besuscan_ledger::AlloyLedgerClient;
use besuscan_listeners::{AbiResolver, AccountIndexer, BlockListener, EventLogListener, MempoolListener, TransactionExtractor};
use clap::Parser;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = ListenerArgs::parse();
    logger::init(
        args.log.log_level,
        std::path::Path::new(&args.log.log_dir),
        args.log.disable_log_color,
        args.log.disable_file_logging,
    )?;

    let config = Config::from_env()?;
    log::info!("besuscan-listener starting, chain id {}", config.chain_id);

    let ledger = Arc::new(
        AlloyLedgerClient::connect(&config.eth_rpc_url, config.eth_ws_url.as_deref(), config.chain_id).await?,
    );
    let broker = Arc::new(
        besuscan_broker::LapinBroker::connect(&config.rabbitmq_url, config.rabbitmq_exchange.clone()).await?,
    );
    let abi_resolver = Arc::new(AbiResolver::new(config.api_base_url.clone(), ABI_RESOLUTION_TIMEOUT));

    let cancel = CancellationToken::new();

    let block_listener = Arc::new(BlockListener::new(ledger.clone(), broker.clone(), config.starting_block));
    let mempool_listener = Arc::new(MempoolListener::new(ledger.clone(), broker.clone()));
    let event_log_listener = Arc::new(EventLogListener::new(
        ledger.clone(),
        broker.clone(),
        abi_resolver,
        config.monitored_contracts.clone(),
        config.starting_block,
    ));
    let transaction_extractor = Arc::new(TransactionExtractor::new(ledger.clone(), broker.clone(), config.chain_id));
    let account_indexer = Arc::new(AccountIndexer::new(ledger.clone(), broker.clone()));

    let tasks = vec![
        spawn_task("block-listener", cancel.clone(), move |c| {
            let listener = block_listener.clone();
            async move { listener.run(c).await }
        }),
        spawn_task("mempool-listener", cancel.clone(), move |c| {
            let listener = mempool_listener.clone();
            async move { listener.run(c).await }
        }),
        spawn_task("event-log-listener", cancel.clone(), move |c| {
            let listener = event_log_listener.clone();
            async move { listener.run(c).await }
        }),
        spawn_task("transaction-extractor", cancel.clone(), move |c| {
            let extractor = transaction_extractor.clone();
            async move { extractor.run(c).await }
        }),
        spawn_task("account-indexer", cancel.clone(), move |c| {
            let indexer = account_indexer.clone();
            async move { indexer.run(c).await }
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
