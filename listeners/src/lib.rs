pub mod abi_resolver;
pub mod account_indexer;
pub mod block_listener;
pub mod event_log_listener;
pub mod mempool_listener;
pub mod transaction_extractor;

pub use abi_resolver::AbiResolver;
pub use account_indexer::AccountIndexer;
pub use block_listener::BlockListener;
pub use event_log_listener::EventLogListener;
pub use mempool_listener::MempoolListener;
pub use transaction_extractor::TransactionExtractor;
