pub mod account_handlers;
pub mod block_handler;
pub mod event_handler;
pub mod transaction_handler;
pub mod validator_handler;

pub use account_handlers::{
    AccountBalanceHandler, AccountDiscoveredHandler, ContractInteractionHandler, SmartAccountHandler,
    TokenHoldingHandler,
};
pub use block_handler::BlockHandler;
pub use event_handler::EventHandler;
pub use transaction_handler::TransactionHandler;
pub use validator_handler::ValidatorHandler;
