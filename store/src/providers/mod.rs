pub mod account;
pub mod account_analytics;
pub mod account_tag;
pub mod block;
pub mod contract_interaction;
pub mod event;
pub mod token_holding;
pub mod transaction;
pub mod validator;

pub use account::AccountProvider;
pub use account_analytics::AccountAnalyticsProvider;
pub use account_tag::AccountTagProvider;
pub use block::BlockProvider;
pub use contract_interaction::ContractInteractionProvider;
pub use event::EventProvider;
pub use token_holding::TokenHoldingProvider;
pub use transaction::TransactionProvider;
pub use validator::ValidatorProvider;
