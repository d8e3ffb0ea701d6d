// Composed storage trait: a `Storage` implementor is anything that
// satisfies every per-entity provider bound below plus `Sync + Send +
// 'static`, so a single `PgStorage` can stand in for all of them.

use crate::providers::{
    AccountAnalyticsProvider, AccountProvider, AccountTagProvider, BlockProvider,
    ContractInteractionProvider, EventProvider, TokenHoldingProvider, TransactionProvider,
    ValidatorProvider,
};

pub trait Storage:
    BlockProvider
    + TransactionProvider
    + EventProvider
    + AccountProvider
    + AccountTagProvider
    + AccountAnalyticsProvider
    + ContractInteractionProvider
    + TokenHoldingProvider
    + ValidatorProvider
    + Sync
    + Send
    + 'static
{
}

impl<T> Storage for T where
    T: BlockProvider
        + TransactionProvider
        + EventProvider
        + AccountProvider
        + AccountTagProvider
        + AccountAnalyticsProvider
        + ContractInteractionProvider
        + TokenHoldingProvider
        + ValidatorProvider
        + Sync
        + Send
        + 'static
{
}
