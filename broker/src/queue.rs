// Named durable queues. Every queue is declared with the
// same attributes: `durable=true, auto_delete=false, exclusive=false`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueName {
    BlockMined,
    TransactionMined,
    PendingTx,
    BlockProcessed,
    EventDiscovered,
    EventProcessed,
    AccountDiscovered,
    AccountBalanceUpdate,
    SmartAccountProcessing,
    AccountCompliance,
    AccountAnalytics,
    ContractInteraction,
    TokenHoldingUpdate,
    /// The account indexer's own feed of mined transactions. Bound to
    /// the same routing key as `TransactionMined` (see `routing_key`)
    /// so both it and the transaction handler — two independent
    /// consumers in different processes — each get a full copy instead
    /// of competing for the same queue.
    AccountIndexing,
}

impl QueueName {
    pub const ALL: [QueueName; 14] = [
        QueueName::BlockMined,
        QueueName::TransactionMined,
        QueueName::PendingTx,
        QueueName::BlockProcessed,
        QueueName::EventDiscovered,
        QueueName::EventProcessed,
        QueueName::AccountDiscovered,
        QueueName::AccountBalanceUpdate,
        QueueName::SmartAccountProcessing,
        QueueName::AccountCompliance,
        QueueName::AccountAnalytics,
        QueueName::ContractInteraction,
        QueueName::TokenHoldingUpdate,
        QueueName::AccountIndexing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::BlockMined => "block-mined",
            QueueName::TransactionMined => "transaction-mined",
            QueueName::PendingTx => "pending-tx",
            QueueName::BlockProcessed => "block-processed",
            QueueName::EventDiscovered => "event-discovered",
            QueueName::EventProcessed => "event-processed",
            QueueName::AccountDiscovered => "account-discovered",
            QueueName::AccountBalanceUpdate => "account-balance-update",
            QueueName::SmartAccountProcessing => "smart-account-processing",
            QueueName::AccountCompliance => "account-compliance",
            QueueName::AccountAnalytics => "account-analytics",
            QueueName::ContractInteraction => "contract-interaction",
            QueueName::TokenHoldingUpdate => "token-holding-update",
            QueueName::AccountIndexing => "account-indexing",
        }
    }

    /// The topic-exchange routing key this queue is bound with.
    /// Defaults to the queue's own name; queues that should receive an
    /// independent copy of another queue's publishes share that
    /// queue's routing key instead.
    pub fn routing_key(&self) -> &'static str {
        match self {
            QueueName::AccountIndexing => QueueName::TransactionMined.as_str(),
            other => other.as_str(),
        }
    }

    /// Every queue bound to `routing_key` — the fan-out set a publish
    /// on this routing key actually reaches.
    pub fn bound_to(routing_key: &str) -> impl Iterator<Item = QueueName> + '_ {
        QueueName::ALL.into_iter().filter(move |q| q.routing_key() == routing_key)
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_queue_name_is_unique() {
        let mut seen = std::collections::HashSet::new();
        for queue in QueueName::ALL {
            assert!(seen.insert(queue.as_str()), "duplicate queue name {queue}");
        }
    }

    #[test]
    fn transaction_mined_fans_out_to_account_indexing() {
        let bound: Vec<QueueName> = QueueName::bound_to(QueueName::TransactionMined.routing_key()).collect();
        assert!(bound.contains(&QueueName::TransactionMined));
        assert!(bound.contains(&QueueName::AccountIndexing));
        assert_eq!(bound.len(), 2);
    }

    #[test]
    fn unrelated_queues_are_not_fanned_out() {
        let bound: Vec<QueueName> = QueueName::bound_to(QueueName::BlockMined.routing_key()).collect();
        assert_eq!(bound, vec![QueueName::BlockMined]);
    }
}
