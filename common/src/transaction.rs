// Transaction domain record. Keyed by `hash`.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::time::TimestampSeconds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    /// Status progression invariant : once a transaction leaves
    /// `Pending` it never returns to it.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        match self {
            TransactionStatus::Pending => true,
            TransactionStatus::Success | TransactionStatus::Failed => {
                next != TransactionStatus::Pending
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Legacy,
    Eip2930,
    Eip1559,
}

/// A transaction's block coordinates — present for every status except
/// `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCoordinates {
    pub block_number: u64,
    pub block_hash: String,
    pub transaction_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub status: TransactionStatus,
    pub coordinates: Option<BlockCoordinates>,
    pub from: String,
    pub to: Option<String>,
    pub value: U256,
    pub gas: u64,
    pub gas_used: Option<u64>,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub nonce: u64,
    pub data: String,
    pub tx_type: TransactionType,
    pub method: Option<String>,
    pub contract_address: Option<String>,
    pub mined_at: Option<TimestampSeconds>,
}

impl Transaction {
    /// Invariant check: a pending transaction has no block coordinates;
    /// any other status has coordinates and `mined_at` set.
    pub fn is_well_formed(&self) -> bool {
        match self.status {
            TransactionStatus::Pending => self.coordinates.is_none() && self.mined_at.is_none(),
            TransactionStatus::Success | TransactionStatus::Failed => {
                self.coordinates.is_some() && self.mined_at.is_some()
            }
        }
    }

    /// A compact copy suitable for the `recent_transactions` cache list.
    pub fn summary(&self) -> TransactionSummary {
        TransactionSummary {
            hash: self.hash.clone(),
            status: self.status,
            from: self.from.clone(),
            to: self.to.clone(),
            value: self.value,
            block_number: self.coordinates.as_ref().map(|c| c.block_number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub hash: String,
    pub status: TransactionStatus,
    pub from: String,
    pub to: Option<String>,
    pub value: U256,
    pub block_number: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_transition_to_success_or_failed() {
        assert!(TransactionStatus::Pending.can_transition_to(TransactionStatus::Success));
        assert!(TransactionStatus::Pending.can_transition_to(TransactionStatus::Failed));
    }

    #[test]
    fn success_never_returns_to_pending() {
        assert!(!TransactionStatus::Success.can_transition_to(TransactionStatus::Pending));
        assert!(!TransactionStatus::Failed.can_transition_to(TransactionStatus::Pending));
    }

    #[test]
    fn pending_transaction_without_coordinates_is_well_formed() {
        let tx = Transaction {
            hash: "0xabc".into(),
            status: TransactionStatus::Pending,
            coordinates: None,
            from: "0xfrom".into(),
            to: Some("0xto".into()),
            value: U256::zero(),
            gas: 21_000,
            gas_used: None,
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            nonce: 0,
            data: "0x".into(),
            tx_type: TransactionType::Eip1559,
            method: None,
            contract_address: None,
            mined_at: None,
        };
        assert!(tx.is_well_formed());
    }

    #[test]
    fn mined_transaction_without_coordinates_is_malformed() {
        let mut tx = Transaction {
            hash: "0xabc".into(),
            status: TransactionStatus::Success,
            coordinates: None,
            from: "0xfrom".into(),
            to: Some("0xto".into()),
            value: U256::zero(),
            gas: 21_000,
            gas_used: Some(21_000),
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            nonce: 0,
            data: "0x".into(),
            tx_type: TransactionType::Eip1559,
            method: None,
            contract_address: None,
            mined_at: None,
        };
        assert!(!tx.is_well_formed());
        tx.mined_at = Some(1);
        tx.coordinates = Some(BlockCoordinates {
            block_number: 1,
            block_hash: "0xh".into(),
            transaction_index: 0,
        });
        assert!(tx.is_well_formed());
    }
}
