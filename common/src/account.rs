// Account and ancillary entities. `Account` is keyed by
// address; the ancillary entities each carry their own natural key.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::time::TimestampSeconds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Eoa,
    SmartAccount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Pending,
    UnderReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Risk-level bucket derived from the numeric risk score. 0-3 low, 4-6 medium, 7-10 high.
pub fn risk_level(score: u8) -> RiskLevel {
    match score {
        0..=3 => RiskLevel::Low,
        4..=6 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    pub account_type: AccountType,
    pub balance: U256,
    pub nonce: u64,
    pub tx_count: u64,
    pub contract_code: Option<String>,
    pub creator_address: Option<String>,
    pub creation_tx_hash: Option<String>,
    pub first_seen: TimestampSeconds,
    pub last_activity: TimestampSeconds,
    pub compliance_status: ComplianceStatus,
    pub risk_score: u8,
    pub label: Option<String>,
    pub description: Option<String>,
    pub factory_address: Option<String>,
    pub implementation_address: Option<String>,
    pub owner_address: Option<String>,
}

impl Account {
    /// `IsContract` iff code length > 0.
    pub fn is_contract(&self) -> bool {
        self.contract_code
            .as_deref()
            .map(|code| !code.is_empty() && code != "0x")
            .unwrap_or(false)
    }

    pub fn risk_level(&self) -> RiskLevel {
        risk_level(self.risk_score)
    }

    /// A freshly discovered account: compliance pending, risk score
    /// zero, untouched until a later pass updates them.
    pub fn new_discovered(address: String, account_type: AccountType, now: TimestampSeconds) -> Self {
        Self {
            address,
            account_type,
            balance: U256::zero(),
            nonce: 0,
            tx_count: 0,
            contract_code: None,
            creator_address: None,
            creation_tx_hash: None,
            first_seen: now,
            last_activity: now,
            compliance_status: ComplianceStatus::Pending,
            risk_score: 0,
            label: None,
            description: None,
            factory_address: None,
            implementation_address: None,
            owner_address: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTag {
    pub address: String,
    pub tag: String,
    pub value: Option<String>,
    pub creator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAnalytics {
    pub address: String,
    pub day: String,
    pub tx_count: u64,
    pub gas_used: u64,
    pub value_transferred: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractInteraction {
    pub account: String,
    pub contract_address: String,
    pub transaction_hash: String,
    pub method_selector: Option<String>,
    pub gas_used: u64,
    pub value: U256,
    pub block_number: u64,
    pub timestamp: TimestampSeconds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHolding {
    pub account: String,
    pub token_address: String,
    pub balance: U256,
    pub last_updated_block: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_buckets_score() {
        assert_eq!(risk_level(0), RiskLevel::Low);
        assert_eq!(risk_level(3), RiskLevel::Low);
        assert_eq!(risk_level(4), RiskLevel::Medium);
        assert_eq!(risk_level(6), RiskLevel::Medium);
        assert_eq!(risk_level(7), RiskLevel::High);
        assert_eq!(risk_level(10), RiskLevel::High);
    }

    #[test]
    fn is_contract_requires_nonempty_code() {
        let mut account = Account::new_discovered("0xabc".into(), AccountType::Eoa, 0);
        assert!(!account.is_contract());
        account.contract_code = Some("0x".into());
        assert!(!account.is_contract());
        account.contract_code = Some("0x6001".into());
        assert!(account.is_contract());
    }

    #[test]
    fn new_discovered_starts_pending_with_zero_risk() {
        let account = Account::new_discovered("0xabc".into(), AccountType::SmartAccount, 100);
        assert_eq!(account.compliance_status, ComplianceStatus::Pending);
        assert_eq!(account.risk_score, 0);
        assert_eq!(account.first_seen, 100);
    }
}
