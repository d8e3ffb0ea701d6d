// Postgres-backed implementation of every `*Provider` trait, composed
// into `Storage`. Every batch operation runs inside one
// `sqlx::Transaction` per flush.

use std::collections::BTreeMap;

use async_trait::async_trait;
use besuscan_common::{
    account::{
        Account, AccountAnalytics, AccountTag, AccountType, ComplianceStatus, ContractInteraction,
        TokenHolding,
    },
    block::{Block, BlockSummary},
    event::Event,
    transaction::{BlockCoordinates, Transaction, TransactionStatus, TransactionType},
    validator::{Validator, ValidatorStatus},
};
use primitive_types::U256;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::{
    error::StoreError,
    providers::{
        AccountAnalyticsProvider, AccountProvider, AccountTagProvider, BlockProvider,
        ContractInteractionProvider, EventProvider, TokenHoldingProvider, TransactionProvider,
        ValidatorProvider,
    },
};

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Runs `store/migrations/` at startup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn u256_to_text(value: U256) -> String {
    value.to_string()
}

fn text_to_u256(text: &str) -> U256 {
    U256::from_dec_str(text).unwrap_or_default()
}

fn opt_u256_to_text(value: Option<U256>) -> Option<String> {
    value.map(u256_to_text)
}

fn status_to_text(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Pending => "pending",
        TransactionStatus::Success => "success",
        TransactionStatus::Failed => "failed",
    }
}

fn text_to_status(text: &str) -> TransactionStatus {
    match text {
        "success" => TransactionStatus::Success,
        "failed" => TransactionStatus::Failed,
        _ => TransactionStatus::Pending,
    }
}

fn tx_type_to_text(tx_type: TransactionType) -> &'static str {
    match tx_type {
        TransactionType::Legacy => "legacy",
        TransactionType::Eip2930 => "eip2930",
        TransactionType::Eip1559 => "eip1559",
    }
}

fn text_to_tx_type(text: &str) -> TransactionType {
    match text {
        "eip2930" => TransactionType::Eip2930,
        "eip1559" => TransactionType::Eip1559,
        _ => TransactionType::Legacy,
    }
}

#[async_trait]
impl BlockProvider for PgStorage {
    async fn check_exists_batch(&self, hashes: &[String]) -> Result<Vec<String>, StoreError> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT hash FROM blocks WHERE hash = ANY($1)")
            .bind(hashes)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("hash")).collect())
    }

    async fn save_batch(&self, blocks: &[Block]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0u64;
        for block in blocks {
            let result = sqlx::query(
                r#"
                INSERT INTO blocks (
                    number, hash, parent_hash, timestamp, miner, difficulty, size,
                    gas_limit, gas_used, base_fee, tx_count, uncle_count, bloom,
                    extra_data, mix_digest, nonce, receipts_root, state_root, tx_root
                ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)
                ON CONFLICT (number) DO NOTHING
                "#,
            )
            .bind(block.number as i64)
            .bind(&block.hash)
            .bind(&block.parent_hash)
            .bind(block.timestamp as i64)
            .bind(&block.miner)
            .bind(u256_to_text(block.difficulty))
            .bind(block.size as i64)
            .bind(block.gas_limit as i64)
            .bind(block.gas_used as i64)
            .bind(opt_u256_to_text(block.base_fee))
            .bind(block.tx_count as i32)
            .bind(block.uncle_count as i32)
            .bind(&block.bloom)
            .bind(&block.extra_data)
            .bind(&block.mix_digest)
            .bind(&block.nonce)
            .bind(&block.receipts_root)
            .bind(&block.state_root)
            .bind(&block.tx_root)
            .execute(&mut *tx)
            .await?;
            affected += result.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }

    async fn update_batch(&self, blocks: &[Block]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0u64;
        for block in blocks {
            let result = sqlx::query(
                r#"
                UPDATE blocks SET
                    hash = $2, parent_hash = $3, timestamp = $4, miner = $5,
                    difficulty = $6, size = $7, gas_limit = $8, gas_used = $9,
                    base_fee = $10, tx_count = $11, uncle_count = $12, bloom = $13,
                    extra_data = $14, mix_digest = $15, nonce = $16, receipts_root = $17,
                    state_root = $18, tx_root = $19
                WHERE number = $1
                "#,
            )
            .bind(block.number as i64)
            .bind(&block.hash)
            .bind(&block.parent_hash)
            .bind(block.timestamp as i64)
            .bind(&block.miner)
            .bind(u256_to_text(block.difficulty))
            .bind(block.size as i64)
            .bind(block.gas_limit as i64)
            .bind(block.gas_used as i64)
            .bind(opt_u256_to_text(block.base_fee))
            .bind(block.tx_count as i32)
            .bind(block.uncle_count as i32)
            .bind(&block.bloom)
            .bind(&block.extra_data)
            .bind(&block.mix_digest)
            .bind(&block.nonce)
            .bind(&block.receipts_root)
            .bind(&block.state_root)
            .bind(&block.tx_root)
            .execute(&mut *tx)
            .await?;
            affected += result.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }

    async fn get_by_hash(&self, hash: &str) -> Result<Option<Block>, StoreError> {
        let row = sqlx::query("SELECT * FROM blocks WHERE hash = $1 AND deleted_at IS NULL")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| block_from_row(&r)))
    }

    async fn get_by_number(&self, number: u64) -> Result<Option<Block>, StoreError> {
        let row = sqlx::query("SELECT * FROM blocks WHERE number = $1 AND deleted_at IS NULL")
            .bind(number as i64)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| block_from_row(&r)))
    }

    async fn find_by_range(&self, from: u64, to: u64) -> Result<Vec<Block>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM blocks WHERE number >= $1 AND number <= $2 AND deleted_at IS NULL ORDER BY number",
        )
        .bind(from as i64)
        .bind(to as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(block_from_row).collect())
    }

    async fn latest(&self) -> Result<Option<BlockSummary>, StoreError> {
        let row = sqlx::query(
            "SELECT number, hash, timestamp, miner, tx_count, gas_used FROM blocks WHERE deleted_at IS NULL ORDER BY number DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| BlockSummary {
            number: r.get::<i64, _>("number") as u64,
            hash: r.get("hash"),
            timestamp: r.get::<i64, _>("timestamp") as u64,
            miner: r.get("miner"),
            tx_count: r.get::<i32, _>("tx_count") as u32,
            gas_used: r.get::<i64, _>("gas_used") as u64,
        }))
    }

    async fn soft_delete(&self, hash: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE blocks SET deleted_at = $2 WHERE hash = $1")
            .bind(hash)
            .bind(besuscan_common::time::now_seconds() as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn block_from_row(row: &sqlx::postgres::PgRow) -> Block {
    Block {
        number: row.get::<i64, _>("number") as u64,
        hash: row.get("hash"),
        parent_hash: row.get("parent_hash"),
        timestamp: row.get::<i64, _>("timestamp") as u64,
        miner: row.get("miner"),
        difficulty: text_to_u256(&row.get::<String, _>("difficulty")),
        size: row.get::<i64, _>("size") as u64,
        gas_limit: row.get::<i64, _>("gas_limit") as u64,
        gas_used: row.get::<i64, _>("gas_used") as u64,
        base_fee: row.get::<Option<String>, _>("base_fee").map(|s| text_to_u256(&s)),
        tx_count: row.get::<i32, _>("tx_count") as u32,
        uncle_count: row.get::<i32, _>("uncle_count") as u32,
        bloom: row.get("bloom"),
        extra_data: row.get("extra_data"),
        mix_digest: row.get("mix_digest"),
        nonce: row.get("nonce"),
        receipts_root: row.get("receipts_root"),
        state_root: row.get("state_root"),
        tx_root: row.get("tx_root"),
        deleted_at: row.get::<Option<i64>, _>("deleted_at").map(|v| v as u64),
    }
}

#[async_trait]
impl TransactionProvider for PgStorage {
    async fn upsert(&self, tx: &Transaction) -> Result<(), StoreError> {
        let (block_number, block_hash, transaction_index) = match &tx.coordinates {
            Some(coords) => (
                Some(coords.block_number as i64),
                Some(coords.block_hash.clone()),
                Some(coords.transaction_index as i32),
            ),
            None => (None, None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO transactions (
                hash, status, block_number, block_hash, transaction_index, "from", "to",
                value, gas, gas_used, gas_price, max_fee_per_gas, max_priority_fee_per_gas,
                nonce, data, tx_type, method, contract_address, mined_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)
            ON CONFLICT (hash) DO UPDATE SET
                status = CASE
                    WHEN transactions.status IN ('success', 'failed') AND EXCLUDED.status = 'pending'
                        THEN transactions.status
                    ELSE EXCLUDED.status
                END,
                block_number = COALESCE(EXCLUDED.block_number, transactions.block_number),
                block_hash = COALESCE(EXCLUDED.block_hash, transactions.block_hash),
                transaction_index = COALESCE(EXCLUDED.transaction_index, transactions.transaction_index),
                gas_used = COALESCE(EXCLUDED.gas_used, transactions.gas_used),
                method = COALESCE(EXCLUDED.method, transactions.method),
                contract_address = COALESCE(EXCLUDED.contract_address, transactions.contract_address),
                mined_at = COALESCE(EXCLUDED.mined_at, transactions.mined_at)
            "#,
        )
        .bind(&tx.hash)
        .bind(status_to_text(tx.status))
        .bind(block_number)
        .bind(block_hash)
        .bind(transaction_index)
        .bind(&tx.from)
        .bind(&tx.to)
        .bind(u256_to_text(tx.value))
        .bind(tx.gas as i64)
        .bind(tx.gas_used.map(|v| v as i64))
        .bind(opt_u256_to_text(tx.gas_price))
        .bind(opt_u256_to_text(tx.max_fee_per_gas))
        .bind(opt_u256_to_text(tx.max_priority_fee_per_gas))
        .bind(tx.nonce as i64)
        .bind(&tx.data)
        .bind(tx_type_to_text(tx.tx_type))
        .bind(&tx.method)
        .bind(&tx.contract_address)
        .bind(tx.mined_at.map(|v| v as i64))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_hash(&self, hash: &str) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query("SELECT * FROM transactions WHERE hash = $1")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| transaction_from_row(&r)))
    }

    async fn find_by_block(&self, block_hash: &str) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query("SELECT * FROM transactions WHERE block_hash = $1 ORDER BY transaction_index")
            .bind(block_hash)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(transaction_from_row).collect())
    }

    async fn count_by_block(&self, block_hash: &str) -> Result<u32, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM transactions WHERE block_hash = $1")
            .bind(block_hash)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count") as u32)
    }
}

fn transaction_from_row(row: &sqlx::postgres::PgRow) -> Transaction {
    let block_number = row.get::<Option<i64>, _>("block_number");
    let block_hash = row.get::<Option<String>, _>("block_hash");
    let transaction_index = row.get::<Option<i32>, _>("transaction_index");
    let coordinates = match (block_number, block_hash, transaction_index) {
        (Some(number), Some(hash), Some(index)) => Some(BlockCoordinates {
            block_number: number as u64,
            block_hash: hash,
            transaction_index: index as u32,
        }),
        _ => None,
    };

    Transaction {
        hash: row.get("hash"),
        status: text_to_status(&row.get::<String, _>("status")),
        coordinates,
        from: row.get("from"),
        to: row.get("to"),
        value: text_to_u256(&row.get::<String, _>("value")),
        gas: row.get::<i64, _>("gas") as u64,
        gas_used: row.get::<Option<i64>, _>("gas_used").map(|v| v as u64),
        gas_price: row.get::<Option<String>, _>("gas_price").map(|s| text_to_u256(&s)),
        max_fee_per_gas: row
            .get::<Option<String>, _>("max_fee_per_gas")
            .map(|s| text_to_u256(&s)),
        max_priority_fee_per_gas: row
            .get::<Option<String>, _>("max_priority_fee_per_gas")
            .map(|s| text_to_u256(&s)),
        nonce: row.get::<i64, _>("nonce") as u64,
        data: row.get("data"),
        tx_type: text_to_tx_type(&row.get::<String, _>("tx_type")),
        method: row.get("method"),
        contract_address: row.get("contract_address"),
        mined_at: row.get::<Option<i64>, _>("mined_at").map(|v| v as u64),
    }
}

#[async_trait]
impl EventProvider for PgStorage {
    async fn upsert(&self, event: &Event) -> Result<(), StoreError> {
        let topics_json = serde_json::to_value(&event.topics).unwrap_or_default();
        let decoded_json = serde_json::to_value(&event.decoded_data).unwrap_or_default();

        sqlx::query(
            r#"
            INSERT INTO events (
                transaction_hash, log_index, contract_address, block_number, block_hash,
                topics, data, event_name, event_signature, decoded_data, removed, timestamp
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
            ON CONFLICT (transaction_hash, log_index) DO UPDATE SET
                event_name = EXCLUDED.event_name,
                event_signature = EXCLUDED.event_signature,
                decoded_data = EXCLUDED.decoded_data,
                removed = EXCLUDED.removed
            "#,
        )
        .bind(&event.transaction_hash)
        .bind(event.log_index as i32)
        .bind(&event.contract_address)
        .bind(event.block_number as i64)
        .bind(&event.block_hash)
        .bind(topics_json)
        .bind(&event.data)
        .bind(&event.event_name)
        .bind(&event.event_signature)
        .bind(decoded_json)
        .bind(event.removed)
        .bind(event.timestamp as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, transaction_hash: &str, log_index: u32) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query("SELECT * FROM events WHERE transaction_hash = $1 AND log_index = $2")
            .bind(transaction_hash)
            .bind(log_index as i32)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| event_from_row(&r)))
    }

    async fn find_by_contract(&self, contract_address: &str) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query("SELECT * FROM events WHERE contract_address = $1 ORDER BY block_number, log_index")
            .bind(contract_address)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(event_from_row).collect())
    }

    async fn find_by_transaction(&self, transaction_hash: &str) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query("SELECT * FROM events WHERE transaction_hash = $1 ORDER BY log_index")
            .bind(transaction_hash)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(event_from_row).collect())
    }
}

fn event_from_row(row: &sqlx::postgres::PgRow) -> Event {
    let topics: Vec<String> = row
        .get::<serde_json::Value, _>("topics")
        .as_array()
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let decoded_data: BTreeMap<String, serde_json::Value> = row
        .get::<serde_json::Value, _>("decoded_data")
        .as_object()
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    Event {
        transaction_hash: row.get("transaction_hash"),
        log_index: row.get::<i32, _>("log_index") as u32,
        contract_address: row.get("contract_address"),
        block_number: row.get::<i64, _>("block_number") as u64,
        block_hash: row.get("block_hash"),
        topics,
        data: row.get("data"),
        event_name: row.get("event_name"),
        event_signature: row.get("event_signature"),
        decoded_data,
        removed: row.get("removed"),
        timestamp: row.get::<i64, _>("timestamp") as u64,
    }
}

#[async_trait]
impl AccountProvider for PgStorage {
    async fn upsert_discovered(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                address, account_type, balance, nonce, tx_count, contract_code,
                creator_address, creation_tx_hash, first_seen, last_activity,
                compliance_status, risk_score, label, description,
                factory_address, implementation_address, owner_address
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)
            ON CONFLICT (address) DO UPDATE SET
                last_activity = EXCLUDED.last_activity,
                contract_code = COALESCE(accounts.contract_code, EXCLUDED.contract_code)
            "#,
        )
        .bind(&account.address)
        .bind(account_type_to_text(account.account_type))
        .bind(u256_to_text(account.balance))
        .bind(account.nonce as i64)
        .bind(account.tx_count as i64)
        .bind(&account.contract_code)
        .bind(&account.creator_address)
        .bind(&account.creation_tx_hash)
        .bind(account.first_seen as i64)
        .bind(account.last_activity as i64)
        .bind(compliance_to_text(account.compliance_status))
        .bind(account.risk_score as i16)
        .bind(&account.label)
        .bind(&account.description)
        .bind(&account.factory_address)
        .bind(&account.implementation_address)
        .bind(&account.owner_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_balance(&self, address: &str, balance: U256, block_number: u64) -> Result<(), StoreError> {
        let _ = block_number;
        sqlx::query("UPDATE accounts SET balance = $2, last_activity = $3 WHERE address = $1")
            .bind(address)
            .bind(u256_to_text(balance))
            .bind(besuscan_common::time::now_seconds() as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_contract_shape(
        &self,
        address: &str,
        factory_address: Option<&str>,
        implementation_address: Option<&str>,
        owner_address: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE accounts SET factory_address = $2, implementation_address = $3, owner_address = $4 WHERE address = $1",
        )
        .bind(address)
        .bind(factory_address)
        .bind(implementation_address)
        .bind(owner_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn bump_tx_count(&self, address: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE accounts SET tx_count = tx_count + 1, last_activity = $2 WHERE address = $1")
            .bind(address)
            .bind(besuscan_common::time::now_seconds() as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_by_address(&self, address: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT * FROM accounts WHERE address = $1")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| account_from_row(&r)))
    }
}

fn account_type_to_text(account_type: AccountType) -> &'static str {
    match account_type {
        AccountType::Eoa => "eoa",
        AccountType::SmartAccount => "smart_account",
    }
}

fn text_to_account_type(text: &str) -> AccountType {
    match text {
        "smart_account" => AccountType::SmartAccount,
        _ => AccountType::Eoa,
    }
}

fn compliance_to_text(status: ComplianceStatus) -> &'static str {
    match status {
        ComplianceStatus::Compliant => "compliant",
        ComplianceStatus::NonCompliant => "non_compliant",
        ComplianceStatus::Pending => "pending",
        ComplianceStatus::UnderReview => "under_review",
    }
}

fn text_to_compliance(text: &str) -> ComplianceStatus {
    match text {
        "compliant" => ComplianceStatus::Compliant,
        "non_compliant" => ComplianceStatus::NonCompliant,
        "under_review" => ComplianceStatus::UnderReview,
        _ => ComplianceStatus::Pending,
    }
}

fn account_from_row(row: &sqlx::postgres::PgRow) -> Account {
    Account {
        address: row.get("address"),
        account_type: text_to_account_type(&row.get::<String, _>("account_type")),
        balance: text_to_u256(&row.get::<String, _>("balance")),
        nonce: row.get::<i64, _>("nonce") as u64,
        tx_count: row.get::<i64, _>("tx_count") as u64,
        contract_code: row.get("contract_code"),
        creator_address: row.get("creator_address"),
        creation_tx_hash: row.get("creation_tx_hash"),
        first_seen: row.get::<i64, _>("first_seen") as u64,
        last_activity: row.get::<i64, _>("last_activity") as u64,
        compliance_status: text_to_compliance(&row.get::<String, _>("compliance_status")),
        risk_score: row.get::<i16, _>("risk_score") as u8,
        label: row.get("label"),
        description: row.get("description"),
        factory_address: row.get("factory_address"),
        implementation_address: row.get("implementation_address"),
        owner_address: row.get("owner_address"),
    }
}

#[async_trait]
impl AccountTagProvider for PgStorage {
    async fn upsert_tag(&self, tag: &AccountTag) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO account_tags (address, tag, value, creator)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (address, tag) DO UPDATE SET value = EXCLUDED.value, creator = EXCLUDED.creator
            "#,
        )
        .bind(&tag.address)
        .bind(&tag.tag)
        .bind(&tag.value)
        .bind(&tag.creator)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn tags_for(&self, address: &str) -> Result<Vec<AccountTag>, StoreError> {
        let rows = sqlx::query("SELECT * FROM account_tags WHERE address = $1")
            .bind(address)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|r| AccountTag {
                address: r.get("address"),
                tag: r.get("tag"),
                value: r.get("value"),
                creator: r.get("creator"),
            })
            .collect())
    }
}

#[async_trait]
impl AccountAnalyticsProvider for PgStorage {
    async fn upsert_daily(&self, analytics: &AccountAnalytics) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO account_analytics (address, day, tx_count, gas_used, value_transferred)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (address, day) DO UPDATE SET
                tx_count = account_analytics.tx_count + EXCLUDED.tx_count,
                gas_used = account_analytics.gas_used + EXCLUDED.gas_used
            "#,
        )
        .bind(&analytics.address)
        .bind(&analytics.day)
        .bind(analytics.tx_count as i64)
        .bind(analytics.gas_used as i64)
        .bind(u256_to_text(analytics.value_transferred))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_daily(&self, address: &str, day: &str) -> Result<Option<AccountAnalytics>, StoreError> {
        let row = sqlx::query("SELECT * FROM account_analytics WHERE address = $1 AND day = $2")
            .bind(address)
            .bind(day)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| AccountAnalytics {
            address: r.get("address"),
            day: r.get("day"),
            tx_count: r.get::<i64, _>("tx_count") as u64,
            gas_used: r.get::<i64, _>("gas_used") as u64,
            value_transferred: text_to_u256(&r.get::<String, _>("value_transferred")),
        }))
    }
}

#[async_trait]
impl ContractInteractionProvider for PgStorage {
    async fn upsert(&self, interaction: &ContractInteraction) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO contract_interactions (
                account, contract_address, transaction_hash, method_selector,
                gas_used, value, block_number, timestamp
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            ON CONFLICT (account, contract_address, transaction_hash) DO NOTHING
            "#,
        )
        .bind(&interaction.account)
        .bind(&interaction.contract_address)
        .bind(&interaction.transaction_hash)
        .bind(&interaction.method_selector)
        .bind(interaction.gas_used as i64)
        .bind(u256_to_text(interaction.value))
        .bind(interaction.block_number as i64)
        .bind(interaction.timestamp as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_account(&self, account: &str) -> Result<Vec<ContractInteraction>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM contract_interactions WHERE account = $1 ORDER BY block_number DESC",
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| ContractInteraction {
                account: r.get("account"),
                contract_address: r.get("contract_address"),
                transaction_hash: r.get("transaction_hash"),
                method_selector: r.get("method_selector"),
                gas_used: r.get::<i64, _>("gas_used") as u64,
                value: text_to_u256(&r.get::<String, _>("value")),
                block_number: r.get::<i64, _>("block_number") as u64,
                timestamp: r.get::<i64, _>("timestamp") as u64,
            })
            .collect())
    }
}

#[async_trait]
impl TokenHoldingProvider for PgStorage {
    async fn upsert_balance(
        &self,
        account: &str,
        token_address: &str,
        balance: U256,
        block_number: u64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO token_holdings (account, token_address, balance, last_updated_block)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (account, token_address) DO UPDATE SET
                balance = EXCLUDED.balance,
                last_updated_block = EXCLUDED.last_updated_block
            WHERE EXCLUDED.last_updated_block >= token_holdings.last_updated_block
            "#,
        )
        .bind(account)
        .bind(token_address)
        .bind(u256_to_text(balance))
        .bind(block_number as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn holdings_for(&self, account: &str) -> Result<Vec<TokenHolding>, StoreError> {
        let rows = sqlx::query("SELECT * FROM token_holdings WHERE account = $1")
            .bind(account)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|r| TokenHolding {
                account: r.get("account"),
                token_address: r.get("token_address"),
                balance: text_to_u256(&r.get::<String, _>("balance")),
                last_updated_block: r.get::<i64, _>("last_updated_block") as u64,
            })
            .collect())
    }
}

#[async_trait]
impl ValidatorProvider for PgStorage {
    async fn upsert_roster(&self, active: &[Validator]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE validators SET status = 'inactive'")
            .execute(&mut *tx)
            .await?;
        for validator in active {
            sqlx::query(
                r#"
                INSERT INTO validators (address, proposed_block_count, last_proposed_block, status, uptime_percentage, last_seen)
                VALUES ($1, $2, $3, 'active', $4, $5)
                ON CONFLICT (address) DO UPDATE SET
                    proposed_block_count = EXCLUDED.proposed_block_count,
                    last_proposed_block = EXCLUDED.last_proposed_block,
                    status = 'active',
                    uptime_percentage = EXCLUDED.uptime_percentage,
                    last_seen = EXCLUDED.last_seen
                "#,
            )
            .bind(&validator.address)
            .bind(u256_to_text(validator.proposed_block_count))
            .bind(validator.last_proposed_block.map(|v| v as i64))
            .bind(validator.uptime_percentage)
            .bind(validator.last_seen as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_by_address(&self, address: &str) -> Result<Option<Validator>, StoreError> {
        let row = sqlx::query("SELECT * FROM validators WHERE address = $1")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| validator_from_row(&r)))
    }

    async fn list_active(&self) -> Result<Vec<Validator>, StoreError> {
        let rows = sqlx::query("SELECT * FROM validators WHERE status = 'active'")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(validator_from_row).collect())
    }
}

fn validator_from_row(row: &sqlx::postgres::PgRow) -> Validator {
    let status = match row.get::<String, _>("status").as_str() {
        "active" => ValidatorStatus::Active,
        _ => ValidatorStatus::Inactive,
    };
    Validator {
        address: row.get("address"),
        proposed_block_count: text_to_u256(&row.get::<String, _>("proposed_block_count")),
        last_proposed_block: row.get::<Option<i64>, _>("last_proposed_block").map(|v| v as u64),
        status,
        uptime_percentage: row.get("uptime_percentage"),
        last_seen: row.get::<i64, _>("last_seen") as u64,
    }
}
