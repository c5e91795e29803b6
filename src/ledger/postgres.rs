//! Postgres ledger store
//!
//! Table names come from configuration, so statements are built once at
//! construction after the names have been validated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

use crate::config::is_valid_table_name;
use crate::domain::{LedgerEntry, Wallet};

use super::store::{LedgerStore, LedgerTransaction, StoreError};

#[derive(Debug)]
struct Statements {
    select_wallet: String,
    select_wallet_for_update: String,
    insert_wallet: String,
    update_balance: String,
    insert_entry: String,
    select_entries: String,
}

impl Statements {
    fn new(balances: &str, transactions: &str) -> Self {
        Self {
            select_wallet: format!(
                "SELECT currency, balance FROM {} WHERE wallet_id = $1",
                balances
            ),
            select_wallet_for_update: format!(
                "SELECT currency, balance FROM {} WHERE wallet_id = $1 FOR UPDATE",
                balances
            ),
            insert_wallet: format!(
                "INSERT INTO {} (wallet_id, currency, balance) VALUES ($1, $2, $3)",
                balances
            ),
            update_balance: format!(
                "UPDATE {} SET balance = $1 WHERE wallet_id = $2",
                balances
            ),
            insert_entry: format!(
                "INSERT INTO {} (wallet_id, date_and_time, currency, amount) VALUES ($1, $2, $3, $4)",
                transactions
            ),
            select_entries: format!(
                r#"
                SELECT date_and_time, currency, amount FROM {}
                WHERE wallet_id = $1 AND date_and_time >= $2 AND date_and_time < $3
                ORDER BY date_and_time DESC
                "#,
                transactions
            ),
        }
    }
}

/// Ledger store over a Postgres pool
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    sql: Arc<Statements>,
}

impl PgLedgerStore {
    /// Create a store over the given balances and transactions tables
    pub fn new(pool: PgPool, balances_table: &str, transactions_table: &str) -> Result<Self, StoreError> {
        for table in [balances_table, transactions_table] {
            if !is_valid_table_name(table) {
                return Err(StoreError::InvalidTableName(table.to_string()));
            }
        }

        Ok(Self {
            pool,
            sql: Arc::new(Statements::new(balances_table, transactions_table)),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTransaction {
            tx,
            sql: Arc::clone(&self.sql),
        }))
    }

    async fn wallet(&self, wallet_id: &str) -> Result<Option<Wallet>, StoreError> {
        let row: Option<(String, i64)> = sqlx::query_as(&self.sql.select_wallet)
            .bind(wallet_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(currency, balance)| Wallet::new(wallet_id, currency, balance)))
    }

    async fn entries(
        &self,
        wallet_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows: Vec<(DateTime<Utc>, String, i64)> = sqlx::query_as(&self.sql.select_entries)
            .bind(wallet_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(date_and_time, currency, amount)| LedgerEntry {
                wallet_id: wallet_id.to_string(),
                date_and_time,
                currency,
                amount,
            })
            .collect())
    }
}

struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
    sql: Arc<Statements>,
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn wallet(&mut self, wallet_id: &str) -> Result<Option<Wallet>, StoreError> {
        let row: Option<(String, i64)> = sqlx::query_as(&self.sql.select_wallet_for_update)
            .bind(wallet_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(|(currency, balance)| Wallet::new(wallet_id, currency, balance)))
    }

    async fn create_wallet(&mut self, wallet: &Wallet) -> Result<(), StoreError> {
        sqlx::query(&self.sql.insert_wallet)
            .bind(&wallet.wallet_id)
            .bind(&wallet.currency)
            .bind(wallet.balance)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn set_balance(&mut self, wallet_id: &str, balance: i64) -> Result<(), StoreError> {
        if balance < 0 {
            return Err(StoreError::NegativeBalance(wallet_id.to_string()));
        }

        let result = sqlx::query(&self.sql.update_balance)
            .bind(balance)
            .bind(wallet_id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingWallet(wallet_id.to_string()));
        }
        Ok(())
    }

    async fn append_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError> {
        sqlx::query(&self.sql.insert_entry)
            .bind(&entry.wallet_id)
            .bind(entry.date_and_time)
            .bind(&entry.currency)
            .bind(entry.amount)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
