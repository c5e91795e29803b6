//! Ledger store interfaces
//!
//! Engines only talk to these traits, so the same business rules run
//! against Postgres in production and an in-memory store in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{LedgerEntry, Wallet};

/// Errors raised by a ledger store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Wallet already exists: {0}")]
    DuplicateWallet(String),

    #[error("Wallet not found: {0}")]
    MissingWallet(String),

    #[error("Balance of wallet {0} would become negative")]
    NegativeBalance(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Entry point of a ledger store
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a new transaction
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError>;

    /// Read a wallet outside of any transaction
    async fn wallet(&self, wallet_id: &str) -> Result<Option<Wallet>, StoreError>;

    /// Ledger entries of a wallet with `from <= date_and_time < to`, most
    /// recent first
    async fn entries(
        &self,
        wallet_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, StoreError>;
}

/// One open transaction. Dropping it without `commit` discards every change.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Read a wallet and lock it until the transaction ends
    async fn wallet(&mut self, wallet_id: &str) -> Result<Option<Wallet>, StoreError>;

    async fn create_wallet(&mut self, wallet: &Wallet) -> Result<(), StoreError>;

    async fn set_balance(&mut self, wallet_id: &str, balance: i64) -> Result<(), StoreError>;

    async fn append_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
