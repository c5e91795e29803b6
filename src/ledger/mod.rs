//! Ledger module
//!
//! One engine per ledger operation. Each engine applies the business rules
//! of its operation against a [`LedgerStore`], independent of how requests
//! reach it. Mutating engines run inside a single store transaction and
//! roll it back on any failure.

mod balance;
mod deposit;
mod history;
mod memory;
mod postgres;
mod store;
mod transfer;
mod withdraw;

#[cfg(test)]
mod tests;

pub use balance::BalanceHandler;
pub use deposit::DepositHandler;
pub use history::{parse_date, query_window, HistoryHandler, DATE_FORMAT};
pub use memory::InMemoryLedgerStore;
pub use postgres::PgLedgerStore;
pub use store::{LedgerStore, LedgerTransaction, StoreError};
pub use transfer::TransferHandler;
pub use withdraw::WithdrawHandler;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::domain::LedgerError;
use crate::messages::{Action, RequestEnvelope};

/// A ledger operation: a request in, a result or a business failure out
#[async_trait]
pub trait LedgerOperation: Send + Sync {
    /// Action this operation serves
    const ACTION: Action;

    type Request: DeserializeOwned + RequestEnvelope + Send + Sync;
    type Output: Serialize + Default + Send;

    async fn handle(&self, request: &Self::Request) -> Result<Self::Output, LedgerError>;
}

/// Failure of a step inside a ledger transaction
#[derive(Debug)]
pub(crate) enum TxError {
    /// Business rule violated
    Rejected(LedgerError),
    /// Store failure
    Store(StoreError),
}

impl From<LedgerError> for TxError {
    fn from(err: LedgerError) -> Self {
        TxError::Rejected(err)
    }
}

impl From<StoreError> for TxError {
    fn from(err: StoreError) -> Self {
        TxError::Store(err)
    }
}

/// Log a store failure and turn it into the reason sent to the caller
pub(crate) fn store_failure(action: Action, err: StoreError) -> LedgerError {
    tracing::error!(action = %action, error = %err, "Ledger store failure");
    LedgerError::Database
}

/// Open a transaction on `store`
pub(crate) async fn begin(
    store: &Arc<dyn LedgerStore>,
    action: Action,
) -> Result<Box<dyn LedgerTransaction>, LedgerError> {
    store.begin().await.map_err(|e| store_failure(action, e))
}

/// Commit `tx` when `outcome` succeeded, roll it back otherwise
pub(crate) async fn finish<T>(
    tx: Box<dyn LedgerTransaction>,
    outcome: Result<T, TxError>,
    action: Action,
) -> Result<T, LedgerError> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(|e| store_failure(action, e))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(e) = tx.rollback().await {
                tracing::warn!(action = %action, error = %e, "Rollback failed");
            }
            match err {
                TxError::Rejected(reason) => Err(reason),
                TxError::Store(e) => Err(store_failure(action, e)),
            }
        }
    }
}

/// Reject an empty field of an incoming request
pub(crate) fn require(value: &str, field: &'static str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::MissingField(field));
    }
    Ok(())
}
