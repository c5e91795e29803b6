//! In-memory ledger store
//!
//! Transactions are serialised: `begin` takes an owned lock on the whole
//! state and works on a staged copy, which `commit` publishes. Used by the
//! engine tests and for local runs without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{LedgerEntry, Wallet};

use super::store::{LedgerStore, LedgerTransaction, StoreError};

#[derive(Debug, Clone, Default)]
struct State {
    wallets: HashMap<String, Wallet>,
    entries: Vec<LedgerEntry>,
}

impl State {
    fn entries(&self, wallet_id: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|e| e.wallet_id == wallet_id && e.date_and_time >= from && e.date_and_time < to)
            .cloned()
            .collect();
        // Stable: entries sharing a timestamp stay latest-appended first
        entries.sort_by(|a, b| b.date_and_time.cmp(&a.date_and_time));
        entries
    }
}

/// Thread-safe in-memory ledger store
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<State>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a wallet, bypassing the ledger
    pub async fn insert_wallet(&self, wallet: Wallet) {
        let mut state = self.state.lock().await;
        state.wallets.insert(wallet.wallet_id.clone(), wallet);
    }

    /// Append a ledger entry and apply it to its wallet, creating the
    /// wallet when needed
    pub async fn record(&self, entry: LedgerEntry) {
        let mut state = self.state.lock().await;
        state
            .wallets
            .entry(entry.wallet_id.clone())
            .or_insert_with(|| Wallet::new(entry.wallet_id.clone(), entry.currency.clone(), 0))
            .balance += entry.amount;
        state.entries.push(entry);
    }

    /// Current balance of a wallet
    pub async fn balance(&self, wallet_id: &str) -> Option<i64> {
        let state = self.state.lock().await;
        state.wallets.get(wallet_id).map(|w| w.balance)
    }

    /// Every ledger entry of a wallet, oldest first
    pub async fn ledger(&self, wallet_id: &str) -> Vec<LedgerEntry> {
        let state = self.state.lock().await;
        state
            .entries
            .iter()
            .filter(|e| e.wallet_id == wallet_id)
            .cloned()
            .collect()
    }

    /// Make every following commit fail until reset
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = (*guard).clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            staged,
            fail_commit: self.fail_commits.load(Ordering::SeqCst),
        }))
    }

    async fn wallet(&self, wallet_id: &str) -> Result<Option<Wallet>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.wallets.get(wallet_id).cloned())
    }

    async fn entries(
        &self,
        wallet_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.entries(wallet_id, from, to))
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<State>,
    staged: State,
    fail_commit: bool,
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn wallet(&mut self, wallet_id: &str) -> Result<Option<Wallet>, StoreError> {
        Ok(self.staged.wallets.get(wallet_id).cloned())
    }

    async fn create_wallet(&mut self, wallet: &Wallet) -> Result<(), StoreError> {
        if self.staged.wallets.contains_key(&wallet.wallet_id) {
            return Err(StoreError::DuplicateWallet(wallet.wallet_id.clone()));
        }
        if wallet.balance < 0 {
            return Err(StoreError::NegativeBalance(wallet.wallet_id.clone()));
        }
        self.staged
            .wallets
            .insert(wallet.wallet_id.clone(), wallet.clone());
        Ok(())
    }

    async fn set_balance(&mut self, wallet_id: &str, balance: i64) -> Result<(), StoreError> {
        if balance < 0 {
            return Err(StoreError::NegativeBalance(wallet_id.to_string()));
        }
        let wallet = self
            .staged
            .wallets
            .get_mut(wallet_id)
            .ok_or_else(|| StoreError::MissingWallet(wallet_id.to_string()))?;
        wallet.balance = balance;
        Ok(())
    }

    async fn append_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError> {
        self.staged.entries.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.fail_commit {
            return Err(StoreError::Unavailable("commit rejected".to_string()));
        }
        let InMemoryTransaction { mut guard, staged, .. } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
