//! Withdraw Handler
//!
//! Debits an existing wallet. The balance never goes below zero.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::domain::{to_display, to_internal, LedgerEntry, LedgerError};
use crate::messages::{Action, BalanceUpdate, WithdrawRequest};

use super::{begin, finish, require, LedgerOperation, LedgerStore, LedgerTransaction, TxError};

/// Handler for withdrawals
pub struct WithdrawHandler {
    store: Arc<dyn LedgerStore>,
}

impl WithdrawHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    async fn apply(
        tx: &mut dyn LedgerTransaction,
        request: &WithdrawRequest,
        amount: i64,
    ) -> Result<BalanceUpdate, TxError> {
        let wallet = tx
            .wallet(&request.wallet_id)
            .await?
            .ok_or(LedgerError::WalletNotFound)?;

        if !wallet.holds(&request.currency) {
            return Err(LedgerError::currency_mismatch(&wallet.currency, &request.currency).into());
        }

        if amount > wallet.balance {
            return Err(LedgerError::InsufficientFunds.into());
        }

        let new_balance = wallet.balance - amount;
        tx.append_entry(&LedgerEntry::debit(&wallet.wallet_id, &wallet.currency, amount, Utc::now()))
            .await?;
        tx.set_balance(&wallet.wallet_id, new_balance).await?;

        Ok(BalanceUpdate::new(&wallet.currency, to_display(new_balance)))
    }
}

#[async_trait]
impl LedgerOperation for WithdrawHandler {
    const ACTION: Action = Action::Withdraw;

    type Request = WithdrawRequest;
    type Output = BalanceUpdate;

    async fn handle(&self, request: &WithdrawRequest) -> Result<BalanceUpdate, LedgerError> {
        require(&request.wallet_id, "wallet_id")?;
        require(&request.currency, "currency")?;
        let amount = to_internal(&request.amount)?;

        let mut tx = begin(&self.store, Self::ACTION).await?;
        let outcome = Self::apply(tx.as_mut(), request, amount).await;
        let update = finish(tx, outcome, Self::ACTION).await?;

        tracing::info!(
            wallet_id = %request.wallet_id,
            currency = %request.currency,
            amount = %request.amount,
            "Withdrawal applied"
        );
        Ok(update)
    }
}
