//! Deposit Handler
//!
//! Credits a wallet, creating it on the first deposit to an unseen id.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::domain::{to_display, to_internal, LedgerEntry, LedgerError, MoneyError, Wallet};
use crate::messages::{Action, BalanceUpdate, DepositRequest};

use super::{begin, finish, require, LedgerOperation, LedgerStore, LedgerTransaction, TxError};

/// Handler for deposits
pub struct DepositHandler {
    store: Arc<dyn LedgerStore>,
}

impl DepositHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    async fn apply(
        tx: &mut dyn LedgerTransaction,
        request: &DepositRequest,
        amount: i64,
    ) -> Result<BalanceUpdate, TxError> {
        let entry = LedgerEntry::credit(&request.wallet_id, &request.currency, amount, Utc::now());

        let new_balance = match tx.wallet(&request.wallet_id).await? {
            None => {
                tx.append_entry(&entry).await?;
                tx.create_wallet(&Wallet::new(&request.wallet_id, &request.currency, amount))
                    .await?;
                amount
            }
            Some(wallet) if !wallet.holds(&request.currency) => {
                return Err(LedgerError::currency_mismatch(&wallet.currency, &request.currency).into());
            }
            Some(wallet) => {
                let balance = wallet
                    .balance
                    .checked_add(amount)
                    .ok_or(LedgerError::InvalidAmount(MoneyError::Overflow))?;
                tx.append_entry(&entry).await?;
                tx.set_balance(&wallet.wallet_id, balance).await?;
                balance
            }
        };

        Ok(BalanceUpdate::new(&request.currency, to_display(new_balance)))
    }
}

#[async_trait]
impl LedgerOperation for DepositHandler {
    const ACTION: Action = Action::Deposit;

    type Request = DepositRequest;
    type Output = BalanceUpdate;

    async fn handle(&self, request: &DepositRequest) -> Result<BalanceUpdate, LedgerError> {
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
            "Deposit applied"
        );
        Ok(update)
    }
}
