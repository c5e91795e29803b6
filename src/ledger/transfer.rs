//! Transfer Handler
//!
//! Moves funds between two wallets of the same currency in one transaction.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::domain::{to_display, to_internal, LedgerEntry, LedgerError, MoneyError, Wallet};
use crate::messages::{Action, BalanceUpdate, TransferRequest};

use super::{begin, finish, require, LedgerOperation, LedgerStore, LedgerTransaction, TxError};

/// Handler for wallet-to-wallet transfers
pub struct TransferHandler {
    store: Arc<dyn LedgerStore>,
}

impl TransferHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Lock both wallets in wallet-id order, whatever their role, so two
    /// opposite transfers cannot deadlock. Returns `(source, destination)`.
    async fn lock_pair(
        tx: &mut dyn LedgerTransaction,
        source_id: &str,
        destination_id: &str,
    ) -> Result<(Option<Wallet>, Option<Wallet>), TxError> {
        if source_id <= destination_id {
            let source = tx.wallet(source_id).await?;
            let destination = tx.wallet(destination_id).await?;
            Ok((source, destination))
        } else {
            let destination = tx.wallet(destination_id).await?;
            let source = tx.wallet(source_id).await?;
            Ok((source, destination))
        }
    }

    async fn apply(
        tx: &mut dyn LedgerTransaction,
        request: &TransferRequest,
        amount: i64,
    ) -> Result<BalanceUpdate, TxError> {
        let (source, destination) =
            Self::lock_pair(tx, &request.source_wallet_id, &request.destination_wallet_id).await?;

        let source = source.ok_or(LedgerError::SourceWalletNotFound)?;
        let destination = destination.ok_or(LedgerError::DestinationWalletNotFound)?;

        if !source.holds(&request.currency) {
            return Err(LedgerError::SourceCurrencyMismatch {
                wallet: source.currency,
                requested: request.currency.clone(),
            }
            .into());
        }
        if !destination.holds(&request.currency) {
            return Err(LedgerError::DestinationCurrencyMismatch {
                wallet: destination.currency,
                requested: request.currency.clone(),
            }
            .into());
        }

        if amount > source.balance {
            return Err(LedgerError::InsufficientSourceFunds.into());
        }

        let source_balance = source.balance - amount;
        let destination_balance = destination
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(MoneyError::Overflow))?;

        let now = Utc::now();
        tx.append_entry(&LedgerEntry::debit(&source.wallet_id, &request.currency, amount, now))
            .await?;
        tx.append_entry(&LedgerEntry::credit(&destination.wallet_id, &request.currency, amount, now))
            .await?;
        tx.set_balance(&source.wallet_id, source_balance).await?;
        tx.set_balance(&destination.wallet_id, destination_balance).await?;

        Ok(BalanceUpdate::new(&request.currency, to_display(source_balance)))
    }
}

#[async_trait]
impl LedgerOperation for TransferHandler {
    const ACTION: Action = Action::Transfer;

    type Request = TransferRequest;
    type Output = BalanceUpdate;

    async fn handle(&self, request: &TransferRequest) -> Result<BalanceUpdate, LedgerError> {
        require(&request.source_wallet_id, "source_wallet_id")?;
        require(&request.destination_wallet_id, "destination_wallet_id")?;
        require(&request.currency, "currency")?;
        let amount = to_internal(&request.amount)?;

        if request.source_wallet_id == request.destination_wallet_id {
            return Err(LedgerError::SameWalletTransfer);
        }

        let mut tx = begin(&self.store, Self::ACTION).await?;
        let outcome = Self::apply(tx.as_mut(), request, amount).await;
        let update = finish(tx, outcome, Self::ACTION).await?;

        tracing::info!(
            source_wallet_id = %request.source_wallet_id,
            destination_wallet_id = %request.destination_wallet_id,
            currency = %request.currency,
            amount = %request.amount,
            "Transfer applied"
        );
        Ok(update)
    }
}
