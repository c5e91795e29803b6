//! Balance Handler

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{to_display, LedgerError};
use crate::messages::{Action, BalanceRequest, BalanceResult};

use super::{require, store_failure, LedgerOperation, LedgerStore};

/// Handler for balance reads
pub struct BalanceHandler {
    store: Arc<dyn LedgerStore>,
}

impl BalanceHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LedgerOperation for BalanceHandler {
    const ACTION: Action = Action::GetBalance;

    type Request = BalanceRequest;
    type Output = BalanceResult;

    async fn handle(&self, request: &BalanceRequest) -> Result<BalanceResult, LedgerError> {
        require(&request.wallet_id, "wallet_id")?;

        let wallet = self
            .store
            .wallet(&request.wallet_id)
            .await
            .map_err(|e| store_failure(Self::ACTION, e))?
            .ok_or(LedgerError::WalletNotFound)?;

        Ok(BalanceResult {
            currency: Some(wallet.currency),
            balance: Some(to_display(wallet.balance)),
        })
    }
}
