//! Ledger Error Types
//!
//! Business failures produced by the ledger engines. The `Display` text of
//! every variant is the reason string sent back in a failed response, so it
//! must never be empty.

use thiserror::Error;

use super::money::MoneyError;

/// Reasons a ledger operation can fail
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Amount specified was invalid: {0}")]
    InvalidAmount(#[from] MoneyError),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Message received by wrong service")]
    WrongService,

    #[error("Wallet does not exist")]
    WalletNotFound,

    #[error("Source wallet does not exist")]
    SourceWalletNotFound,

    #[error("Destination wallet does not exist")]
    DestinationWalletNotFound,

    #[error("Source and destination wallets must differ")]
    SameWalletTransfer,

    #[error("Currency mismatch: wallet holds {wallet}, request uses {requested}")]
    CurrencyMismatch { wallet: String, requested: String },

    #[error("Currency mismatch: source wallet holds {wallet}, transfer uses {requested}")]
    SourceCurrencyMismatch { wallet: String, requested: String },

    #[error("Currency mismatch: destination wallet holds {wallet}, transfer uses {requested}")]
    DestinationCurrencyMismatch { wallet: String, requested: String },

    #[error("Insufficient funds in wallet")]
    InsufficientFunds,

    #[error("Insufficient funds in source wallet")]
    InsufficientSourceFunds,

    #[error("Invalid start date")]
    InvalidStartDate,

    #[error("Invalid end date")]
    InvalidEndDate,

    /// Store failure; the detail is logged, not returned to the caller
    #[error("Database error")]
    Database,
}

impl LedgerError {
    pub fn currency_mismatch(wallet: &str, requested: &str) -> Self {
        Self::CurrencyMismatch {
            wallet: wallet.to_string(),
            requested: requested.to_string(),
        }
    }

    /// Check if this error is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Database | Self::WrongService)
    }
}
