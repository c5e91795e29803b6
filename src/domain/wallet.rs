//! Wallet and ledger entry records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A wallet holds exactly one currency and a non-negative balance in hundredths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub wallet_id: String,
    pub currency: String,
    pub balance: i64,
}

impl Wallet {
    pub fn new(wallet_id: impl Into<String>, currency: impl Into<String>, balance: i64) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            currency: currency.into(),
            balance,
        }
    }

    pub fn holds(&self, currency: &str) -> bool {
        self.currency == currency
    }
}

/// Immutable, signed record of one balance movement.
///
/// Credits are positive, debits negative. The sum of all entries of a wallet
/// equals its balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub wallet_id: String,
    pub date_and_time: DateTime<Utc>,
    pub currency: String,
    pub amount: i64,
}

impl LedgerEntry {
    pub fn credit(wallet_id: &str, currency: &str, cents: i64, at: DateTime<Utc>) -> Self {
        Self {
            wallet_id: wallet_id.to_string(),
            date_and_time: at,
            currency: currency.to_string(),
            amount: cents,
        }
    }

    pub fn debit(wallet_id: &str, currency: &str, cents: i64, at: DateTime<Utc>) -> Self {
        Self {
            wallet_id: wallet_id.to_string(),
            date_and_time: at,
            currency: currency.to_string(),
            amount: -cents,
        }
    }

    /// Display class of this entry.
    pub fn transaction_type(&self) -> TransactionType {
        if self.amount >= 0 {
            TransactionType::Deposit
        } else {
            TransactionType::Withdrawal
        }
    }
}

/// Display class of a ledger entry in transaction history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    #[serde(rename = "D")]
    Deposit,
    #[serde(rename = "W")]
    Withdrawal,
}

impl TransactionType {
    /// Single-letter code used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "D",
            TransactionType::Withdrawal => "W",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
