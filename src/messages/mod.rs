//! Queue envelopes
//!
//! Requests and responses exchanged between the gateway and the ledger
//! workers. Every envelope starts with a `header` carrying the correlation id
//! and the numeric action code.

mod request;
mod response;

pub use request::{
    BalanceRequest, DepositRequest, HistoryRequest, RequestEnvelope, TransferRequest,
    WithdrawRequest,
};
pub use response::{
    BalanceResult, BalanceUpdate, HeaderOnly, HistoryItem, HistoryResult, ResponseEnvelope,
    Status,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger operation requested by an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Action {
    Deposit,
    Withdraw,
    Transfer,
    GetBalance,
    GetTransactionHistory,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Deposit,
        Action::Withdraw,
        Action::Transfer,
        Action::GetBalance,
        Action::GetTransactionHistory,
    ];

    /// Numeric code used on the wire
    pub fn code(&self) -> i32 {
        match self {
            Action::Deposit => 1,
            Action::Withdraw => 2,
            Action::Transfer => 3,
            Action::GetBalance => 4,
            Action::GetTransactionHistory => 5,
        }
    }

    /// Position in `Action::ALL`
    pub fn index(&self) -> usize {
        (self.code() - 1) as usize
    }

    /// Short name, used for queue names and worker selection
    pub fn name(&self) -> &'static str {
        match self {
            Action::Deposit => "deposit",
            Action::Withdraw => "withdraw",
            Action::Transfer => "transfer",
            Action::GetBalance => "balance",
            Action::GetTransactionHistory => "transaction_history",
        }
    }

    /// Prefix of the environment variables configuring this operation
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Action::Deposit => "DEPOSIT",
            Action::Withdraw => "WITHDRAW",
            Action::Transfer => "TRANSFER",
            Action::GetBalance => "BALANCE",
            Action::GetTransactionHistory => "TRANSACTION_HISTORY",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Action> for i32 {
    fn from(action: Action) -> Self {
        action.code()
    }
}

impl TryFrom<i32> for Action {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|action| action.code() == code)
            .ok_or_else(|| format!("unknown action code {}", code))
    }
}

/// Envelope header shared by requests and responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Correlation id
    pub id: i64,
    pub action: Action,
}

impl Header {
    pub fn new(id: i64, action: Action) -> Self {
        Self { id, action }
    }
}
