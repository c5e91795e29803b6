//! Response envelopes
//!
//! Workers own response serialisation; the gateway relays the bytes verbatim
//! and only ever looks at the header.

use serde::{Deserialize, Serialize};

use super::Header;
use crate::domain::{LedgerError, TransactionType};

/// Outcome of a ledger request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Status {
    Successful,
    Failed,
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        match status {
            Status::Successful => 1,
            Status::Failed => 2,
        }
    }
}

impl TryFrom<i32> for Status {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Status::Successful),
            2 => Ok(Status::Failed),
            other => Err(format!("unknown status code {}", other)),
        }
    }
}

/// Response envelope: header, status, failure reason and the
/// operation-specific result fields flattened alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub header: Header,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub result: T,
}

impl<T: Default> ResponseEnvelope<T> {
    pub fn success(header: Header, result: T) -> Self {
        Self {
            header,
            status: Status::Successful,
            error_message: None,
            result,
        }
    }

    /// Failed response. The reason is always present and non-empty.
    pub fn failed(header: Header, error: &LedgerError) -> Self {
        Self {
            header,
            status: Status::Failed,
            error_message: Some(error.to_string()),
            result: T::default(),
        }
    }

    pub fn from_outcome(header: Header, outcome: Result<T, LedgerError>) -> Self {
        match outcome {
            Ok(result) => Self::success(header, result),
            Err(error) => Self::failed(header, &error),
        }
    }
}

impl<T> ResponseEnvelope<T> {
    pub fn is_successful(&self) -> bool {
        self.status == Status::Successful
    }
}

/// Partial view of any response, enough to route it to the waiting caller
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderOnly {
    pub header: Header,
}

/// Result of deposit, withdraw and transfer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<String>,
}

impl BalanceUpdate {
    pub fn new(currency: impl Into<String>, new_balance: impl Into<String>) -> Self {
        Self {
            currency: Some(currency.into()),
            new_balance: Some(new_balance.into()),
        }
    }
}

/// Result of a balance read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
}

/// One row of transaction history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// `YYYYMMDD`
    pub date: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub currency: String,
    /// Always a positive magnitude
    pub amount: String,
}

/// Result of a transaction history read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryItem>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Action;
    use serde_json::json;

    #[test]
    fn test_successful_response_wire_shape() {
        let response = ResponseEnvelope::success(
            Header::new(9, Action::Deposit),
            BalanceUpdate::new("SGD", "111.11"),
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            json!({
                "header": {"id": 9, "action": 1},
                "status": 1,
                "currency": "SGD",
                "new_balance": "111.11"
            })
        );
    }

    #[test]
    fn test_failed_response_carries_reason() {
        let response: ResponseEnvelope<BalanceUpdate> = ResponseEnvelope::failed(
            Header::new(10, Action::Withdraw),
            &LedgerError::InsufficientFunds,
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], 2);
        assert_eq!(json["error_message"], "Insufficient funds in wallet");
        assert!(json.get("new_balance").is_none());
    }

    #[test]
    fn test_history_response_round_trip() {
        let response = ResponseEnvelope::success(
            Header::new(11, Action::GetTransactionHistory),
            HistoryResult {
                history: Some(vec![HistoryItem {
                    date: "20260101".to_string(),
                    transaction_type: TransactionType::Withdrawal,
                    currency: "SGD".to_string(),
                    amount: "5.00".to_string(),
                }]),
            },
        );

        let bytes = serde_json::to_vec(&response).unwrap();
        let parsed: ResponseEnvelope<HistoryResult> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, response);
        assert!(parsed.is_successful());
    }

    #[test]
    fn test_header_only_ignores_payload() {
        let bytes = br#"{"header":{"id":5,"action":4},"status":1,"currency":"SGD","balance":"1.00"}"#;
        let view: HeaderOnly = serde_json::from_slice(bytes).unwrap();
        assert_eq!(view.header, Header::new(5, Action::GetBalance));
    }
}
