//! Request envelopes, one per ledger operation

use serde::{Deserialize, Serialize};

use super::Header;

/// Access to the header of any request envelope
pub trait RequestEnvelope {
    fn header(&self) -> &Header;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub header: Header,
    #[serde(default)]
    pub wallet_id: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub header: Header,
    #[serde(default)]
    pub wallet_id: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub header: Header,
    #[serde(default)]
    pub source_wallet_id: String,
    #[serde(default)]
    pub destination_wallet_id: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRequest {
    pub header: Header,
    #[serde(default)]
    pub wallet_id: String,
}

/// Transaction history query; `from` and `to` are `YYYYMMDD`, both inclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub header: Header,
    #[serde(default)]
    pub wallet_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
}

macro_rules! impl_request_envelope {
    ($($request:ty),+ $(,)?) => {
        $(
            impl RequestEnvelope for $request {
                fn header(&self) -> &Header {
                    &self.header
                }
            }
        )+
    };
}

impl_request_envelope!(
    DepositRequest,
    WithdrawRequest,
    TransferRequest,
    BalanceRequest,
    HistoryRequest,
);
