//! Gateway routing
//!
//! A fixed route table scanned in registration order with the path matcher,
//! and the handlers that validate each HTTP call and turn it into a queue
//! envelope. Worker responses are relayed to the caller byte for byte.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, Uri};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::domain::Amount;
use crate::error::{AppError, AppResult};
use crate::ledger::parse_date;
use crate::messages::{
    Action, BalanceRequest, DepositRequest, Header, HistoryRequest, TransferRequest,
    WithdrawRequest,
};

use super::paths::{
    match_path, PathMatch, TRANSFER, WALLET_BALANCE, WALLET_DEPOSITS, WALLET_TRANSACTION_HISTORY,
    WALLET_WITHDRAWALS,
};
use super::GatewayState;

/// Handler selected by a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Deposit,
    Withdraw,
    Transfer,
    Balance,
    TransactionHistory,
}

impl Endpoint {
    /// Ledger operation the endpoint forwards to
    pub fn action(&self) -> Action {
        match self {
            Endpoint::Deposit => Action::Deposit,
            Endpoint::Withdraw => Action::Withdraw,
            Endpoint::Transfer => Action::Transfer,
            Endpoint::Balance => Action::GetBalance,
            Endpoint::TransactionHistory => Action::GetTransactionHistory,
        }
    }
}

/// Route table, tried in order
const ROUTES: [(Method, &str, Endpoint); 5] = [
    (Method::POST, WALLET_DEPOSITS, Endpoint::Deposit),
    (Method::POST, WALLET_WITHDRAWALS, Endpoint::Withdraw),
    (Method::POST, TRANSFER, Endpoint::Transfer),
    (Method::GET, WALLET_BALANCE, Endpoint::Balance),
    (Method::GET, WALLET_TRANSACTION_HISTORY, Endpoint::TransactionHistory),
];

/// Outcome of looking up a request target
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    Found(Endpoint, PathMatch),
    MethodNotAllowed,
    NotFound,
}

/// Find the first route matching `method` and `target` (path plus query).
///
/// Only GET and POST are served. A target that matches a route registered
/// for another method resolves to `MethodNotAllowed`.
pub fn resolve(method: &Method, target: &str) -> Resolution {
    if *method != Method::GET && *method != Method::POST {
        return Resolution::MethodNotAllowed;
    }

    let mut known_path = false;
    for (route_method, pattern, endpoint) in ROUTES.iter() {
        if let Some(found) = match_path(target, pattern) {
            if route_method == method {
                return Resolution::Found(*endpoint, found);
            }
            known_path = true;
        }
    }

    if known_path {
        Resolution::MethodNotAllowed
    } else {
        Resolution::NotFound
    }
}

// =========================================================================
// Dispatch
// =========================================================================

/// Fallback handler serving every wallet route
pub async fn dispatch(
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> AppResult<Response> {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    let (endpoint, route) = match resolve(&method, target) {
        Resolution::Found(endpoint, route) => (endpoint, route),
        Resolution::MethodNotAllowed => {
            return Err(AppError::MethodNotAllowed(method.to_string()))
        }
        Resolution::NotFound => return Err(AppError::NotFound(uri.path().to_string())),
    };

    let (id, request) = build_request(endpoint, &route, &body, || state.correlator.next_id())?;
    let service = state.config.service(endpoint.action());

    tracing::debug!(id, action = %service.action, "Forwarding request");
    let response = state.correlator.send_and_await(id, request, service).await?;

    Ok(([(header::CONTENT_TYPE, "application/json")], response).into_response())
}

// =========================================================================
// Envelope construction
// =========================================================================

/// Body of deposit and withdrawal calls
#[derive(Debug, Deserialize)]
struct AmountBody {
    #[serde(default)]
    amount: String,
    #[serde(default)]
    currency: String,
}

/// Body of transfer calls
#[derive(Debug, Deserialize)]
struct TransferBody {
    #[serde(default)]
    source_wallet_id: String,
    #[serde(default)]
    destination_wallet_id: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    currency: String,
}

/// Validate the call and serialise its request envelope.
///
/// A correlation id is drawn from `next_id` only once the input is valid.
pub fn build_request(
    endpoint: Endpoint,
    route: &PathMatch,
    body: &[u8],
    next_id: impl FnOnce() -> i64,
) -> AppResult<(i64, Vec<u8>)> {
    let action = endpoint.action();

    let bytes = match endpoint {
        Endpoint::Deposit | Endpoint::Withdraw => {
            let wallet_id = wallet_id(route)?;
            let body: AmountBody = parse_body(body)?;
            let amount = amount(body.amount)?;
            let currency = required(body.currency, "currency")?;

            let id = next_id();
            let header = Header::new(id, action);
            let bytes = if endpoint == Endpoint::Deposit {
                serde_json::to_vec(&DepositRequest {
                    header,
                    wallet_id,
                    amount,
                    currency,
                })?
            } else {
                serde_json::to_vec(&WithdrawRequest {
                    header,
                    wallet_id,
                    amount,
                    currency,
                })?
            };
            (id, bytes)
        }
        Endpoint::Transfer => {
            let body: TransferBody = parse_body(body)?;
            let source_wallet_id = required(body.source_wallet_id, "source_wallet_id")?;
            let destination_wallet_id =
                required(body.destination_wallet_id, "destination_wallet_id")?;
            let amount = amount(body.amount)?;
            let currency = required(body.currency, "currency")?;

            let id = next_id();
            let bytes = serde_json::to_vec(&TransferRequest {
                header: Header::new(id, action),
                source_wallet_id,
                destination_wallet_id,
                amount,
                currency,
            })?;
            (id, bytes)
        }
        Endpoint::Balance => {
            let wallet_id = wallet_id(route)?;

            let id = next_id();
            let bytes = serde_json::to_vec(&BalanceRequest {
                header: Header::new(id, action),
                wallet_id,
            })?;
            (id, bytes)
        }
        Endpoint::TransactionHistory => {
            let wallet_id = wallet_id(route)?;
            let from = date(route, "from")?;
            let to = date(route, "to")?;

            let id = next_id();
            let bytes = serde_json::to_vec(&HistoryRequest {
                header: Header::new(id, action),
                wallet_id,
                from,
                to,
            })?;
            (id, bytes)
        }
    };

    Ok(bytes)
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    if body.is_empty() {
        return Err(AppError::InvalidRequest("Request body is empty".to_string()));
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidRequest(format!("Malformed JSON body: {}", e)))
}

fn required(value: String, field: &str) -> AppResult<String> {
    if value.is_empty() {
        return Err(AppError::InvalidRequest(format!("Missing required field: {}", field)));
    }
    Ok(value)
}

/// The amount must be well-formed; it is forwarded exactly as sent
fn amount(value: String) -> AppResult<String> {
    let value = required(value, "amount")?;
    value
        .parse::<Amount>()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
    Ok(value)
}

/// Wallet id from the path, percent-decoded
fn wallet_id(route: &PathMatch) -> AppResult<String> {
    let raw = match route.wildcards.get("wallet_id") {
        Some(id) if !id.is_empty() => id,
        _ => return Err(AppError::InvalidRequest("Missing wallet id".to_string())),
    };
    let decoded = urlencoding::decode(raw)
        .map_err(|_| AppError::InvalidRequest(format!("Invalid wallet id {:?}", raw)))?;
    required(decoded.into_owned(), "wallet id")
}

/// Optional `YYYYMMDD` query parameter; absent and empty both mean unbounded
fn date(route: &PathMatch, key: &str) -> AppResult<String> {
    match route.query.get(key) {
        None | Some("") => Ok(String::new()),
        Some(raw) if parse_date(raw).is_some() => Ok(raw.to_string()),
        Some(raw) => Err(AppError::InvalidRequest(format!(
            "Invalid {} date {:?}, expected YYYYMMDD",
            key, raw
        ))),
    }
}
