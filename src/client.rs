//! Gateway HTTP client
//!
//! Backs the `wallet_client` binary: parses a command line into a
//! [`Command`], sends it to the gateway and renders the response envelope
//! for the console.

use anyhow::{anyhow, bail, Result};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::ClientConfig;
use crate::error::ErrorResponse;
use crate::messages::{BalanceResult, BalanceUpdate, HistoryResult, ResponseEnvelope, Status};

/// Help text printed for unknown or malformed commands
pub const HELP: &str = "\
DIGITAL WALLET CLIENT

Deposit an amount into a wallet in the given currency:

\twallet_client deposit <wallet_id> <currency> <amount>

Withdraw an amount from a wallet in the given currency:

\twallet_client withdraw <wallet_id> <currency> <amount>

Transfer an amount between two wallets of the same currency:

\twallet_client transfer <source_wallet_id> <destination_wallet_id> <currency> <amount>

Get the balance of a wallet:

\twallet_client get_balance <wallet_id>

Get the transaction history of a wallet, dates as YYYYMMDD, both inclusive:

\twallet_client get_transaction_history <wallet_id> [from] [to]
";

/// One client invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Deposit {
        wallet_id: String,
        currency: String,
        amount: String,
    },
    Withdraw {
        wallet_id: String,
        currency: String,
        amount: String,
    },
    Transfer {
        source_wallet_id: String,
        destination_wallet_id: String,
        currency: String,
        amount: String,
    },
    GetBalance {
        wallet_id: String,
    },
    GetTransactionHistory {
        wallet_id: String,
        from: Option<String>,
        to: Option<String>,
    },
}

impl Command {
    /// Parse the arguments that follow the program name
    pub fn parse(args: &[String]) -> Result<Self> {
        let (name, rest) = args.split_first().ok_or_else(|| anyhow!("No command given"))?;
        if rest.iter().any(|arg| arg.is_empty()) {
            bail!("Arguments must not be empty");
        }
        let arg = |i: usize| rest[i].clone();

        let command = match (name.as_str(), rest.len()) {
            ("deposit", 3) => Command::Deposit {
                wallet_id: arg(0),
                currency: arg(1),
                amount: arg(2),
            },
            ("withdraw", 3) => Command::Withdraw {
                wallet_id: arg(0),
                currency: arg(1),
                amount: arg(2),
            },
            ("transfer", 4) => Command::Transfer {
                source_wallet_id: arg(0),
                destination_wallet_id: arg(1),
                currency: arg(2),
                amount: arg(3),
            },
            ("get_balance", 1) => Command::GetBalance { wallet_id: arg(0) },
            ("get_transaction_history", 1..=3) => Command::GetTransactionHistory {
                wallet_id: arg(0),
                from: rest.get(1).cloned(),
                to: rest.get(2).cloned(),
            },
            ("deposit" | "withdraw" | "transfer" | "get_balance" | "get_transaction_history", _) => {
                bail!("Incorrect number of arguments for {}", name)
            }
            _ => bail!("Unknown command {:?}", name),
        };
        Ok(command)
    }
}

/// Client for the gateway's wallet routes
pub struct WalletClient {
    client: Client,
    base: Url,
}

impl WalletClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Digital Wallet Client")
            .timeout(config.request_timeout)
            .build()?;
        let base = Url::parse(&config.gateway_url)
            .map_err(|e| anyhow!("Invalid gateway URL {}: {}", config.gateway_url, e))?;
        Ok(Self { client, base })
    }

    /// URL of `segments` under the gateway base; each segment is
    /// percent-encoded
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Gateway URL cannot be a base: {}", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Run `command` and render the outcome as console lines
    pub async fn execute(&self, command: &Command) -> Result<Vec<String>> {
        match command {
            Command::Deposit {
                wallet_id,
                currency,
                amount,
            } => {
                let url = self.url(&["wallets", wallet_id, "deposits"])?;
                let body = json!({ "amount": amount, "currency": currency });
                let response: ResponseEnvelope<BalanceUpdate> = self.send(Method::POST, url, Some(body)).await?;
                Ok(render_balance_update(&response))
            }
            Command::Withdraw {
                wallet_id,
                currency,
                amount,
            } => {
                let url = self.url(&["wallets", wallet_id, "withdrawals"])?;
                let body = json!({ "amount": amount, "currency": currency });
                let response: ResponseEnvelope<BalanceUpdate> = self.send(Method::POST, url, Some(body)).await?;
                Ok(render_balance_update(&response))
            }
            Command::Transfer {
                source_wallet_id,
                destination_wallet_id,
                currency,
                amount,
            } => {
                let url = self.url(&["transfer"])?;
                let body = json!({
                    "source_wallet_id": source_wallet_id,
                    "destination_wallet_id": destination_wallet_id,
                    "amount": amount,
                    "currency": currency,
                });
                let response: ResponseEnvelope<BalanceUpdate> = self.send(Method::POST, url, Some(body)).await?;
                Ok(render_balance_update(&response))
            }
            Command::GetBalance { wallet_id } => {
                let url = self.url(&["wallets", wallet_id, "balance"])?;
                let response: ResponseEnvelope<BalanceResult> = self.send(Method::GET, url, None).await?;
                Ok(render_balance(&response))
            }
            Command::GetTransactionHistory { wallet_id, from, to } => {
                let mut url = self.url(&["wallets", wallet_id, "transaction_history"])?;
                {
                    let mut query = url.query_pairs_mut();
                    if let Some(from) = from {
                        query.append_pair("from", from);
                    }
                    if let Some(to) = to {
                        query.append_pair("to", to);
                    }
                }
                if url.query() == Some("") {
                    url.set_query(None);
                }
                let response: ResponseEnvelope<HistoryResult> = self.send(Method::GET, url, None).await?;
                Ok(render_history(&response))
            }
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<ResponseEnvelope<T>> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let res = request.send().await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            bail!("{}", describe_http_error(status, &text));
        }
        res.json::<ResponseEnvelope<T>>()
            .await
            .map_err(|e| anyhow!("Error parsing JSON response: {}", e))
    }
}

/// Human-readable form of a non-200 gateway answer
pub fn describe_http_error(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error) => match error.details {
            Some(details) => format!("HTTP {}: {} ({})", status.as_u16(), error.error, details),
            None => format!("HTTP {}: {}", status.as_u16(), error.error),
        },
        Err(_) if status == StatusCode::REQUEST_TIMEOUT => {
            format!("HTTP {}: the gateway timed out waiting for a response", status.as_u16())
        }
        Err(_) => format!("HTTP {}", status),
    }
}

fn status_line<T>(response: &ResponseEnvelope<T>) -> String {
    let status = match response.status {
        Status::Successful => "Successful",
        Status::Failed => "Failed",
    };
    format!("Request status: {}", status)
}

fn failure_lines<T>(response: &ResponseEnvelope<T>) -> Option<Vec<String>> {
    if response.is_successful() {
        return None;
    }
    Some(vec![
        status_line(response),
        format!(
            "Error message: {}",
            response.error_message.as_deref().unwrap_or("")
        ),
    ])
}

pub fn render_balance_update(response: &ResponseEnvelope<BalanceUpdate>) -> Vec<String> {
    if let Some(lines) = failure_lines(response) {
        return lines;
    }
    vec![
        status_line(response),
        format!(
            "New balance: {} {}",
            response.result.currency.as_deref().unwrap_or(""),
            response.result.new_balance.as_deref().unwrap_or("")
        ),
    ]
}

pub fn render_balance(response: &ResponseEnvelope<BalanceResult>) -> Vec<String> {
    if let Some(lines) = failure_lines(response) {
        return lines;
    }
    vec![
        status_line(response),
        format!(
            "Balance: {} {}",
            response.result.currency.as_deref().unwrap_or(""),
            response.result.balance.as_deref().unwrap_or("")
        ),
    ]
}

pub fn render_history(response: &ResponseEnvelope<HistoryResult>) -> Vec<String> {
    if let Some(lines) = failure_lines(response) {
        return lines;
    }
    let history = response.result.history.as_deref().unwrap_or(&[]);

    let mut lines = vec![status_line(response)];
    if history.is_empty() {
        lines.push("No transactions".to_string());
    }
    for item in history {
        lines.push(format!(
            "{}  {}  {} {}",
            item.date, item.transaction_type, item.currency, item.amount
        ));
    }
    lines
}
