//! Transaction History Handler
//!
//! Lists the ledger entries of a wallet inside a date window, most recent
//! first. Dates are `YYYYMMDD`; the end date is inclusive.

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use crate::domain::{to_display, LedgerEntry, LedgerError};
use crate::messages::{Action, HistoryItem, HistoryRequest, HistoryResult};

use super::{require, store_failure, LedgerOperation, LedgerStore};

/// Wire format of history dates
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Parse a `YYYYMMDD` date
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

/// Resolve the `[from, to)` window of a history query.
///
/// An empty `from` means 1980-01-01 and an empty `to` means `now`. An
/// explicit `to` is advanced by one day so that the whole end date is
/// included.
pub fn query_window(
    from: &str,
    to: &str,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), LedgerError> {
    let start = if from.is_empty() {
        NaiveDate::from_ymd_opt(1980, 1, 1)
    } else {
        parse_date(from)
    }
    .and_then(start_of_day)
    .ok_or(LedgerError::InvalidStartDate)?;

    let end = if to.is_empty() {
        now
    } else {
        parse_date(to)
            .and_then(|date| date.checked_add_days(Days::new(1)))
            .and_then(start_of_day)
            .ok_or(LedgerError::InvalidEndDate)?
    };

    Ok((start, end))
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl From<&LedgerEntry> for HistoryItem {
    fn from(entry: &LedgerEntry) -> Self {
        HistoryItem {
            date: entry.date_and_time.format(DATE_FORMAT).to_string(),
            transaction_type: entry.transaction_type(),
            currency: entry.currency.clone(),
            amount: to_display(entry.amount.saturating_abs()),
        }
    }
}

/// Handler for transaction history reads
pub struct HistoryHandler {
    store: Arc<dyn LedgerStore>,
}

impl HistoryHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LedgerOperation for HistoryHandler {
    const ACTION: Action = Action::GetTransactionHistory;

    type Request = HistoryRequest;
    type Output = HistoryResult;

    async fn handle(&self, request: &HistoryRequest) -> Result<HistoryResult, LedgerError> {
        require(&request.wallet_id, "wallet_id")?;

        // Unknown wallets are reported before the dates are looked at
        self.store
            .wallet(&request.wallet_id)
            .await
            .map_err(|e| store_failure(Self::ACTION, e))?
            .ok_or(LedgerError::WalletNotFound)?;

        let (from, to) = query_window(&request.from, &request.to, Utc::now())?;

        let entries = self
            .store
            .entries(&request.wallet_id, from, to)
            .await
            .map_err(|e| store_failure(Self::ACTION, e))?;

        Ok(HistoryResult {
            history: Some(entries.iter().map(HistoryItem::from).collect()),
        })
    }
}
