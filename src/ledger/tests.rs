//! Ledger engine tests
//!
//! Every engine runs against the in-memory store; the Postgres store is
//! covered by the ignored suite in `tests/postgres_ledger.rs`.

use chrono::{Duration, Utc};
use std::sync::Arc;

use super::*;
use crate::domain::{LedgerEntry, LedgerError, TransactionType, Wallet};
use crate::messages::{
    BalanceRequest, DepositRequest, Header, HistoryRequest, TransferRequest, WithdrawRequest,
};

fn setup() -> (InMemoryLedgerStore, Arc<dyn LedgerStore>) {
    let store = InMemoryLedgerStore::new();
    let shared: Arc<dyn LedgerStore> = Arc::new(store.clone());
    (store, shared)
}

fn deposit(wallet_id: &str, amount: &str, currency: &str) -> DepositRequest {
    DepositRequest {
        header: Header::new(1, Action::Deposit),
        wallet_id: wallet_id.to_string(),
        amount: amount.to_string(),
        currency: currency.to_string(),
    }
}

fn withdraw(wallet_id: &str, amount: &str, currency: &str) -> WithdrawRequest {
    WithdrawRequest {
        header: Header::new(2, Action::Withdraw),
        wallet_id: wallet_id.to_string(),
        amount: amount.to_string(),
        currency: currency.to_string(),
    }
}

fn transfer(source: &str, destination: &str, amount: &str, currency: &str) -> TransferRequest {
    TransferRequest {
        header: Header::new(3, Action::Transfer),
        source_wallet_id: source.to_string(),
        destination_wallet_id: destination.to_string(),
        amount: amount.to_string(),
        currency: currency.to_string(),
    }
}

fn history(wallet_id: &str, from: &str, to: &str) -> HistoryRequest {
    HistoryRequest {
        header: Header::new(5, Action::GetTransactionHistory),
        wallet_id: wallet_id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// The sum of a wallet's ledger entries equals its balance
async fn assert_consistent(store: &InMemoryLedgerStore, wallet_id: &str) {
    let total: i64 = store.ledger(wallet_id).await.iter().map(|e| e.amount).sum();
    assert_eq!(store.balance(wallet_id).await, Some(total));
}

// =========================================================================
// Deposit
// =========================================================================

#[tokio::test]
async fn test_deposits_accumulate_and_reject_other_currency() {
    let (store, shared) = setup();
    let handler = DepositHandler::new(shared);

    let first = handler.handle(&deposit("w1", "101.11", "SGD")).await.unwrap();
    assert_eq!(first.new_balance.as_deref(), Some("101.11"));

    let second = handler.handle(&deposit("w1", "10.00", "SGD")).await.unwrap();
    assert_eq!(second.currency.as_deref(), Some("SGD"));
    assert_eq!(second.new_balance.as_deref(), Some("111.11"));

    let err = handler.handle(&deposit("w1", "100", "HKD")).await.unwrap_err();
    assert!(matches!(err, LedgerError::CurrencyMismatch { .. }));
    assert!(!err.to_string().is_empty());

    assert_eq!(store.balance("w1").await, Some(11111));
    assert_eq!(store.ledger("w1").await.len(), 2);
    assert_consistent(&store, "w1").await;
}

#[tokio::test]
async fn test_deposit_rejects_invalid_amount_without_touching_store() {
    let (store, shared) = setup();
    let handler = DepositHandler::new(shared);

    let err = handler.handle(&deposit("w1", "1.001", "SGD")).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    let err = handler.handle(&deposit("w1", "-5", "SGD")).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    assert_eq!(store.balance("w1").await, None);
}

#[tokio::test]
async fn test_deposit_requires_wallet_and_currency() {
    let (_, shared) = setup();
    let handler = DepositHandler::new(shared);

    let err = handler.handle(&deposit("", "1", "SGD")).await.unwrap_err();
    assert_eq!(err, LedgerError::MissingField("wallet_id"));

    let err = handler.handle(&deposit("w1", "1", "")).await.unwrap_err();
    assert_eq!(err, LedgerError::MissingField("currency"));
}

#[tokio::test]
async fn test_commit_failure_reports_database_error() {
    let (store, shared) = setup();
    let handler = DepositHandler::new(shared);
    store.fail_commits(true);

    let err = handler.handle(&deposit("w1", "5", "SGD")).await.unwrap_err();
    assert_eq!(err, LedgerError::Database);
    assert_eq!(err.to_string(), "Database error");
    assert_eq!(store.balance("w1").await, None);
}

// =========================================================================
// Withdraw
// =========================================================================

#[tokio::test]
async fn test_withdraw_reduces_balance() {
    let (store, shared) = setup();
    DepositHandler::new(shared.clone())
        .handle(&deposit("w1", "50", "SGD"))
        .await
        .unwrap();

    let update = WithdrawHandler::new(shared)
        .handle(&withdraw("w1", "20.50", "SGD"))
        .await
        .unwrap();

    assert_eq!(update.new_balance.as_deref(), Some("29.50"));
    assert_eq!(store.ledger("w1").await.last().map(|e| e.amount), Some(-2050));
    assert_consistent(&store, "w1").await;
}

#[tokio::test]
async fn test_withdraw_more_than_balance_fails() {
    let (store, shared) = setup();
    store.insert_wallet(Wallet::new("w1", "SGD", 1000)).await;

    let err = WithdrawHandler::new(shared)
        .handle(&withdraw("w1", "10.01", "SGD"))
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::InsufficientFunds);
    assert_eq!(err.to_string(), "Insufficient funds in wallet");
    assert_eq!(store.balance("w1").await, Some(1000));
    assert!(store.ledger("w1").await.is_empty());
}

#[tokio::test]
async fn test_withdraw_whole_balance() {
    let (store, shared) = setup();
    store.insert_wallet(Wallet::new("w1", "SGD", 1000)).await;

    let update = WithdrawHandler::new(shared)
        .handle(&withdraw("w1", "10", "SGD"))
        .await
        .unwrap();

    assert_eq!(update.new_balance.as_deref(), Some("0.00"));
    assert_eq!(store.balance("w1").await, Some(0));
}

#[tokio::test]
async fn test_withdraw_unknown_wallet_or_currency() {
    let (store, shared) = setup();
    store.insert_wallet(Wallet::new("w1", "SGD", 1000)).await;
    let handler = WithdrawHandler::new(shared);

    let err = handler.handle(&withdraw("nobody", "1", "SGD")).await.unwrap_err();
    assert_eq!(err, LedgerError::WalletNotFound);

    let err = handler.handle(&withdraw("w1", "1", "USD")).await.unwrap_err();
    assert_eq!(err, LedgerError::currency_mismatch("SGD", "USD"));
    assert_eq!(store.balance("w1").await, Some(1000));
}

// =========================================================================
// Transfer
// =========================================================================

#[tokio::test]
async fn test_transfer_conserves_total() {
    let (store, shared) = setup();
    store.insert_wallet(Wallet::new("alice", "SGD", 10_000)).await;
    store.insert_wallet(Wallet::new("bob", "SGD", 2_500)).await;

    let update = TransferHandler::new(shared)
        .handle(&transfer("alice", "bob", "30.25", "SGD"))
        .await
        .unwrap();

    assert_eq!(update.new_balance.as_deref(), Some("69.75"));
    let alice = store.balance("alice").await.unwrap();
    let bob = store.balance("bob").await.unwrap();
    assert_eq!(alice, 10_000 - 3_025);
    assert_eq!(bob, 2_500 + 3_025);
    assert_eq!(alice + bob, 12_500);

    assert_eq!(store.ledger("alice").await[0].amount, -3_025);
    assert_eq!(store.ledger("bob").await[0].amount, 3_025);
}

#[tokio::test]
async fn test_transfer_in_reverse_id_order() {
    let (store, shared) = setup();
    store.insert_wallet(Wallet::new("alice", "SGD", 1_000)).await;
    store.insert_wallet(Wallet::new("bob", "SGD", 1_000)).await;

    let update = TransferHandler::new(shared)
        .handle(&transfer("bob", "alice", "4", "SGD"))
        .await
        .unwrap();

    assert_eq!(update.new_balance.as_deref(), Some("6.00"));
    assert_eq!(store.balance("alice").await, Some(1_400));
    assert_eq!(store.balance("bob").await, Some(600));
}

#[tokio::test]
async fn test_transfer_exceeding_balance_changes_nothing() {
    let (store, shared) = setup();
    store.insert_wallet(Wallet::new("alice", "SGD", 1_000)).await;
    store.insert_wallet(Wallet::new("bob", "SGD", 500)).await;

    let err = TransferHandler::new(shared)
        .handle(&transfer("alice", "bob", "10.01", "SGD"))
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::InsufficientSourceFunds);
    assert_eq!(store.balance("alice").await, Some(1_000));
    assert_eq!(store.balance("bob").await, Some(500));
}

#[tokio::test]
async fn test_transfer_failure_reasons() {
    let (store, shared) = setup();
    store.insert_wallet(Wallet::new("alice", "SGD", 1_000)).await;
    store.insert_wallet(Wallet::new("bob", "SGD", 500)).await;
    store.insert_wallet(Wallet::new("carol", "HKD", 500)).await;
    let handler = TransferHandler::new(shared);

    let cases = [
        (transfer("ghost", "bob", "1", "SGD"), LedgerError::SourceWalletNotFound),
        (transfer("alice", "ghost", "1", "SGD"), LedgerError::DestinationWalletNotFound),
        (transfer("alice", "alice", "1", "SGD"), LedgerError::SameWalletTransfer),
        (
            transfer("carol", "bob", "1", "SGD"),
            LedgerError::SourceCurrencyMismatch {
                wallet: "HKD".to_string(),
                requested: "SGD".to_string(),
            },
        ),
        (
            transfer("alice", "carol", "1", "SGD"),
            LedgerError::DestinationCurrencyMismatch {
                wallet: "HKD".to_string(),
                requested: "SGD".to_string(),
            },
        ),
    ];

    for (request, expected) in cases {
        let err = handler.handle(&request).await.unwrap_err();
        assert_eq!(err, expected);
    }

    assert_eq!(store.balance("alice").await, Some(1_000));
    assert_eq!(store.balance("bob").await, Some(500));
    assert_eq!(store.balance("carol").await, Some(500));
}

#[tokio::test]
async fn test_concurrent_opposite_transfers() {
    let (store, shared) = setup();
    store.record(LedgerEntry::credit("alice", "SGD", 100_000, Utc::now())).await;
    store.record(LedgerEntry::credit("bob", "SGD", 100_000, Utc::now())).await;
    let handler = Arc::new(TransferHandler::new(shared));

    let mut tasks = Vec::new();
    for i in 0..20 {
        let handler = Arc::clone(&handler);
        let request = if i % 2 == 0 {
            transfer("alice", "bob", "10", "SGD")
        } else {
            transfer("bob", "alice", "7", "SGD")
        };
        tasks.push(tokio::spawn(async move { handler.handle(&request).await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let alice = store.balance("alice").await.unwrap();
    let bob = store.balance("bob").await.unwrap();
    assert_eq!(alice, 100_000 - 10 * 1_000 + 10 * 700);
    assert_eq!(alice + bob, 200_000);
    assert_consistent(&store, "alice").await;
    assert_consistent(&store, "bob").await;
}

// =========================================================================
// Balance / History
// =========================================================================

#[tokio::test]
async fn test_balance_read() {
    let (store, shared) = setup();
    store.insert_wallet(Wallet::new("w1", "SGD", 23)).await;
    let handler = BalanceHandler::new(shared);

    let request = BalanceRequest {
        header: Header::new(4, Action::GetBalance),
        wallet_id: "w1".to_string(),
    };
    let result = handler.handle(&request).await.unwrap();
    assert_eq!(result.currency.as_deref(), Some("SGD"));
    assert_eq!(result.balance.as_deref(), Some("0.23"));

    let missing = BalanceRequest {
        header: Header::new(4, Action::GetBalance),
        wallet_id: "nobody".to_string(),
    };
    assert_eq!(handler.handle(&missing).await.unwrap_err(), LedgerError::WalletNotFound);
}

#[tokio::test]
async fn test_history_window_is_inclusive_and_most_recent_first() {
    let (store, shared) = setup();
    let now = Utc::now();
    let days_ago = |n: i64| now - Duration::days(n);

    store.record(LedgerEntry::credit("w1", "SGD", 100_000, days_ago(5))).await;
    store.record(LedgerEntry::credit("w1", "SGD", 20_000, days_ago(3))).await;
    store.record(LedgerEntry::debit("w1", "SGD", 5_050, days_ago(2))).await;
    store.record(LedgerEntry::credit("w1", "SGD", 1_000, days_ago(1))).await;

    let from = days_ago(3).format("%Y%m%d").to_string();
    let to = days_ago(2).format("%Y%m%d").to_string();
    let result = HistoryHandler::new(shared)
        .handle(&history("w1", &from, &to))
        .await
        .unwrap();

    let items = result.history.unwrap();
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].date, to);
    assert_eq!(items[0].transaction_type, TransactionType::Withdrawal);
    assert_eq!(items[0].amount, "50.50");

    assert_eq!(items[1].date, from);
    assert_eq!(items[1].transaction_type, TransactionType::Deposit);
    assert_eq!(items[1].amount, "200.00");
}

#[tokio::test]
async fn test_history_defaults_to_all_time() {
    let (store, shared) = setup();
    let now = Utc::now();
    store.record(LedgerEntry::credit("w1", "SGD", 100, now - Duration::days(4000))).await;
    store.record(LedgerEntry::debit("w1", "SGD", 40, now - Duration::days(1))).await;

    let result = HistoryHandler::new(shared)
        .handle(&history("w1", "", ""))
        .await
        .unwrap();

    let amounts: Vec<String> = result.history.unwrap().into_iter().map(|i| i.amount).collect();
    assert_eq!(amounts, vec!["0.40", "1.00"]);
}

#[tokio::test]
async fn test_history_checks_wallet_before_dates() {
    let (store, shared) = setup();
    store.insert_wallet(Wallet::new("w1", "SGD", 0)).await;
    let handler = HistoryHandler::new(shared);

    let err = handler.handle(&history("nobody", "bad", "")).await.unwrap_err();
    assert_eq!(err, LedgerError::WalletNotFound);

    let err = handler.handle(&history("w1", "bad", "")).await.unwrap_err();
    assert_eq!(err, LedgerError::InvalidStartDate);

    let err = handler.handle(&history("w1", "", "20241340")).await.unwrap_err();
    assert_eq!(err, LedgerError::InvalidEndDate);

    let empty = handler.handle(&history("w1", "", "")).await.unwrap();
    assert_eq!(empty.history, Some(vec![]));
}
