//! Domain module
//!
//! Core wallet types, the money codec and business failures.

pub mod error;
pub mod money;
pub mod wallet;

pub use error::LedgerError;
pub use money::{to_display, to_internal, Amount, MoneyError};
pub use wallet::{LedgerEntry, TransactionType, Wallet};
