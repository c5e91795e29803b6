//! Digital Wallet Library
//!
//! An HTTP gateway bridged over message queues to ledger workers that keep
//! wallet balances and an append-only ledger in a relational store.

pub mod client;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod messages;
pub mod queue;
pub mod shutdown;
pub mod worker;

pub use config::{ClientConfig, GatewayConfig, ServiceConfig, WorkerConfig};
pub use domain::{to_display, to_internal, Amount, LedgerError, MoneyError};
pub use error::{AppError, AppResult, ErrorResponse};
pub use gateway::{create_router, GatewayState};
pub use messages::{Action, Header, ResponseEnvelope, Status};
