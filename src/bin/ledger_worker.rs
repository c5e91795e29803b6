//! Ledger worker
//!
//! Serves one ledger operation from its request queue.
//!
//! Run with: cargo run --bin ledger_worker -- deposit

use std::sync::Arc;
use std::time::Duration;

use digital_wallet::config::WorkerConfig;
use digital_wallet::db;
use digital_wallet::ledger::PgLedgerStore;
use digital_wallet::logging::init_tracing;
use digital_wallet::messages::Action;
use digital_wallet::queue::RedisQueue;
use digital_wallet::shutdown::shutdown_signal;
use digital_wallet::worker;
use tokio_util::sync::CancellationToken;

const USAGE: &str =
    "usage: ledger_worker <deposit|withdraw|transfer|balance|transaction_history>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let action = match args.get(1).and_then(|name| Action::from_name(name)) {
        Some(action) => action,
        None => anyhow::bail!(USAGE),
    };

    let config = WorkerConfig::from_env(action)?;

    tracing::info!(action = %action, "Starting ledger worker");
    tracing::info!("Connecting to database...");

    let pool = db::connect(&config).await?;
    db::verify_connection(&pool).await?;

    if !db::check_schema(&pool, &config).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    let store = PgLedgerStore::new(pool.clone(), &config.balances_table, &config.transactions_table)?;
    let queue = RedisQueue::connect(&config.redis_url).await?;
    queue.ping(Duration::from_secs(5)).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    worker::serve(Arc::new(store), Arc::new(queue), config.service, shutdown).await;

    // Cleanup
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}
