//! Digital Wallet - HTTP gateway
//!
//! Accepts wallet calls over HTTP, forwards them to the ledger workers over
//! Redis queues and relays the correlated responses.

use std::sync::Arc;
use std::time::Duration;

use digital_wallet::config::GatewayConfig;
use digital_wallet::gateway::{self, GatewayState, ResponseCollector};
use digital_wallet::logging::init_tracing;
use digital_wallet::shutdown::shutdown_signal;
use digital_wallet::queue::RedisQueue;
use tokio_util::sync::CancellationToken;

/// How long background tasks get to stop once the server is down
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = GatewayConfig::from_env()?;

    tracing::info!("Starting digital wallet gateway");
    tracing::info!("Connecting to broker...");

    let publisher = RedisQueue::connect(&config.redis_url).await?;
    publisher.ping(Duration::from_secs(5)).await?;

    tracing::info!("Broker connected successfully");

    let state = GatewayState::new(config, Arc::new(publisher));
    let shutdown = CancellationToken::new();

    let mut tasks = Vec::new();
    for service in state.config.services() {
        // Collectors block on BRPOP, so each one owns its own connection
        let queue = RedisQueue::connect(&state.config.redis_url).await?;
        let collector = ResponseCollector::new(Arc::new(queue), state.pending.clone(), service.clone());
        tasks.push(collector.start(shutdown.clone()));
    }
    tasks.push(state.sweep().start(shutdown.clone()));

    tokio::spawn(shutdown_signal(shutdown.clone()));

    gateway::serve(state, shutdown.clone()).await?;

    // Stop background tasks
    shutdown.cancel();
    for task in tasks {
        let abort = task.abort_handle();
        if tokio::time::timeout(TASK_STOP_TIMEOUT, task).await.is_err() {
            abort.abort();
        }
    }

    tracing::info!("Gateway stopped. Goodbye!");
    Ok(())
}
