//! Redis-backed queues
//!
//! Publishing is `LPUSH`, consuming is `BRPOP`, which together give FIFO
//! order per queue name.
//!
//! A blocking `BRPOP` holds its connection until it returns, so every
//! long-running consumer (response collector, worker) should own its own
//! `RedisQueue` rather than share the publisher's handle.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;

use super::{MessageQueue, QueueError};

/// Extra time granted to the client side of a `BRPOP` beyond the server-side
/// timeout before the call is abandoned.
const POP_GRACE: Duration = Duration::from_millis(500);

/// Smallest server-side `BRPOP` timeout; `0` would block forever.
const MIN_POP_TIMEOUT: Duration = Duration::from_millis(10);

/// Queue handle over a managed (auto-reconnecting) Redis connection
#[derive(Clone)]
pub struct RedisQueue {
    connection: ConnectionManager,
}

impl RedisQueue {
    /// Connect to the broker at `url` (`redis://host:port/`)
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }

    /// Round-trip a `PING`, bounded by `timeout`
    pub async fn ping(&self, timeout: Duration) -> Result<(), QueueError> {
        let mut connection = self.connection.clone();
        tokio::time::timeout(
            timeout,
            redis::cmd("PING").query_async::<_, String>(&mut connection),
        )
        .await
        .map_err(|_| QueueError::timeout("PING", timeout))??;
        Ok(())
    }
}

#[async_trait]
impl MessageQueue for RedisQueue {
    async fn push(&self, queue: &str, payload: Vec<u8>, timeout: Duration) -> Result<(), QueueError> {
        let mut connection = self.connection.clone();
        let length: i64 = tokio::time::timeout(
            timeout,
            redis::cmd("LPUSH")
                .arg(queue)
                .arg(payload)
                .query_async(&mut connection),
        )
        .await
        .map_err(|_| QueueError::timeout(queue, timeout))??;

        tracing::trace!(queue = %queue, length, "Pushed message");
        Ok(())
    }

    async fn pop(&self, queue: &str, timeout: Duration) -> Result<Option<Vec<u8>>, QueueError> {
        let mut connection = self.connection.clone();
        let server_timeout = timeout.max(MIN_POP_TIMEOUT);

        let popped: Option<(String, Vec<u8>)> = tokio::time::timeout(
            server_timeout + POP_GRACE,
            redis::cmd("BRPOP")
                .arg(queue)
                .arg(server_timeout.as_secs_f64())
                .query_async(&mut connection),
        )
        .await
        .map_err(|_| QueueError::timeout(queue, timeout))??;

        Ok(popped.map(|(_queue, payload)| payload))
    }
}
