//! Message queue module
//!
//! Named FIFO queues of opaque byte payloads. The gateway publishes requests
//! and drains responses through this interface; workers do the reverse.

mod error;
mod memory;
mod redis_queue;

pub use self::error::QueueError;
pub use self::memory::InMemoryQueue;
pub use self::redis_queue::RedisQueue;

use async_trait::async_trait;
use std::time::Duration;

/// Queue primitives offered by the broker.
///
/// Both operations are bounded by `timeout`, so callers can observe a
/// shutdown request between calls.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Append `payload` to the tail of `queue`.
    async fn push(&self, queue: &str, payload: Vec<u8>, timeout: Duration) -> Result<(), QueueError>;

    /// Remove the head of `queue`, waiting up to `timeout` for an item.
    /// Returns `Ok(None)` when nothing arrived in time.
    async fn pop(&self, queue: &str, timeout: Duration) -> Result<Option<Vec<u8>>, QueueError>;
}
