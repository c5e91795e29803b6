//! Queue Errors

use std::time::Duration;

/// Errors that can occur talking to the broker
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Broker connection or command failure
    #[error("Broker error: {0}")]
    Broker(#[from] redis::RedisError),

    /// Operation did not complete within its bound
    #[error("Queue operation on '{queue}' timed out after {timeout:?}")]
    Timeout { queue: String, timeout: Duration },

    /// Queue handle has been closed
    #[error("Queue is closed")]
    Closed,
}

impl QueueError {
    pub fn timeout(queue: &str, timeout: Duration) -> Self {
        Self::Timeout {
            queue: queue.to_string(),
            timeout,
        }
    }

    /// Check if this error is transient (retrying later may help)
    pub fn is_transient(&self) -> bool {
        match self {
            QueueError::Broker(e) => e.is_timeout() || e.is_connection_dropped() || e.is_io_error(),
            QueueError::Timeout { .. } => true,
            QueueError::Closed => false,
        }
    }
}
