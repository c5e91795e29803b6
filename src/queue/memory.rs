//! In-process queues
//!
//! Named FIFO queues guarded by a mutex; blocked consumers are woken through
//! a shared `Notify`.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::{MessageQueue, QueueError};

/// A thread-safe in-process broker.
///
/// Clones share the same queues, so a gateway and its workers can be wired
/// together inside one process for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    pushed: Notify,
}

impl InMemoryQueue {
    /// Creates a new broker with no queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages currently waiting in `queue`.
    pub fn len(&self, queue: &str) -> usize {
        let queues = self.inner.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues.get(queue).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }

    fn try_pop(&self, queue: &str) -> Option<Vec<u8>> {
        let mut queues = self.inner.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues.get_mut(queue).and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn push(&self, queue: &str, payload: Vec<u8>, _timeout: Duration) -> Result<(), QueueError> {
        {
            let mut queues = self.inner.queues.lock().unwrap_or_else(PoisonError::into_inner);
            queues.entry(queue.to_string()).or_default().push_back(payload);
        }
        self.inner.pushed.notify_waiters();
        Ok(())
    }

    async fn pop(&self, queue: &str, timeout: Duration) -> Result<Option<Vec<u8>>, QueueError> {
        let deadline = Instant::now() + timeout;

        loop {
            // Register interest before checking, so a push in between is not missed.
            let pushed = self.inner.pushed.notified();
            tokio::pin!(pushed);
            pushed.as_mut().enable();

            if let Some(payload) = self.try_pop(queue) {
                return Ok(Some(payload));
            }

            if tokio::time::timeout_at(deadline, pushed).await.is_err() {
                return Ok(self.try_pop(queue));
            }
        }
    }
}
