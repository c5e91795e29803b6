//! Response collectors
//!
//! One collector per ledger operation drains that operation's response
//! queue and files each response in the pending cache under its
//! correlation id. Only the header is parsed; the stored bytes are the ones
//! the worker sent.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ServiceConfig;
use crate::messages::HeaderOnly;
use crate::queue::MessageQueue;

use super::pending::PendingResponses;

/// Pause after a broker failure before popping again
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Drains one response queue into the pending cache
pub struct ResponseCollector {
    queue: Arc<dyn MessageQueue>,
    pending: PendingResponses,
    service: ServiceConfig,
}

impl ResponseCollector {
    /// `queue` should be a handle the collector does not share with other
    /// blocking consumers.
    pub fn new(queue: Arc<dyn MessageQueue>, pending: PendingResponses, service: ServiceConfig) -> Self {
        Self {
            queue,
            pending,
            service,
        }
    }

    /// Start collecting in the background until `shutdown` is cancelled
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(shutdown).await;
        })
    }

    /// File one raw response. Returns the correlation id it was stored
    /// under, or `None` when the message was dropped.
    pub fn collect(&self, payload: Vec<u8>) -> Option<i64> {
        let header = match serde_json::from_slice::<HeaderOnly>(&payload) {
            Ok(view) => view.header,
            Err(e) => {
                tracing::warn!(
                    queue = %self.service.responses_queue,
                    error = %e,
                    "Dropping undeserialisable response"
                );
                return None;
            }
        };

        if header.action != self.service.action {
            tracing::warn!(
                id = header.id,
                action = %header.action,
                queue = %self.service.responses_queue,
                "Response action does not match its queue"
            );
        }

        self.pending.insert(header.id, payload);
        tracing::debug!(id = header.id, action = %header.action, "Response collected");
        Some(header.id)
    }

    async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            action = %self.service.action,
            queue = %self.service.responses_queue,
            "Response collector started"
        );

        // Each pop is bounded by the queue timeout
        while !shutdown.is_cancelled() {
            let popped = self
                .queue
                .pop(&self.service.responses_queue, self.service.queue_timeout)
                .await;

            match popped {
                Ok(Some(payload)) => {
                    self.collect(payload);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        queue = %self.service.responses_queue,
                        error = %e,
                        transient = e.is_transient(),
                        "Failed to pop response"
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        tracing::info!(action = %self.service.action, "Response collector stopped");
    }
}
