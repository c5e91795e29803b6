//! Scheduled jobs
//!
//! Periodic eviction of responses that arrived after their caller gave up.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use super::pending::PendingResponses;

/// Evicts unclaimed pending responses older than a TTL
pub struct PendingSweep {
    pending: PendingResponses,
    ttl: Duration,
    interval: Duration,
}

impl PendingSweep {
    pub fn new(pending: PendingResponses, ttl: Duration, interval: Duration) -> Self {
        Self {
            pending,
            ttl,
            interval,
        }
    }

    /// Start the sweep in the background until `shutdown` is cancelled
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(shutdown).await;
        })
    }

    async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(ttl = ?self.ttl, interval = ?self.interval, "Pending response sweep started");

        let mut ticker = interval(self.interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_once();
                }
            }
        }

        tracing::info!("Pending response sweep stopped");
    }

    /// Run one sweep; returns the number of evicted responses
    pub fn run_once(&self) -> usize {
        let evicted = self.pending.evict_older_than(self.ttl);
        if evicted > 0 {
            tracing::warn!(
                evicted,
                remaining = self.pending.len(),
                "Evicted unclaimed responses"
            );
        }
        evicted
    }
}
