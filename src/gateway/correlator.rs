//! Request-response correlation
//!
//! Every request gets a time-ordered 64-bit correlation id:
//!
//! ```text
//! | 41 bits: ms since 2024-01-01 | 10 bits: instance id | 12 bits: sequence |
//! ```
//!
//! Ids are unique across gateway instances as long as their instance ids
//! differ. The correlator publishes the request and then polls the shared
//! pending-response cache until the matching response shows up or the
//! operation's wait timeout elapses.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::ServiceConfig;
use crate::error::{AppError, AppResult};
use crate::queue::MessageQueue;

use super::pending::PendingResponses;

/// Largest instance id that fits in a correlation id
pub const MAX_INSTANCE_ID: u16 = (1 << INSTANCE_BITS) - 1;

/// 2024-01-01T00:00:00Z in Unix milliseconds
const EPOCH_MS: i64 = 1_704_067_200_000;
const INSTANCE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;

/// Lock-free generator of correlation ids
#[derive(Debug)]
pub struct IdGenerator {
    instance_id: i64,
    /// Last issued `(ms << SEQUENCE_BITS) | sequence`
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new(instance_id: u16) -> Self {
        Self {
            instance_id: i64::from(instance_id.min(MAX_INSTANCE_ID)),
            last: AtomicI64::new(0),
        }
    }

    pub fn instance_id(&self) -> u16 {
        self.instance_id as u16
    }

    /// Issue the next id. Ids from one generator are strictly increasing;
    /// when the sequence of a millisecond runs out, the next millisecond is
    /// borrowed.
    pub fn next_id(&self) -> i64 {
        let now = (Utc::now().timestamp_millis() - EPOCH_MS).max(0);
        let candidate = now << SEQUENCE_BITS;

        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = candidate.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return self.compose(next),
                Err(actual) => last = actual,
            }
        }
    }

    fn compose(&self, stamp: i64) -> i64 {
        let millis = stamp >> SEQUENCE_BITS;
        let sequence = stamp & SEQUENCE_MASK;
        (millis << (INSTANCE_BITS + SEQUENCE_BITS)) | (self.instance_id << SEQUENCE_BITS) | sequence
    }
}

/// Split an id into `(ms since epoch, instance id, sequence)`
pub fn decompose(id: i64) -> (i64, u16, u16) {
    let millis = id >> (INSTANCE_BITS + SEQUENCE_BITS);
    let instance = (id >> SEQUENCE_BITS) & i64::from(MAX_INSTANCE_ID);
    let sequence = id & SEQUENCE_MASK;
    (millis, instance as u16, sequence as u16)
}

/// Publishes requests and waits for their correlated responses
pub struct Correlator {
    ids: IdGenerator,
    publisher: Arc<dyn MessageQueue>,
    pending: PendingResponses,
    poll_interval: Duration,
}

impl Correlator {
    pub fn new(
        instance_id: u16,
        publisher: Arc<dyn MessageQueue>,
        pending: PendingResponses,
        poll_interval: Duration,
    ) -> Self {
        Self {
            ids: IdGenerator::new(instance_id),
            publisher,
            pending,
            poll_interval,
        }
    }

    pub fn instance_id(&self) -> u16 {
        self.ids.instance_id()
    }

    /// Correlation id for the next request
    pub fn next_id(&self) -> i64 {
        self.ids.next_id()
    }

    /// Publish `request` (already carrying correlation id `id`) to the
    /// operation's request queue and wait for the response bytes.
    ///
    /// A failed publish is a queue error (500); no response within
    /// `cache_wait_timeout` is a timeout (408).
    pub async fn send_and_await(
        &self,
        id: i64,
        request: Vec<u8>,
        service: &ServiceConfig,
    ) -> AppResult<Vec<u8>> {
        self.publisher
            .push(&service.requests_queue, request, service.queue_timeout)
            .await
            .map_err(|e| {
                tracing::error!(id, queue = %service.requests_queue, error = %e, "Failed to publish request");
                AppError::Queue(e)
            })?;

        let deadline = Instant::now() + service.cache_wait_timeout;
        loop {
            if let Some(response) = self.pending.take(id) {
                return Ok(response);
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }

        tracing::warn!(
            id,
            action = %service.action,
            timeout = ?service.cache_wait_timeout,
            "Timed out waiting for response"
        );
        Err(AppError::Timeout)
    }
}
