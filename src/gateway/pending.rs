//! Pending-response cache
//!
//! Raw response bytes keyed by correlation id, filled by the collectors and
//! drained by the waiting handlers. Taking an entry removes it, so a
//! response is delivered at most once. Entries nobody claims are evicted by
//! the sweep job once they are older than the TTL.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry {
    payload: Vec<u8>,
    inserted_at: Instant,
}

/// Shared concurrent cache of correlated responses
#[derive(Debug, Clone, Default)]
pub struct PendingResponses {
    entries: Arc<DashMap<i64, Entry>>,
}

impl PendingResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the response for `id`, replacing any previous one
    pub fn insert(&self, id: i64, payload: Vec<u8>) {
        let previous = self.entries.insert(
            id,
            Entry {
                payload,
                inserted_at: Instant::now(),
            },
        );
        if previous.is_some() {
            tracing::warn!(id, "Replaced an unclaimed response");
        }
    }

    /// Atomically remove and return the response for `id`
    pub fn take(&self, id: i64) -> Option<Vec<u8>> {
        self.entries.remove(&id).map(|(_, entry)| entry.payload)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict entries older than `ttl`; returns how many were removed
    pub fn evict_older_than(&self, ttl: Duration) -> usize {
        let mut evicted = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.inserted_at.elapsed() < ttl;
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }
}
