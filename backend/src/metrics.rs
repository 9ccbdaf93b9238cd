//! Counters for the subscriptions gateway.
//!
//! All counters are backed by atomics for lock-free concurrent access.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::access::AccessError;

/// Aggregated metrics for the subscriptions gateway.
///
/// Thread-safe via atomics; shared as `Arc<Metrics>`.
#[derive(Default)]
pub struct Metrics {
    /// Access checks that found an active subscription.
    pub access_granted: AtomicU64,
    /// Access checks refused because the subscription expired.
    pub access_expired: AtomicU64,
    /// Access checks refused because no subscription exists.
    pub access_not_found: AtomicU64,
    /// Ledger events parsed from program logs.
    pub events_received: AtomicU64,
    /// Webhook deliveries acknowledged by the receiver.
    pub webhooks_delivered: AtomicU64,
    /// Webhook deliveries abandoned after retries or a permanent rejection.
    pub webhooks_failed: AtomicU64,
    /// Sum of delivery latencies in milliseconds (for computing average).
    pub delivery_latency_sum_ms: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of an access check.
    pub fn record_access(&self, outcome: &Result<bool, AccessError>) {
        let counter = match outcome {
            Ok(_) => &self.access_granted,
            Err(AccessError::Expired { .. }) => &self.access_expired,
            Err(AccessError::NotFound) => &self.access_not_found,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful webhook delivery with its latency.
    pub fn record_delivery(&self, latency_ms: u64) {
        self.webhooks_delivered.fetch_add(1, Ordering::Relaxed);
        self.delivery_latency_sum_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_delivery_failure(&self) {
        self.webhooks_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Average delivery latency in milliseconds, or 0 if none.
    pub fn avg_delivery_latency_ms(&self) -> u64 {
        let count = self.webhooks_delivered.load(Ordering::Relaxed);
        if count == 0 {
            return 0;
        }
        self.delivery_latency_sum_ms.load(Ordering::Relaxed) / count
    }

    /// Serialize metrics as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "access_granted": self.access_granted.load(Ordering::Relaxed),
            "access_expired": self.access_expired.load(Ordering::Relaxed),
            "access_not_found": self.access_not_found.load(Ordering::Relaxed),
            "events_received": self.events_received.load(Ordering::Relaxed),
            "webhooks_delivered": self.webhooks_delivered.load(Ordering::Relaxed),
            "webhooks_failed": self.webhooks_failed.load(Ordering::Relaxed),
            "avg_delivery_latency_ms": self.avg_delivery_latency_ms(),
        })
    }
}
