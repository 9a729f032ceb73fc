use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing webhook and digest activity.
#[derive(Default)]
pub struct DigestMetrics {
    messages_received: AtomicU64,
    statuses_received: AtomicU64,
    malformed_payloads: AtomicU64,
    digests_started: AtomicU64,
    digests_completed: AtomicU64,
    replies_sent: AtomicU64,
    replies_failed: AtomicU64,
}

impl DigestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inbound user message.
    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivery receipt.
    pub fn record_status(&self) {
        self.statuses_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a payload that carried neither messages nor statuses.
    pub fn record_malformed(&self) {
        self.malformed_payloads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a background digest picking up work.
    pub fn record_digest_started(&self) {
        self.digests_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a background digest finishing.
    pub fn record_digest_completed(&self) {
        self.digests_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one outbound message.
    pub fn record_reply(&self, delivered: bool) {
        let counter = if delivered {
            &self.replies_sent
        } else {
            &self.replies_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            statuses_received: self.statuses_received.load(Ordering::Relaxed),
            malformed_payloads: self.malformed_payloads.load(Ordering::Relaxed),
            digests_started: self.digests_started.load(Ordering::Relaxed),
            digests_completed: self.digests_completed.load(Ordering::Relaxed),
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
            replies_failed: self.replies_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Inbound user messages accepted since startup.
    pub messages_received: u64,
    /// Delivery receipts acknowledged since startup.
    pub statuses_received: u64,
    /// Payloads rejected with `no_message_found`.
    pub malformed_payloads: u64,
    /// Background digests that started running.
    pub digests_started: u64,
    /// Background digests that ran to completion.
    pub digests_completed: u64,
    /// Outbound messages accepted by the provider.
    pub replies_sent: u64,
    /// Outbound messages that failed.
    pub replies_failed: u64,
}
