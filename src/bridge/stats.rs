//! Bridge counters and health

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of the bridge counters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStats {
    pub running: bool,
    pub events_received: u64,
    pub events_forwarded: u64,
    pub events_filtered: u64,
    pub events_failed: u64,
    pub batches_sent: u64,
    pub buffered: usize,
    pub subscriptions: usize,
    pub last_event_time: Option<DateTime<Utc>>,
}

/// Bridge health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Running with at least one bus subscription
    Healthy,
    /// Running without any bus subscription
    Degraded,
    /// Stopped
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }

    pub(crate) fn classify(running: bool, subscriptions: usize) -> Self {
        match (running, subscriptions) {
            (false, _) => Self::Unhealthy,
            (true, 0) => Self::Degraded,
            (true, _) => Self::Healthy,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health report returned by [`EventBridge::health`](super::EventBridge::health)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeHealth {
    pub status: HealthStatus,
    pub running: bool,
    pub subscriptions: usize,
    pub last_event_time: Option<DateTime<Utc>>,
}

/// Shared counters updated from bus handlers and delivery tasks
#[derive(Debug, Default)]
pub(crate) struct Counters {
    received: AtomicU64,
    forwarded: AtomicU64,
    filtered: AtomicU64,
    failed: AtomicU64,
    batches: AtomicU64,
    last_event_time: Mutex<Option<DateTime<Utc>>>,
}

impl Counters {
    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
        *self.last_event_time.lock() = Some(Utc::now());
    }

    pub(crate) fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forwarded(&self, events: usize) {
        self.forwarded.fetch_add(events as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_batch(&self, events: usize) {
        self.record_forwarded(events);
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self, events: usize) {
        self.failed.fetch_add(events as u64, Ordering::Relaxed);
    }

    pub(crate) fn last_event_time(&self) -> Option<DateTime<Utc>> {
        *self.last_event_time.lock()
    }

    pub(crate) fn snapshot(&self, running: bool, buffered: usize, subscriptions: usize) -> BridgeStats {
        BridgeStats {
            running,
            events_received: self.received.load(Ordering::Relaxed),
            events_forwarded: self.forwarded.load(Ordering::Relaxed),
            events_filtered: self.filtered.load(Ordering::Relaxed),
            events_failed: self.failed.load(Ordering::Relaxed),
            batches_sent: self.batches.load(Ordering::Relaxed),
            buffered,
            subscriptions,
            last_event_time: self.last_event_time(),
        }
    }
}
