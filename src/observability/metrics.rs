//! Metrics registry
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase, reset only on process start
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

/// Operational counters of the subscription engine
///
/// # Thread Safety
///
/// All counters use atomic operations with Relaxed ordering; eventual
/// consistency is fine for metrics.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Rooms created
    rooms_created: AtomicU64,
    /// Rooms destroyed after their last customer left
    rooms_destroyed: AtomicU64,
    /// Successful subscribe calls
    subscriptions_created: AtomicU64,
    /// Successful unsubscribe calls (including eviction)
    subscriptions_removed: AtomicU64,
    /// Connections removed wholesale (disconnect, token expiry)
    connections_evicted: AtomicU64,
    /// Document events processed
    events_processed: AtomicU64,
    /// Rooms matched across all document events
    rooms_matched: AtomicU64,
    /// Notifications handed to the transport successfully
    notifications_delivered: AtomicU64,
    /// Notification hand-offs the transport rejected
    notifications_failed: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment rooms created
    pub fn increment_rooms_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment rooms destroyed
    pub fn increment_rooms_destroyed(&self) {
        self.rooms_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment subscriptions created
    pub fn increment_subscriptions_created(&self) {
        self.subscriptions_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment subscriptions removed
    pub fn increment_subscriptions_removed(&self) {
        self.subscriptions_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment connections evicted
    pub fn increment_connections_evicted(&self) {
        self.connections_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment document events processed
    pub fn increment_events_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Add matched room count for one event
    pub fn add_rooms_matched(&self, count: u64) {
        self.rooms_matched.fetch_add(count, Ordering::Relaxed);
    }

    /// Increment notifications delivered
    pub fn increment_notifications_delivered(&self) {
        self.notifications_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment notification delivery failures
    pub fn increment_notifications_failed(&self) {
        self.notifications_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rooms_created: self.rooms_created.load(Ordering::Relaxed),
            rooms_destroyed: self.rooms_destroyed.load(Ordering::Relaxed),
            subscriptions_created: self.subscriptions_created.load(Ordering::Relaxed),
            subscriptions_removed: self.subscriptions_removed.load(Ordering::Relaxed),
            connections_evicted: self.connections_evicted.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            rooms_matched: self.rooms_matched.load(Ordering::Relaxed),
            notifications_delivered: self.notifications_delivered.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Rooms created
    pub rooms_created: u64,
    /// Rooms destroyed
    pub rooms_destroyed: u64,
    /// Successful subscribe calls
    pub subscriptions_created: u64,
    /// Successful unsubscribe calls
    pub subscriptions_removed: u64,
    /// Connections evicted
    pub connections_evicted: u64,
    /// Document events processed
    pub events_processed: u64,
    /// Rooms matched across events
    pub rooms_matched: u64,
    /// Notifications delivered
    pub notifications_delivered: u64,
    /// Notification failures
    pub notifications_failed: u64,
}
