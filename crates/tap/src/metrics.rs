//! Hub metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the hub and its dispatch task
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Messages handed to `write`
    messages_received: AtomicU64,
    /// Messages lost because the mailbox was full or closed
    messages_dropped: AtomicU64,
    /// Successful per-subscriber deliveries
    deliveries: AtomicU64,
    subscribers_registered: AtomicU64,
    subscribers_unregistered: AtomicU64,
    /// Subscribers removed for not keeping up
    subscribers_dropped: AtomicU64,
}

impl HubMetrics {
    pub const fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            subscribers_registered: AtomicU64::new(0),
            subscribers_unregistered: AtomicU64::new(0),
            subscribers_dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn delivered(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn subscriber_registered(&self) {
        self.subscribers_registered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn subscriber_unregistered(&self) {
        self.subscribers_unregistered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn subscriber_dropped(&self) {
        self.subscribers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            subscribers_registered: self.subscribers_registered.load(Ordering::Relaxed),
            subscribers_unregistered: self.subscribers_unregistered.load(Ordering::Relaxed),
            subscribers_dropped: self.subscribers_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of hub metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubMetricsSnapshot {
    pub messages_received: u64,
    pub messages_dropped: u64,
    pub deliveries: u64,
    pub subscribers_registered: u64,
    pub subscribers_unregistered: u64,
    pub subscribers_dropped: u64,
}

impl HubMetricsSnapshot {
    /// Subscribers currently registered according to the counters
    pub fn active_subscribers(&self) -> u64 {
        self.subscribers_registered
            .saturating_sub(self.subscribers_unregistered)
            .saturating_sub(self.subscribers_dropped)
    }
}
