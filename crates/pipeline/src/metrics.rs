//! Dispatcher metrics
//!
//! Atomic counters for tracking fan-out.
//! All operations use relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for the aggregate dispatcher
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Messages handed to the dispatcher
    messages_received: AtomicU64,

    /// Messages accepted by every sink
    messages_delivered: AtomicU64,

    /// Individual sink writes that succeeded
    sink_writes_success: AtomicU64,

    /// Individual sink writes that failed
    sink_writes_failed: AtomicU64,
}

impl DispatcherMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            messages_delivered: AtomicU64::new(0),
            sink_writes_success: AtomicU64::new(0),
            sink_writes_failed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_delivered(&self) {
        self.messages_delivered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sink_write_success(&self) {
        self.sink_writes_success.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sink_write_failed(&self) {
        self.sink_writes_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            sink_writes_success: self.sink_writes_success.load(Ordering::Relaxed),
            sink_writes_failed: self.sink_writes_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of dispatcher metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_delivered: u64,
    pub sink_writes_success: u64,
    pub sink_writes_failed: u64,
}

impl MetricsSnapshot {
    /// Messages at least one sink failed to accept
    #[inline]
    pub fn messages_partially_failed(&self) -> u64 {
        self.messages_received
            .saturating_sub(self.messages_delivered)
    }
}
