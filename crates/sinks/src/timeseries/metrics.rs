//! Time-series writer metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters for the time-series writer
#[derive(Debug, Default)]
pub struct WriterMetrics {
    points_buffered: AtomicU64,
    points_written: AtomicU64,
    points_dropped: AtomicU64,
    flushes: AtomicU64,
    flush_errors: AtomicU64,
    forced_flushes: AtomicU64,
    flush_timeouts: AtomicU64,
    rejected: AtomicU64,
}

impl WriterMetrics {
    pub const fn new() -> Self {
        Self {
            points_buffered: AtomicU64::new(0),
            points_written: AtomicU64::new(0),
            points_dropped: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            flush_errors: AtomicU64::new(0),
            forced_flushes: AtomicU64::new(0),
            flush_timeouts: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn point_buffered(&self) {
        self.points_buffered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn flush_ok(&self, points: u64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.points_written.fetch_add(points, Ordering::Relaxed);
    }

    /// Points in a failed flush are discarded, not retried
    #[inline]
    pub fn flush_failed(&self, points: u64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.flush_errors.fetch_add(1, Ordering::Relaxed);
        self.points_dropped.fetch_add(points, Ordering::Relaxed);
    }

    #[inline]
    pub fn forced_flush(&self) {
        self.forced_flushes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn flush_timeout(&self) {
        self.flush_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WriterMetricsSnapshot {
        WriterMetricsSnapshot {
            points_buffered: self.points_buffered.load(Ordering::Relaxed),
            points_written: self.points_written.load(Ordering::Relaxed),
            points_dropped: self.points_dropped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            flush_errors: self.flush_errors.load(Ordering::Relaxed),
            forced_flushes: self.forced_flushes.load(Ordering::Relaxed),
            flush_timeouts: self.flush_timeouts.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of writer metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterMetricsSnapshot {
    pub points_buffered: u64,
    pub points_written: u64,
    pub points_dropped: u64,
    /// Non-empty flushes attempted
    pub flushes: u64,
    pub flush_errors: u64,
    /// Flushes forced by crossing the high-water mark
    pub forced_flushes: u64,
    pub flush_timeouts: u64,
    /// Writes rejected for lacking an application name
    pub rejected: u64,
}
