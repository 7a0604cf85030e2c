//! Common types and utilities for sources
//!
//! Shared functionality across the syslog transports (TCP, UDP).

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics shared by all syslog endpoints of one server
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Currently active TCP connections
    pub connections_active: AtomicU64,

    /// Total TCP connections accepted
    pub connections_total: AtomicU64,

    /// Frames read off the wire (lines, counted frames, datagrams)
    pub frames_received: AtomicU64,

    /// Total bytes received
    pub bytes_received: AtomicU64,

    /// Frames parsed into messages and handed to the sink
    pub messages_parsed: AtomicU64,

    /// Frames that failed to parse
    pub messages_malformed: AtomicU64,

    /// Frames over the size limit
    pub messages_oversized: AtomicU64,

    /// Sink writes that returned an error
    pub sink_errors: AtomicU64,

    /// Socket errors (accept, read, recv)
    pub errors: AtomicU64,
}

impl SourceMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            messages_parsed: AtomicU64::new(0),
            messages_malformed: AtomicU64::new(0),
            messages_oversized: AtomicU64::new(0),
            sink_errors: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Increment active connections
    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement active connections
    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a received frame
    #[inline]
    pub fn frame_received(&self, bytes: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn message_parsed(&self) {
        self.messages_parsed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn message_malformed(&self) {
        self.messages_malformed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn message_oversized(&self) {
        self.messages_oversized.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn sink_error(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record error
    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            messages_parsed: self.messages_parsed.load(Ordering::Relaxed),
            messages_malformed: self.messages_malformed.load(Ordering::Relaxed),
            messages_oversized: self.messages_oversized.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
    pub messages_parsed: u64,
    pub messages_malformed: u64,
    pub messages_oversized: u64,
    pub sink_errors: u64,
    pub errors: u64,
}

/// Trim trailing newline from a frame (LF or CRLF)
#[inline]
pub fn trim_trailing_newline(data: &[u8]) -> &[u8] {
    let mut end = data.len();

    if end > 0 && data[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && data[end - 1] == b'\r' {
            end -= 1;
        }
    }

    &data[..end]
}
