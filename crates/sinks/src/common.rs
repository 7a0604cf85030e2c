//! Common types and utilities for sinks
//!
//! The `Sink` capability every output implements, plus the error and
//! metrics types shared across sink implementations.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lumber_protocol::LogMessage;
use thiserror::Error;

/// Write capability with a start/stop/wait lifecycle
///
/// Implementations must be cheap to call from many tasks at once. `write`
/// is invoked for every message in arrival order; `start` spawns whatever
/// background work the sink needs and returns immediately; `wait` resolves
/// once that background work has fully finished.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Sink name for logging
    fn name(&self) -> &str;

    /// Accept one message
    async fn write(&self, msg: Arc<LogMessage>) -> Result<(), SinkError>;

    /// Launch background work
    async fn start(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Ask background work to finish
    async fn stop(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Block until background work has exited
    async fn wait(&self) {}
}

/// Metrics shared by simple sink types
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Messages accepted by `write`
    pub messages_received: AtomicU64,

    /// Messages successfully written
    pub messages_written: AtomicU64,

    /// Bytes written
    pub bytes_written: AtomicU64,

    /// Write errors encountered
    pub write_errors: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            messages_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    /// Record a received message
    #[inline]
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successfully written message
    #[inline]
    pub fn message_written(&self, bytes: u64) {
        self.messages_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a write error
    #[inline]
    pub fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_written: self.messages_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_written: u64,
    pub bytes_written: u64,
    pub write_errors: u64,
}

/// Common sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink initialization failed
    #[error("failed to initialize sink: {0}")]
    Init(String),

    /// Failed to write data
    #[error("write failed: {0}")]
    Write(String),

    /// Message has no application name to store it under
    #[error("missing application name")]
    MissingBinaryName,

    /// Forced flush did not acknowledge in time
    #[error("timed out flushing logs after {0:?}")]
    FlushTimeout(Duration),

    /// Backend connection failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend answered with a non-success status
    #[error("backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Background task was already started
    #[error("sink {0} already started")]
    AlreadyStarted(String),

    /// Channel closed unexpectedly
    #[error("channel closed")]
    ChannelClosed,
}

impl SinkError {
    /// Create an initialization error
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
