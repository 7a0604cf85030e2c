//! Batched time-series writer
//!
//! Buffers points in memory and submits them to a `TimeSeriesBackend` in
//! batches. A background task flushes on a timer, on request, and once more
//! when the writer is cancelled or stopped.
//!
//! # Backpressure
//!
//! When a write fills the buffer to the high-water mark, the writer sends a
//! flush request to the background task and waits for its acknowledgment, up
//! to `flush_timeout`. Producers are throttled to the speed of the backend
//! instead of letting the buffer grow.
//!
//! ```text
//! write() --push--> [buffer] <--drain-- flush task --batch--> backend
//!    |                                     ^
//!    +------ FlushRequest { ack } ---------+
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lumber_protocol::{LogMessage, QueryParams};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use super::backend::TimeSeriesBackend;
use super::metrics::{WriterMetrics, WriterMetricsSnapshot};
use super::reader::QueryReader;
use super::{Point, QueryError, Reader, TimeSeriesStore};
use crate::{Sink, SinkError};

// =============================================================================
// Constants
// =============================================================================

/// Buffered points that force a synchronous flush
pub const HIGH_WATER_MARK: usize = 20_000;

/// How long a producer waits for a forced flush
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(60);

/// Default periodic flush interval
pub const DEFAULT_WRITE_INTERVAL: Duration = Duration::from_secs(1);

/// Queued flush requests before producers wait to enqueue
const FLUSH_QUEUE_SIZE: usize = 10;

// =============================================================================
// Configuration
// =============================================================================

/// Writer tuning
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Periodic flush interval
    pub write_interval: Duration,

    /// Buffer size that forces a flush
    pub high_water_mark: usize,

    /// Wait limit for a forced flush
    pub flush_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            write_interval: DEFAULT_WRITE_INTERVAL,
            high_water_mark: HIGH_WATER_MARK,
            flush_timeout: FLUSH_TIMEOUT,
        }
    }
}

impl WriterConfig {
    /// Set the periodic flush interval (zero means the default)
    pub fn with_write_interval(mut self, interval: Duration) -> Self {
        self.write_interval = if interval.is_zero() {
            DEFAULT_WRITE_INTERVAL
        } else {
            interval
        };
        self
    }
}

// =============================================================================
// Shared state
// =============================================================================

/// Out-of-band flush with acknowledgment
struct FlushRequest {
    ack: oneshot::Sender<Result<(), SinkError>>,
}

/// State shared between the writer handle, its flush task and its readers
pub(crate) struct Shared {
    pub(crate) backend: Arc<dyn TimeSeriesBackend>,
    buffer: tokio::sync::Mutex<Vec<Point>>,
    running: AtomicBool,
    metrics: WriterMetrics,
}

impl Shared {
    /// Drain the buffer into the backend as one batch
    ///
    /// The buffer is cleared whether or not the backend accepts the batch.
    pub(crate) async fn flush(&self) -> Result<(), SinkError> {
        let mut buffer = self.buffer.lock().await;
        if buffer.is_empty() {
            return Ok(());
        }

        let points = std::mem::take(&mut *buffer);
        let count = points.len() as u64;
        let result = self.backend.write_points(&points).await;
        match &result {
            Ok(()) => self.metrics.flush_ok(count),
            Err(_) => self.metrics.flush_failed(count),
        }
        result
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Sink that batches messages into a time-series backend
pub struct TimeSeriesWriter {
    shared: Arc<Shared>,
    config: WriterConfig,
    flush_tx: mpsc::Sender<FlushRequest>,
    flush_rx: Mutex<Option<mpsc::Receiver<FlushRequest>>>,
    /// Stops the flush task; child of the process-wide token
    stop: CancellationToken,
    /// Cancelled once the final flush has completed
    done: CancellationToken,
    span: Span,
}

impl TimeSeriesWriter {
    /// Create a writer over `backend`; `cancel` is the process-wide shutdown token
    pub fn new(
        backend: Arc<dyn TimeSeriesBackend>,
        config: WriterConfig,
        cancel: &CancellationToken,
    ) -> Self {
        let (flush_tx, flush_rx) = mpsc::channel(FLUSH_QUEUE_SIZE);
        let span = tracing::info_span!("timeseries", backend = backend.name());

        Self {
            shared: Arc::new(Shared {
                backend,
                buffer: tokio::sync::Mutex::new(Vec::with_capacity(config.high_water_mark)),
                running: AtomicBool::new(false),
                metrics: WriterMetrics::new(),
            }),
            config,
            flush_tx,
            flush_rx: Mutex::new(Some(flush_rx)),
            stop: cancel.child_token(),
            done: CancellationToken::new(),
            span,
        }
    }

    /// Replace the span the writer logs under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> WriterMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Number of points waiting for the next flush
    pub async fn buffered(&self) -> usize {
        self.shared.buffer.lock().await.len()
    }

    /// Flush now and wait for the result
    pub async fn flush(&self) -> Result<(), SinkError> {
        self.shared.flush().await
    }

    /// Hand a forced flush to the flush task and wait for its ack
    async fn request_flush(&self) -> Result<(), SinkError> {
        self.shared.metrics.forced_flush();

        if !self.shared.running.load(Ordering::Acquire) {
            return self.shared.flush().await;
        }

        let timeout = self.config.flush_timeout;
        let requested = async {
            let (ack, acked) = oneshot::channel();
            if self.flush_tx.send(FlushRequest { ack }).await.is_err() {
                return self.shared.flush().await;
            }
            match acked.await {
                Ok(result) => result,
                // Flush task exited before serving us
                Err(_) => self.shared.flush().await,
            }
        };

        match tokio::time::timeout(timeout, requested).await {
            Ok(result) => result,
            Err(_) => {
                self.shared.metrics.flush_timeout();
                Err(SinkError::FlushTimeout(timeout))
            }
        }
    }
}

#[async_trait]
impl Sink for TimeSeriesWriter {
    fn name(&self) -> &str {
        self.shared.backend.name()
    }

    async fn write(&self, msg: Arc<LogMessage>) -> Result<(), SinkError> {
        if !msg.has_binary_name() {
            self.shared.metrics.rejected();
            return Err(SinkError::MissingBinaryName);
        }

        let point = Point::from_message(&msg, Utc::now());
        let len = {
            let mut buffer = self.shared.buffer.lock().await;
            buffer.push(point);
            buffer.len()
        };
        self.shared.metrics.point_buffered();

        if len < self.config.high_water_mark {
            return Ok(());
        }
        self.request_flush().await
    }

    async fn start(&self) -> Result<(), SinkError> {
        let Some(requests) = self.flush_rx.lock().take() else {
            return Err(SinkError::AlreadyStarted(self.name().to_string()));
        };

        self.shared.running.store(true, Ordering::Release);
        let task = flush_loop(
            Arc::clone(&self.shared),
            requests,
            self.config.write_interval,
            self.stop.clone(),
            self.done.clone(),
        );
        tokio::spawn(task.instrument(self.span.clone()));
        Ok(())
    }

    async fn stop(&self) -> Result<(), SinkError> {
        self.stop.cancel();
        self.wait().await;
        Ok(())
    }

    async fn wait(&self) {
        let started = self.flush_rx.lock().is_none();
        if started {
            self.done.cancelled().await;
        }
    }
}

#[async_trait]
impl TimeSeriesStore for TimeSeriesWriter {
    async fn rotate(&self, older_than: DateTime<Utc>) -> Result<(), SinkError> {
        tracing::debug!(parent: &self.span, %older_than, "rotate requested, retention is not enforced");
        Ok(())
    }

    fn result_reader(&self, params: QueryParams) -> Box<dyn Reader> {
        Box::new(QueryReader::new(Arc::clone(&self.shared), params))
    }

    async fn list(&self) -> Result<Vec<String>, QueryError> {
        self.shared.backend.measurements().await
    }
}

// =============================================================================
// Flush task
// =============================================================================

async fn flush_loop(
    shared: Arc<Shared>,
    mut requests: mpsc::Receiver<FlushRequest>,
    interval: Duration,
    stop: CancellationToken,
    done: CancellationToken,
) {
    tracing::info!(interval = ?interval, "time-series writer starting");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = shared.flush().await {
                    tracing::error!(error = %e, "failed to flush logs to backend");
                }
            }
            Some(request) = requests.recv() => {
                let result = shared.flush().await;
                if let Err(e) = &result {
                    tracing::error!(error = %e, "forced flush failed");
                }
                let _ = request.ack.send(result);
            }
        }
    }

    // Serve anyone already waiting, then drain what is left
    requests.close();
    while let Ok(request) = requests.try_recv() {
        let _ = request.ack.send(shared.flush().await);
    }
    shared.running.store(false, Ordering::Release);
    if let Err(e) = shared.flush().await {
        tracing::error!(error = %e, "final flush failed");
    }

    let snapshot = shared.metrics.snapshot();
    tracing::info!(
        written = snapshot.points_written,
        dropped = snapshot.points_dropped,
        flushes = snapshot.flushes,
        errors = snapshot.flush_errors,
        "time-series writer stopped"
    );
    done.cancel();
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
