//! Aggregate dispatcher
//!
//! `AggregateWriter` is itself a `Sink`. Each write is handed to every
//! configured sink in order; a sink that fails is logged and skipped so the
//! rest still receive the message.

use std::sync::Arc;

use async_trait::async_trait;
use lumber_protocol::LogMessage;
use lumber_sinks::{Sink, SinkError};
use tracing::Span;

use crate::metrics::{DispatcherMetrics, MetricsSnapshot};

/// Fans each message out to an ordered set of sinks
pub struct AggregateWriter {
    sinks: Vec<Arc<dyn Sink>>,
    metrics: DispatcherMetrics,
    span: Span,
}

impl AggregateWriter {
    /// Create a dispatcher over `sinks`, written in the given order
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self {
            sinks,
            metrics: DispatcherMetrics::new(),
            span: tracing::info_span!("dispatcher"),
        }
    }

    /// Replace the span the dispatcher logs under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Number of configured sinks
    #[inline]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Names of configured sinks, in write order
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl Sink for AggregateWriter {
    fn name(&self) -> &str {
        "aggregate"
    }

    /// Never fails; per-sink errors are logged and counted
    async fn write(&self, msg: Arc<LogMessage>) -> Result<(), SinkError> {
        self.metrics.record_received();

        let mut failed = 0usize;
        for sink in &self.sinks {
            match sink.write(Arc::clone(&msg)).await {
                Ok(()) => self.metrics.record_sink_write_success(),
                Err(e) => {
                    failed += 1;
                    self.metrics.record_sink_write_failed();
                    tracing::warn!(
                        parent: &self.span,
                        sink = sink.name(),
                        app = %msg.binary_name,
                        error = %e,
                        "sink write failed, skipping"
                    );
                }
            }
        }

        if failed == 0 {
            self.metrics.record_delivered();
        }
        Ok(())
    }

    /// Start every sink in order, stopping at the first failure
    async fn start(&self) -> Result<(), SinkError> {
        tracing::info!(parent: &self.span, sinks = ?self.sink_names(), "dispatcher starting");
        for sink in &self.sinks {
            sink.start().await?;
        }
        Ok(())
    }

    /// Stop every sink; returns the first error after trying them all
    async fn stop(&self) -> Result<(), SinkError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.stop().await {
                tracing::error!(parent: &self.span, sink = sink.name(), error = %e, "failed to stop sink");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    async fn wait(&self) {
        for sink in &self.sinks {
            sink.wait().await;
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            parent: &self.span,
            received = snapshot.messages_received,
            delivered = snapshot.messages_delivered,
            sink_writes_failed = snapshot.sink_writes_failed,
            "dispatcher stopped"
        );
    }
}

impl std::fmt::Debug for AggregateWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateWriter")
            .field("sinks", &self.sink_names())
            .finish()
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod dispatcher_test;
