//! Tests for the aggregate dispatcher

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use lumber_protocol::{Facility, LogMessage, Severity, SyslogFormat};
use lumber_sinks::{Sink, SinkError};
use parking_lot::Mutex;

use super::AggregateWriter;

// =============================================================================
// Test sinks
// =============================================================================

/// Records every message it receives
#[derive(Default)]
struct Recording {
    name: &'static str,
    seen: Mutex<Vec<String>>,
    started: AtomicBool,
    stopped: AtomicBool,
    waited: AtomicBool,
}

impl Recording {
    fn named(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            ..Default::default()
        })
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Sink for Recording {
    fn name(&self) -> &str {
        self.name
    }

    async fn write(&self, msg: Arc<LogMessage>) -> Result<(), SinkError> {
        self.seen.lock().push(msg.message.clone());
        Ok(())
    }

    async fn start(&self) -> Result<(), SinkError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), SinkError> {
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn wait(&self) {
        self.waited.store(true, Ordering::SeqCst);
    }
}

/// Fails every operation
#[derive(Default)]
struct Failing {
    writes: AtomicUsize,
}

#[async_trait]
impl Sink for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn write(&self, _msg: Arc<LogMessage>) -> Result<(), SinkError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::write("always fails"))
    }

    async fn start(&self) -> Result<(), SinkError> {
        Err(SinkError::init("cannot start"))
    }

    async fn stop(&self) -> Result<(), SinkError> {
        Err(SinkError::write("cannot stop"))
    }
}

fn message(text: &str) -> Arc<LogMessage> {
    Arc::new(LogMessage {
        timestamp: Utc::now(),
        hostname: "h".into(),
        severity: Severity::Info,
        facility: Facility::User,
        binary_name: "app".into(),
        message: text.into(),
        format: SyslogFormat::Rfc5424,
    })
}

// =============================================================================
// Write fan-out
// =============================================================================

#[tokio::test]
async fn test_every_sink_receives_in_order() {
    let a = Recording::named("a");
    let b = Recording::named("b");
    let dispatcher = AggregateWriter::new(vec![a.clone() as Arc<dyn Sink>, b.clone() as Arc<dyn Sink>]);

    for text in ["one", "two", "three"] {
        dispatcher.write(message(text)).await.unwrap();
    }

    assert_eq!(a.seen(), vec!["one", "two", "three"]);
    assert_eq!(b.seen(), vec!["one", "two", "three"]);

    let metrics = dispatcher.metrics();
    assert_eq!(metrics.messages_received, 3);
    assert_eq!(metrics.messages_delivered, 3);
    assert_eq!(metrics.sink_writes_success, 6);
}

#[tokio::test]
async fn test_failing_sink_is_isolated() {
    let failing = Arc::new(Failing::default());
    let healthy = Recording::named("healthy");
    let dispatcher = AggregateWriter::new(vec![
        failing.clone() as Arc<dyn Sink>,
        healthy.clone() as Arc<dyn Sink>,
    ]);

    for i in 0..100 {
        // The failing sink never surfaces to the caller
        dispatcher.write(message(&i.to_string())).await.unwrap();
    }

    assert_eq!(healthy.seen().len(), 100);
    assert_eq!(failing.writes.load(Ordering::SeqCst), 100);

    let metrics = dispatcher.metrics();
    assert_eq!(metrics.messages_received, 100);
    assert_eq!(metrics.messages_delivered, 0);
    assert_eq!(metrics.sink_writes_failed, 100);
    assert_eq!(metrics.sink_writes_success, 100);
}

#[tokio::test]
async fn test_no_sinks() {
    let dispatcher = AggregateWriter::new(Vec::new());
    dispatcher.write(message("x")).await.unwrap();
    assert_eq!(dispatcher.sink_count(), 0);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_lifecycle_fans_out() {
    let a = Recording::named("a");
    let b = Recording::named("b");
    let dispatcher = AggregateWriter::new(vec![a.clone() as Arc<dyn Sink>, b.clone() as Arc<dyn Sink>]);

    dispatcher.start().await.unwrap();
    dispatcher.stop().await.unwrap();
    dispatcher.wait().await;

    for sink in [&a, &b] {
        assert!(sink.started.load(Ordering::SeqCst));
        assert!(sink.stopped.load(Ordering::SeqCst));
        assert!(sink.waited.load(Ordering::SeqCst));
    }
    assert_eq!(dispatcher.sink_names(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_start_failure_is_returned() {
    let dispatcher = AggregateWriter::new(vec![
        Arc::new(Failing::default()) as Arc<dyn Sink>,
        Recording::named("b") as Arc<dyn Sink>,
    ]);
    let err = dispatcher.start().await.unwrap_err();
    assert!(matches!(err, SinkError::Init(_)));
}

#[tokio::test]
async fn test_stop_tries_every_sink() {
    let after = Recording::named("after");
    let dispatcher = AggregateWriter::new(vec![
        Arc::new(Failing::default()) as Arc<dyn Sink>,
        after.clone() as Arc<dyn Sink>,
    ]);

    assert!(dispatcher.stop().await.is_err());
    assert!(after.stopped.load(Ordering::SeqCst));
}
