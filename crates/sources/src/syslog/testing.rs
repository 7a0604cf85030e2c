//! Shared helpers for listener tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lumber_protocol::LogMessage;
use lumber_sinks::{Sink, SinkError};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{SyslogServer, SyslogServerConfig, SyslogSourceError};

/// Records every message; optionally fails every write after recording it
#[derive(Default)]
pub(crate) struct Recording {
    messages: Mutex<Vec<Arc<LogMessage>>>,
    pub fail: AtomicBool,
}

impl Recording {
    pub fn failing() -> Arc<Self> {
        let sink = Self::default();
        sink.fail.store(true, Ordering::SeqCst);
        Arc::new(sink)
    }

    pub fn messages(&self) -> Vec<Arc<LogMessage>> {
        self.messages.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages.lock().iter().map(|m| m.message.clone()).collect()
    }

    /// Wait until at least `count` messages arrived
    pub async fn wait_for(&self, count: usize) {
        for _ in 0..200 {
            if self.messages.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} messages, got {}",
            self.messages.lock().len()
        );
    }
}

#[async_trait]
impl Sink for Recording {
    fn name(&self) -> &str {
        "recording"
    }

    async fn write(&self, msg: Arc<LogMessage>) -> Result<(), SinkError> {
        self.messages.lock().push(msg);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::write("refused"));
        }
        Ok(())
    }
}

/// A started server with its sink, token and error channel
pub(crate) struct Harness {
    pub sink: Arc<Recording>,
    pub server: SyslogServer,
    pub cancel: CancellationToken,
    pub errors: mpsc::Receiver<SyslogSourceError>,
}

impl Harness {
    pub async fn start(config: SyslogServerConfig) -> Self {
        Self::start_with(config, Arc::new(Recording::default())).await
    }

    pub async fn start_with(config: SyslogServerConfig, sink: Arc<Recording>) -> Self {
        let cancel = CancellationToken::new();
        let (tx, errors) = mpsc::channel(4);
        let server = SyslogServer::new(config, Arc::clone(&sink) as Arc<dyn Sink>, &cancel, tx);
        server.start().await.unwrap();
        Self {
            sink,
            server,
            cancel,
            errors,
        }
    }

    /// Cancel and wait, failing the test if shutdown hangs
    pub async fn shutdown(self) {
        self.cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), self.server.wait())
            .await
            .expect("syslog server did not stop");
    }
}
