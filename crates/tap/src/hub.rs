//! Broadcast hub
//!
//! The hub replicates every message it receives to all live subscribers.
//! A single dispatch task owns the subscriber set; registration,
//! unregistration and broadcast all arrive at that task as commands on a
//! bounded mailbox, so membership is never touched concurrently.
//!
//! ```text
//! write() ──try_send──→ [mailbox] ──→ dispatch task ──try_send──→ subscriber 1
//! subscribe() ────send─┘                  │          └─try_send──→ subscriber 2
//!                                         └─ full/closed subscriber: dropped
//! ```
//!
//! Producers never wait on subscribers: `write` only enqueues, and a
//! subscriber whose channel is full is removed instead of being waited on.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use lumber_protocol::LogMessage;
use lumber_sinks::{Sink, SinkError};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, trace, warn};

use crate::error::{Result, TapError};
use crate::metrics::{HubMetrics, HubMetricsSnapshot};
use crate::subscriber::{Delivery, Subscriber};

/// Default mailbox capacity (commands queued for the dispatch task)
pub const DEFAULT_MAILBOX_SIZE: usize = 4096;

/// Default per-subscriber channel capacity
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Maximum subscribers per hub
pub const MAX_SUBSCRIBERS: usize = 100;

/// Hub configuration
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the command mailbox
    pub mailbox_size: usize,
    /// Capacity of each subscriber's channel
    pub subscriber_buffer: usize,
    /// Maximum concurrent subscribers
    pub max_subscribers: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            mailbox_size: DEFAULT_MAILBOX_SIZE,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            max_subscribers: MAX_SUBSCRIBERS,
        }
    }
}

impl HubConfig {
    pub fn with_subscriber_buffer(mut self, size: usize) -> Self {
        self.subscriber_buffer = size.max(1);
        self
    }

    pub fn with_mailbox_size(mut self, size: usize) -> Self {
        self.mailbox_size = size.max(1);
        self
    }

    pub fn with_max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }
}

/// Requests handled by the dispatch task
enum Command {
    Register {
        subscriber: Subscriber,
        ack: oneshot::Sender<Result<()>>,
    },
    Unregister(u64),
    Broadcast(Arc<LogMessage>),
    Count(oneshot::Sender<usize>),
}

/// Live broadcast hub
///
/// Construct, hand to the dispatcher as a [`Sink`], then call
/// [`start`](Sink::start). Commands sent before `start` queue in the
/// mailbox and are processed once the dispatch task runs.
pub struct BroadcastHub {
    mailbox: mpsc::Sender<Command>,
    /// Taken by `start`; `None` once the dispatch task owns it
    inbox: Mutex<Option<mpsc::Receiver<Command>>>,
    config: HubConfig,
    metrics: Arc<HubMetrics>,
    stop: CancellationToken,
    done: CancellationToken,
    started: AtomicBool,
    span: Span,
}

impl BroadcastHub {
    /// Create a hub that stops when `cancel` fires
    pub fn new(config: HubConfig, cancel: &CancellationToken) -> Self {
        let (mailbox, inbox) = mpsc::channel(config.mailbox_size.max(1));
        Self {
            mailbox,
            inbox: Mutex::new(Some(inbox)),
            config,
            metrics: Arc::new(HubMetrics::new()),
            stop: cancel.child_token(),
            done: CancellationToken::new(),
            started: AtomicBool::new(false),
            span: tracing::info_span!("hub"),
        }
    }

    /// Replace the span the hub logs under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Register a new subscriber
    ///
    /// Returns the subscriber ID and the receiver the client reads from.
    /// The receiver yields `None` once the hub drops the subscriber (slow or
    /// unsubscribed) or stops.
    pub async fn subscribe(&self) -> Result<(u64, mpsc::Receiver<Arc<LogMessage>>)> {
        self.subscribe_with_capacity(self.config.subscriber_buffer).await
    }

    /// Register a subscriber with a specific channel capacity
    pub async fn subscribe_with_capacity(
        &self,
        capacity: usize,
    ) -> Result<(u64, mpsc::Receiver<Arc<LogMessage>>)> {
        let (subscriber, receiver) = Subscriber::channel(capacity);
        let id = subscriber.id();
        let (ack, ack_rx) = oneshot::channel();

        self.mailbox
            .send(Command::Register { subscriber, ack })
            .await
            .map_err(|_| TapError::HubStopped)?;
        ack_rx.await.map_err(|_| TapError::HubStopped)??;

        Ok((id, receiver))
    }

    /// Remove a subscriber
    ///
    /// Unknown IDs are ignored; the subscriber may already have been dropped.
    pub async fn unsubscribe(&self, id: u64) -> Result<()> {
        self.mailbox
            .send(Command::Unregister(id))
            .await
            .map_err(|_| TapError::HubStopped)
    }

    /// Number of registered subscribers
    ///
    /// Answered by the dispatch task, so every command queued before this
    /// call has been applied by the time it returns.
    pub async fn subscriber_count(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.mailbox
            .send(Command::Count(tx))
            .await
            .map_err(|_| TapError::HubStopped)?;
        rx.await.map_err(|_| TapError::HubStopped)
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> HubMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl Sink for BroadcastHub {
    fn name(&self) -> &str {
        "hub"
    }

    async fn write(&self, msg: Arc<LogMessage>) -> std::result::Result<(), SinkError> {
        self.metrics.message_received();

        // Never wait here; a full or closed mailbox loses this message only
        match self.mailbox.try_send(Command::Broadcast(msg)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.message_dropped();
                trace!(parent: &self.span, "hub mailbox full, message dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.message_dropped();
                trace!(parent: &self.span, "hub stopped, message dropped");
            }
        }
        Ok(())
    }

    async fn start(&self) -> std::result::Result<(), SinkError> {
        let inbox = self
            .inbox
            .lock()
            .take()
            .ok_or_else(|| SinkError::AlreadyStarted("hub".into()))?;
        self.started.store(true, Ordering::Release);

        let dispatch = Dispatch {
            subscribers: HashMap::new(),
            max_subscribers: self.config.max_subscribers,
            metrics: Arc::clone(&self.metrics),
            span: self.span.clone(),
        };
        let stop = self.stop.clone();
        let done = self.done.clone();

        tokio::spawn(
            async move {
                dispatch.run(inbox, stop).await;
                done.cancel();
            }
            .instrument(self.span.clone()),
        );

        info!(parent: &self.span, "broadcast hub started");
        Ok(())
    }

    async fn stop(&self) -> std::result::Result<(), SinkError> {
        self.stop.cancel();
        self.wait().await;
        Ok(())
    }

    async fn wait(&self) {
        if !self.started.load(Ordering::Acquire) {
            return;
        }
        self.done.cancelled().await;
    }
}

/// State owned by the dispatch task
struct Dispatch {
    subscribers: HashMap<u64, Subscriber>,
    max_subscribers: usize,
    metrics: Arc<HubMetrics>,
    span: Span,
}

impl Dispatch {
    async fn run(mut self, mut inbox: mpsc::Receiver<Command>, stop: CancellationToken) {
        loop {
            tokio::select! {
                biased;

                _ = stop.cancelled() => break,

                command = inbox.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        // Closing the mailbox fails any pending subscribe with HubStopped
        inbox.close();
        let remaining = self.subscribers.len();
        self.subscribers.clear();

        let snapshot = self.metrics.snapshot();
        info!(
            parent: &self.span,
            subscribers = remaining,
            received = snapshot.messages_received,
            delivered = snapshot.deliveries,
            dropped_subscribers = snapshot.subscribers_dropped,
            "broadcast hub stopped"
        );
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Register { subscriber, ack } => {
                let result = if self.subscribers.len() >= self.max_subscribers {
                    Err(TapError::MaxSubscribers {
                        max: self.max_subscribers,
                    })
                } else {
                    let id = subscriber.id();
                    self.subscribers.insert(id, subscriber);
                    self.metrics.subscriber_registered();
                    debug!(parent: &self.span, subscriber_id = id, "subscriber registered");
                    Ok(())
                };
                let _ = ack.send(result);
            }
            Command::Unregister(id) => {
                if self.subscribers.remove(&id).is_some() {
                    self.metrics.subscriber_unregistered();
                    debug!(parent: &self.span, subscriber_id = id, "subscriber unregistered");
                }
            }
            Command::Broadcast(msg) => self.broadcast(msg),
            Command::Count(reply) => {
                let _ = reply.send(self.subscribers.len());
            }
        }
    }

    fn broadcast(&mut self, msg: Arc<LogMessage>) {
        let metrics = &self.metrics;
        let span = &self.span;

        self.subscribers.retain(|&id, subscriber| {
            match subscriber.try_send(Arc::clone(&msg)) {
                Delivery::Sent => {
                    metrics.delivered();
                    true
                }
                Delivery::Full => {
                    metrics.subscriber_dropped();
                    warn!(parent: span, subscriber_id = id, "subscriber too slow, dropping");
                    false
                }
                Delivery::Closed => {
                    metrics.subscriber_unregistered();
                    debug!(parent: span, subscriber_id = id, "subscriber disconnected");
                    false
                }
            }
        });
    }
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod hub_test;
