//! Live subscribers
//!
//! Each connected client gets a `Subscriber`: a unique ID plus the sending
//! half of a bounded channel. Subscribers are owned by the hub's dispatch
//! task; nothing else holds or mutates them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lumber_protocol::LogMessage;
use tokio::sync::mpsc;

/// Counter for generating unique subscriber IDs
static SUBSCRIBER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Result of offering a message to a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the client
    Sent,
    /// Client is not keeping up
    Full,
    /// Client went away
    Closed,
}

/// A single live subscriber (connected client)
#[derive(Debug)]
pub struct Subscriber {
    /// Unique identifier
    id: u64,
    /// Channel sender for message delivery
    sender: mpsc::Sender<Arc<LogMessage>>,
}

impl Subscriber {
    /// Create a subscriber and the receiver its client reads from
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Arc<LogMessage>>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let subscriber = Self {
            id: SUBSCRIBER_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            sender,
        };
        (subscriber, receiver)
    }

    /// Get the subscriber ID
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Offer a message without waiting
    #[inline]
    pub fn try_send(&self, msg: Arc<LogMessage>) -> Delivery {
        match self.sender.try_send(msg) {
            Ok(()) => Delivery::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Check if this subscriber is still connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
