//! Lumber - Tap
//!
//! Live distribution of incoming messages to real-time subscribers.
//!
//! - [`BroadcastHub`] is a sink that replicates every message to all current
//!   subscribers without letting a slow one stall ingestion
//! - [`TailServer`] exposes hub subscriptions to TCP clients as a stream of
//!   formatted lines
//!
//! # Architecture
//!
//! ```text
//! AggregateWriter
//!     │
//!     ├──→ Time-series writer
//!     │
//!     └──→ BroadcastHub ◄── mailbox (register / unregister / broadcast)
//!               │
//!               ▼
//!          Subscribers (per-client bounded channels)
//!               │
//!               ▼
//!          TailServer (TCP) ──→ clients
//! ```

mod error;
pub mod hub;
mod metrics;
pub mod server;
pub mod subscriber;

pub use error::{Result, TapError};
pub use hub::{BroadcastHub, HubConfig};
pub use metrics::HubMetricsSnapshot;
pub use server::{TailServer, TailServerConfig};
pub use subscriber::Subscriber;
