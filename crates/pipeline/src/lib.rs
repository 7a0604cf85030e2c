//! Lumber - Pipeline
//!
//! The aggregate dispatcher that connects the syslog listener to sinks.
//!
//! # Architecture
//!
//! ```text
//! [Listener]             [AggregateWriter]              [Sinks]
//!    TCP ────┐                                     ┌──→ Time-series writer
//!            ├──→ Sink::write(Arc<LogMessage>) ────┼──→ Broadcast hub
//!    UDP ────┘                                     └──→ Console
//! ```
//!
//! # Key Design
//!
//! - **Arc fan-out**: one `Arc<LogMessage>` shared by every sink
//! - **Failure isolation**: a failing sink is logged and skipped
//! - **Per-sink order**: each sink sees messages in arrival order

mod dispatcher;
mod metrics;

pub use dispatcher::AggregateWriter;
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
