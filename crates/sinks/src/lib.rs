//! Lumber - Sinks
//!
//! Outputs that receive parsed syslog messages.
//!
//! # Architecture
//!
//! Every sink implements [`Sink`]: an async `write` for one shared
//! `Arc<LogMessage>` plus a `start`/`stop`/`wait` lifecycle. The aggregate
//! dispatcher in `lumber-pipeline` fans each message out to all of them.
//!
//! ```text
//! [Dispatcher] --Arc<LogMessage>--> [Sink::write] --> [Destination]
//! ```
//!
//! # Available Sinks
//!
//! | Sink | Purpose | Background task |
//! |------|---------|-----------------|
//! | `console` | Human-readable output | No |
//! | `timeseries` | Batched writes to a time-series store, historical reads | Yes (flush) |
//!
//! The live broadcast hub lives in `lumber-tap`.

// =============================================================================
// Sink implementations (each in its own submodule)
// =============================================================================

/// Console sink - human-readable output
pub mod console;

/// Time-series sink - batched writer, query reader and backends
pub mod timeseries;

/// Common types shared by all sinks (trait, errors, metrics)
mod common;

// =============================================================================
// Public re-exports
// =============================================================================

pub use common::{MetricsSnapshot, Sink, SinkError, SinkMetrics};

pub use console::{ConsoleConfig, ConsoleSink};
pub use timeseries::{QueryError, Reader, TimeSeriesStore, TimeSeriesWriter, WriterConfig};
