//! Lumber - Sources
//!
//! Network listeners that receive syslog traffic and forward parsed
//! messages to a [`Sink`](lumber_sinks::Sink).
//!
//! # Available Sources
//!
//! - **Syslog TCP** - RFC 3164/5424 over TCP, newline or octet-counted framing
//! - **Syslog UDP** - RFC 3164/5424 over UDP, one datagram per message
//!
//! Both transports are owned by one [`SyslogServer`], which shares a single
//! cancellation token, task tracker and error channel between them.
//!
//! # Example
//!
//! ```ignore
//! let (errors_tx, mut errors_rx) = mpsc::channel(4);
//! let server = SyslogServer::new(SyslogServerConfig::default(), sink, &cancel, errors_tx);
//! server.start().await?;
//!
//! tokio::select! {
//!     _ = shutdown_signal() => cancel.cancel(),
//!     Some(err) = errors_rx.recv() => { error!(%err); cancel.cancel() }
//! }
//! server.wait().await;
//! ```

pub mod syslog;

// Common types for sources
mod common;

pub use common::{MetricsSnapshot, SourceMetrics};
pub use syslog::{SyslogServer, SyslogServerConfig, SyslogSourceError, Transport};
