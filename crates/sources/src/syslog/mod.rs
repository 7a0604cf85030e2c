//! Syslog Server
//!
//! RFC 3164 and RFC 5424 receivers over TCP and UDP.
//!
//! # Lifecycle
//!
//! - [`SyslogServer::start`] binds every configured endpoint and spawns one
//!   listening task per endpoint, then returns without blocking
//! - A bind failure is fatal to that endpoint only: it is reported once on
//!   the shared error channel and no task runs for it
//! - Cancelling the token closes the sockets and ends every task;
//!   [`SyslogServer::wait`] returns once all of them have exited
//!
//! # Parsing
//!
//! Each frame is parsed according to the configured [`ParseMode`] and
//! forwarded to the sink as one `Arc<LogMessage>`. A frame that fails to
//! parse is logged and dropped; TCP connections stay open.

mod framing;
pub mod tcp;
pub mod udp;

#[cfg(test)]
mod testing;

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use lumber_protocol::syslog::{self, ParseMode};
use lumber_sinks::Sink;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::common::{MetricsSnapshot, SourceMetrics};

// =============================================================================
// Constants
// =============================================================================

/// Default TCP listen address
pub const DEFAULT_TCP_ADDRESS: &str = "0.0.0.0:514";

/// Default UDP listen address
pub const DEFAULT_UDP_ADDRESS: &str = "0.0.0.0:514";

/// Default maximum syslog message size (8KB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 8192;

/// Default socket buffer size (256KB)
const DEFAULT_SOCKET_BUFFER_SIZE: usize = 256 * 1024;

/// Default idle connection timeout
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(300);

// =============================================================================
// Configuration
// =============================================================================

/// Syslog server configuration
#[derive(Debug, Clone)]
pub struct SyslogServerConfig {
    /// TCP listen address (`None` disables TCP)
    pub tcp_address: Option<String>,

    /// UDP listen address (`None` disables UDP)
    pub udp_address: Option<String>,

    /// Dialect selection
    pub format: ParseMode,

    /// Maximum syslog message size
    pub max_message_size: usize,

    /// Socket buffer size for SO_RCVBUF
    pub socket_buffer_size: usize,

    /// TCP nodelay (disable Nagle's algorithm)
    pub nodelay: bool,

    /// Idle timeout for TCP connections (0 = no timeout)
    pub connection_timeout: Duration,
}

impl Default for SyslogServerConfig {
    fn default() -> Self {
        Self {
            tcp_address: Some(DEFAULT_TCP_ADDRESS.into()),
            udp_address: Some(DEFAULT_UDP_ADDRESS.into()),
            format: ParseMode::Automatic,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            socket_buffer_size: DEFAULT_SOCKET_BUFFER_SIZE,
            nodelay: true,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }
}

impl SyslogServerConfig {
    /// TCP only, on the given address
    pub fn tcp(address: impl Into<String>) -> Self {
        Self {
            tcp_address: Some(address.into()),
            udp_address: None,
            ..Default::default()
        }
    }

    /// UDP only, on the given address
    pub fn udp(address: impl Into<String>) -> Self {
        Self {
            tcp_address: None,
            udp_address: Some(address.into()),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: ParseMode) -> Self {
        self.format = format;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Transport of a listening endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
        }
    }
}

/// Syslog source errors
#[derive(Debug, thiserror::Error)]
pub enum SyslogSourceError {
    /// Failed to bind to address
    #[error("failed to bind syslog {transport} listener to {address}: {source}")]
    Bind {
        transport: Transport,
        address: String,
        #[source]
        source: io::Error,
    },

    /// No TCP or UDP address configured
    #[error("no syslog listeners configured")]
    NoEndpoints,

    /// `start` called twice
    #[error("syslog server already started")]
    AlreadyStarted,
}

// =============================================================================
// Server
// =============================================================================

/// Syslog listener owning the TCP and UDP endpoints
pub struct SyslogServer {
    config: SyslogServerConfig,
    sink: Arc<dyn Sink>,
    cancel: CancellationToken,
    errors: mpsc::Sender<SyslogSourceError>,
    tracker: TaskTracker,
    metrics: Arc<SourceMetrics>,
    started: AtomicBool,
    local_addrs: Mutex<Vec<(Transport, SocketAddr)>>,
    span: Span,
}

impl SyslogServer {
    /// Create a server forwarding to `sink`
    ///
    /// Fatal endpoint failures are sent on `errors`. Cancelling `cancel`
    /// stops every endpoint.
    pub fn new(
        config: SyslogServerConfig,
        sink: Arc<dyn Sink>,
        cancel: &CancellationToken,
        errors: mpsc::Sender<SyslogSourceError>,
    ) -> Self {
        Self {
            config,
            sink,
            cancel: cancel.child_token(),
            errors,
            tracker: TaskTracker::new(),
            metrics: Arc::new(SourceMetrics::new()),
            started: AtomicBool::new(false),
            local_addrs: Mutex::new(Vec::new()),
            span: tracing::info_span!("syslog"),
        }
    }

    /// Replace the span the server logs under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Addresses actually bound by `start`
    pub fn local_addr(&self, transport: Transport) -> Option<SocketAddr> {
        self.local_addrs
            .lock()
            .iter()
            .find(|(t, _)| *t == transport)
            .map(|(_, addr)| *addr)
    }

    /// Bind endpoints and launch their listening tasks
    ///
    /// Returns immediately. Bind failures do not fail `start`; they are
    /// reported on the error channel.
    pub async fn start(&self) -> Result<(), SyslogSourceError> {
        if self.config.tcp_address.is_none() && self.config.udp_address.is_none() {
            return Err(SyslogSourceError::NoEndpoints);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SyslogSourceError::AlreadyStarted);
        }

        if let Some(address) = &self.config.tcp_address {
            match resolve(address).and_then(|addr| tcp::bind(addr, &self.config)) {
                Ok(listener) => {
                    self.record_addr(Transport::Tcp, listener.local_addr());
                    let task = tcp::accept_loop(listener, self.endpoint());
                    self.tracker.spawn(task.instrument(self.span.clone()));
                }
                Err(source) => self.report(Transport::Tcp, address, source),
            }
        }

        if let Some(address) = &self.config.udp_address {
            match resolve(address).and_then(|addr| udp::bind(addr, &self.config)) {
                Ok(socket) => {
                    self.record_addr(Transport::Udp, socket.local_addr());
                    let task = udp::recv_loop(socket, self.endpoint());
                    self.tracker.spawn(task.instrument(self.span.clone()));
                }
                Err(source) => self.report(Transport::Udp, address, source),
            }
        }

        Ok(())
    }

    /// Block until every listening task (and connection) has exited
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;

        let s = self.metrics.snapshot();
        info!(
            parent: &self.span,
            frames = s.frames_received,
            parsed = s.messages_parsed,
            malformed = s.messages_malformed,
            oversized = s.messages_oversized,
            "syslog server stopped"
        );
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            sink: Arc::clone(&self.sink),
            config: self.config.clone(),
            metrics: Arc::clone(&self.metrics),
            cancel: self.cancel.clone(),
            tracker: self.tracker.clone(),
        }
    }

    fn record_addr(&self, transport: Transport, addr: io::Result<SocketAddr>) {
        if let Ok(addr) = addr {
            self.local_addrs.lock().push((transport, addr));
        }
    }

    /// Report a fatal endpoint failure exactly once
    fn report(&self, transport: Transport, address: &str, source: io::Error) {
        error!(parent: &self.span, %transport, address, error = %source, "syslog listener failed to bind");

        let err = SyslogSourceError::Bind {
            transport,
            address: address.to_string(),
            source,
        };
        let errors = self.errors.clone();
        self.tracker.spawn(async move {
            let _ = errors.send(err).await;
        });
    }
}

fn resolve(address: &str) -> io::Result<SocketAddr> {
    address.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("no address for {address}"))
    })
}

// =============================================================================
// Endpoint context
// =============================================================================

/// What every listening task needs: where to send messages and when to stop
#[derive(Clone)]
pub(crate) struct Endpoint {
    pub sink: Arc<dyn Sink>,
    pub config: SyslogServerConfig,
    pub metrics: Arc<SourceMetrics>,
    pub cancel: CancellationToken,
    pub tracker: TaskTracker,
}

impl Endpoint {
    /// Parse one frame and hand it to the sink
    ///
    /// Parse failures and sink errors are logged and counted, never returned.
    pub async fn deliver(&self, frame: &[u8], peer: SocketAddr) {
        let msg = match syslog::parse(frame, self.config.format, Utc::now()) {
            Ok(msg) => msg,
            Err(e) => {
                self.metrics.message_malformed();
                debug!(peer = %peer, error = %e, "malformed syslog message dropped");
                return;
            }
        };

        self.metrics.message_parsed();
        if let Err(e) = self.sink.write(Arc::new(msg)).await {
            self.metrics.sink_error();
            warn!(peer = %peer, sink = self.sink.name(), error = %e, "failed to write syslog message");
        }
    }
}
