//! TCP tail server
//!
//! `TailServer` accepts TCP clients and turns each into a hub subscriber.
//! Every broadcast message is written to the client as one formatted line:
//!
//! ```text
//! 2024-05-01T12:00:00.000Z web-1 nginx[info]: GET /healthz 200
//! ```
//!
//! The stream is one-way. A client is disconnected when a socket write
//! fails or stalls past the write timeout, when it closes its end, or when
//! the hub drops it for being slow.

use std::sync::Arc;
use std::time::Duration;

use lumber_sinks::console::format_line;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, warn};

use crate::error::{Result, TapError};
use crate::hub::BroadcastHub;

/// Default tail listen address
pub const DEFAULT_TAIL_ADDRESS: &str = "127.0.0.1:5515";

/// Default bound on one line write to a client that stopped reading
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Server configuration
#[derive(Debug, Clone)]
pub struct TailServerConfig {
    /// Address to listen on
    pub address: String,
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Give up on a client whose line write takes longer than this
    pub write_timeout: Duration,
}

impl Default for TailServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_TAIL_ADDRESS.to_string(),
            max_connections: 100,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl TailServerConfig {
    /// Create config with custom listen address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}

/// TCP server streaming live messages to tail clients
pub struct TailServer {
    config: TailServerConfig,
    hub: Arc<BroadcastHub>,
    cancel: CancellationToken,
    span: Span,
}

impl TailServer {
    /// Create a new tail server
    pub fn new(hub: Arc<BroadcastHub>, config: TailServerConfig, cancel: &CancellationToken) -> Self {
        Self {
            config,
            hub,
            cancel: cancel.child_token(),
            span: tracing::info_span!("tail"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(&self.config.address)
            .await
            .map_err(|source| TapError::Bind {
                address: self.config.address.clone(),
                source,
            })
    }

    /// Bind and serve until cancelled
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept clients on an already bound listener until cancelled
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        info!(parent: &self.span, address = %local, "tail server listening");

        let permits = Arc::new(Semaphore::new(self.config.max_connections.max(1)));

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,

                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(parent: &self.span, error = %e, "failed to accept tail client");
                            continue;
                        }
                    };

                    let Ok(permit) = Arc::clone(&permits).try_acquire_owned() else {
                        warn!(parent: &self.span, peer = %peer, "tail connection limit reached, rejecting");
                        continue;
                    };

                    let hub = Arc::clone(&self.hub);
                    let cancel = self.cancel.clone();
                    let write_timeout = self.config.write_timeout;
                    let span = self.span.clone();

                    tokio::spawn(
                        async move {
                            if let Err(e) = handle_connection(stream, hub, cancel, write_timeout).await {
                                debug!(peer = %peer, error = %e, "tail client ended");
                            }
                            drop(permit);
                        }
                        .instrument(span),
                    );
                }
            }
        }

        info!(parent: &self.span, "tail server stopped");
        Ok(())
    }
}

/// Stream hub messages to one client until it goes away
async fn handle_connection(
    mut stream: TcpStream,
    hub: Arc<BroadcastHub>,
    cancel: CancellationToken,
    write_timeout: Duration,
) -> Result<()> {
    let (subscriber_id, mut receiver) = hub.subscribe().await?;
    info!(subscriber_id, "tail client subscribed");

    let (mut reader, mut writer) = stream.split();
    let mut scratch = [0u8; 256];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            msg = receiver.recv() => {
                match msg {
                    Some(msg) => {
                        let mut line = format_line(&msg);
                        line.push('\n');
                        // A client that stopped reading must not hold up shutdown
                        let write =
                            tokio::time::timeout(write_timeout, writer.write_all(line.as_bytes()));
                        let written = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            written = write => written,
                        };
                        match written {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                warn!(error = %e, subscriber_id, "failed to write to tail client");
                                break;
                            }
                            Err(_) => {
                                warn!(subscriber_id, timeout = ?write_timeout, "tail client write timed out");
                                break;
                            }
                        }
                    }
                    // Dropped by the hub (slow) or hub shutting down
                    None => break,
                }
            }

            // Input is ignored; a read of zero or an error means the client left
            read = reader.read(&mut scratch) => {
                match read {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        }
    }

    let _ = writer.shutdown().await;
    let _ = hub.unsubscribe(subscriber_id).await;
    info!(subscriber_id, "tail client disconnected");

    Ok(())
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
