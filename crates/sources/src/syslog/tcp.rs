//! Syslog TCP endpoint
//!
//! Accepts connections and reads framed syslog messages from each one.
//! Framing is detected per frame (see `framing`): newline-delimited or
//! octet-counted.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, TcpKeepalive, Type};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, debug, info, warn};

use super::framing::{Frame, read_frame};
use super::{Endpoint, SyslogServerConfig};
use crate::common::trim_trailing_newline;

/// Listen backlog
const LISTEN_BACKLOG: i32 = 1024;

/// Read buffer size per connection
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Default keepalive interval (30s)
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Bind a listening socket
pub(crate) fn bind(addr: SocketAddr, config: &SyslogServerConfig) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    socket.set_reuse_address(true)?;
    if let Err(e) = socket.set_recv_buffer_size(config.socket_buffer_size) {
        warn!(error = %e, "failed to set SO_RCVBUF");
    }

    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// Accept loop - handles incoming connections until cancelled
pub(crate) async fn accept_loop(listener: TcpListener, endpoint: Endpoint) {
    if let Ok(addr) = listener.local_addr() {
        info!(
            address = %addr,
            format = ?endpoint.config.format,
            max_message_size = endpoint.config.max_message_size,
            "syslog TCP listener started"
        );
    }

    loop {
        tokio::select! {
            _ = endpoint.cancel.cancelled() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    endpoint.metrics.connection_opened();
                    configure_socket(&stream, &endpoint.config);

                    let handler = endpoint.clone();
                    endpoint.tracker.spawn(
                        async move {
                            if let Err(e) = handle_connection(stream, peer, &handler).await {
                                debug!(peer = %peer, error = %e, "syslog connection error");
                            }
                            handler.metrics.connection_closed();
                        }
                        .in_current_span(),
                    );
                }
                Err(e) => {
                    endpoint.metrics.error();
                    warn!(error = %e, "syslog TCP accept error");
                }
            },
        }
    }

    // Dropping the listener closes the socket
    drop(listener);
    info!("syslog TCP listener stopped");
}

/// Set per-connection socket options
fn configure_socket(stream: &TcpStream, config: &SyslogServerConfig) {
    if config.nodelay
        && let Err(e) = stream.set_nodelay(true)
    {
        warn!(error = %e, "failed to set TCP_NODELAY");
    }

    let socket = SockRef::from(stream);
    let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_INTERVAL);
    if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
        warn!(error = %e, "failed to set TCP keepalive");
    }
}

/// Read frames from one connection until EOF, error, timeout or cancel
async fn handle_connection(stream: TcpStream, peer: SocketAddr, endpoint: &Endpoint) -> io::Result<()> {
    let max_size = endpoint.config.max_message_size;
    let timeout = (!endpoint.config.connection_timeout.is_zero()).then_some(endpoint.config.connection_timeout);

    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, stream);
    let mut frame_buf = Vec::with_capacity(max_size);

    debug!(peer = %peer, "syslog TCP connection opened");

    loop {
        let read = async {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, read_frame(&mut reader, &mut frame_buf, max_size)).await,
                None => Ok(read_frame(&mut reader, &mut frame_buf, max_size).await),
            }
        };

        let result = tokio::select! {
            biased;
            // In-flight reads are abandoned
            _ = endpoint.cancel.cancelled() => break,
            result = read => result,
        };

        match result {
            Ok(Ok(Frame::Message(bytes))) => {
                endpoint.metrics.frame_received(bytes as u64);
                let frame = trim_trailing_newline(&frame_buf);
                if !frame.is_empty() {
                    endpoint.deliver(frame, peer).await;
                }
            }
            Ok(Ok(Frame::TooLong)) => {
                // Already consumed; the connection stays open
                endpoint.metrics.message_oversized();
                debug!(peer = %peer, max = max_size, "syslog message too large, dropped");
            }
            Ok(Ok(Frame::Eof)) => break,
            Ok(Err(e)) => {
                if !is_connection_reset(&e) {
                    endpoint.metrics.error();
                    return Err(e);
                }
                break;
            }
            Err(_) => {
                debug!(peer = %peer, "syslog TCP connection idle timeout");
                break;
            }
        }
    }

    debug!(peer = %peer, "syslog TCP connection closed");
    Ok(())
}

/// Check if error is a connection reset (expected during shutdown)
pub(crate) fn is_connection_reset(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
