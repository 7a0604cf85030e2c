//! Syslog UDP endpoint
//!
//! One datagram is one message. Trailing newlines are trimmed because some
//! clients send them. Datagrams larger than the message limit are dropped;
//! a full socket buffer drops packets in the kernel rather than blocking.

use std::io;
use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use super::{Endpoint, SyslogServerConfig};
use crate::common::trim_trailing_newline;

/// Receive buffer multiplier for UDP bursts
const UDP_BUFFER_MULTIPLIER: usize = 4;

/// Bind a UDP socket with an enlarged receive buffer
pub(crate) fn bind(addr: SocketAddr, config: &SyslogServerConfig) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;

    let recv_buffer_size = config.socket_buffer_size * UDP_BUFFER_MULTIPLIER;
    if let Err(e) = socket.set_recv_buffer_size(recv_buffer_size) {
        warn!(
            error = %e,
            requested_size = recv_buffer_size,
            "failed to set UDP SO_RCVBUF"
        );
    }

    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

/// Receive datagrams until cancelled
pub(crate) async fn recv_loop(socket: UdpSocket, endpoint: Endpoint) {
    let max_size = endpoint.config.max_message_size;

    if let Ok(addr) = socket.local_addr() {
        info!(
            address = %addr,
            format = ?endpoint.config.format,
            max_message_size = max_size,
            "syslog UDP listener started"
        );
    }

    // One extra byte so an oversized datagram is detectable
    let mut recv_buf = vec![0u8; max_size + 1];

    loop {
        tokio::select! {
            biased;

            _ = endpoint.cancel.cancelled() => break,

            received = socket.recv_from(&mut recv_buf) => match received {
                Ok((len, peer)) => process_packet(&recv_buf[..len], peer, max_size, &endpoint).await,
                Err(e) => {
                    endpoint.metrics.error();
                    debug!(error = %e, "syslog UDP recv error");
                }
            },
        }
    }

    drop(socket);
    info!("syslog UDP listener stopped");
}

async fn process_packet(data: &[u8], peer: SocketAddr, max_size: usize, endpoint: &Endpoint) {
    endpoint.metrics.frame_received(data.len() as u64);

    if data.len() > max_size {
        endpoint.metrics.message_oversized();
        debug!(
            peer = %peer,
            size = data.len(),
            max = max_size,
            "syslog UDP packet too large, dropping"
        );
        return;
    }

    let message = trim_trailing_newline(data);
    if message.is_empty() {
        return;
    }

    endpoint.deliver(message, peer).await;
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
