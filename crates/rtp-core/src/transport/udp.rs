//! UDP socket setup for RTP/RTCP
//!
//! Media sockets are created through `socket2` so options such as the
//! kernel receive buffer can be set before the socket is handed to tokio.

use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::Result;

/// Receive buffer requested for RTP receivers
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 65_536;

/// Binds a non-blocking UDP socket, optionally enlarging its receive buffer
///
/// Must be called from within a tokio runtime.
pub fn bind_udp_socket(addr: SocketAddr, recv_buffer_size: Option<usize>) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;

    if let Some(size) = recv_buffer_size {
        if let Err(e) = socket.set_recv_buffer_size(size) {
            // The kernel may cap or refuse the size; the socket still works
            warn!("Failed to set receive buffer to {} bytes on {}: {}", size, addr, e);
        }
    }

    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    let udp_socket = UdpSocket::from_std(std_socket)?;
    debug!("Media socket bound to {}", udp_socket.local_addr()?);
    Ok(udp_socket)
}
