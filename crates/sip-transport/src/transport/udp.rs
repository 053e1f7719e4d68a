//! UDP transport for SIP messages
//!
//! A [`UdpTransport`] owns one socket. Sends serialize a [`Message`] into a
//! single datagram; receives parse one datagram into a [`Message`] and
//! report the peer it came from. Receives can be bounded by a deadline,
//! which is how call setup implements its response timeout.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use udpcall_sip_core::{parse_message, Message};

use crate::error::{Error, Result};
use crate::transport::MAX_DATAGRAM_SIZE;

/// UDP transport for SIP messages
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    local_addr: SocketAddr,
}

impl UdpTransport {
    /// Creates a new UDP transport bound to the specified address
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        info!("SIP UDP transport bound to {}", local_addr);

        Ok(Self {
            socket: Some(socket),
            local_addr,
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket.as_ref().ok_or(Error::Closed)
    }

    /// Sends one message as a single datagram
    pub async fn send_message(&self, message: &Message, destination: SocketAddr) -> Result<()> {
        let socket = self.socket()?;
        let bytes = message.to_bytes();
        if bytes.len() > MAX_DATAGRAM_SIZE {
            return Err(Error::MessageTooLarge {
                size: bytes.len(),
                max: MAX_DATAGRAM_SIZE,
            });
        }

        info!("Sending {} to {}", message.start_line(), destination);
        trace!("Outgoing message:\n{}", message);
        socket.send_to(&bytes, destination).await?;
        Ok(())
    }

    /// Sends raw bytes, bypassing serialization
    pub async fn send_raw(&self, data: &[u8], destination: SocketAddr) -> Result<()> {
        self.socket()?.send_to(data, destination).await?;
        Ok(())
    }

    /// Waits for the next datagram and parses it
    ///
    /// A datagram that is not a valid SIP message yields
    /// [`Error::Parse`]; the socket remains usable.
    pub async fn recv_message(&self) -> Result<(Message, SocketAddr)> {
        let socket = self.socket()?;
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, peer) = socket.recv_from(&mut buf).await?;
        debug!("Received {} bytes from {}", len, peer);

        match parse_message(&buf[..len]) {
            Ok(message) => {
                info!("Received {} from {}", message.start_line(), peer);
                trace!("Incoming message:\n{}", message);
                Ok((message, peer))
            }
            Err(error) => Err(Error::Parse { peer, error }),
        }
    }

    /// Like [`recv_message`](Self::recv_message) but gives up after `timeout`
    pub async fn recv_message_timeout(&self, timeout: Duration) -> Result<(Message, SocketAddr)> {
        match tokio::time::timeout(timeout, self.recv_message()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(timeout)),
        }
    }

    /// Releases the socket; later operations fail with [`Error::Closed`]
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("SIP UDP transport on {} closed", self.local_addr);
        }
    }
}

impl fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_closed() {
            write!(f, "UdpTransport({}, closed)", self.local_addr)
        } else {
            write!(f, "UdpTransport({})", self.local_addr)
        }
    }
}
