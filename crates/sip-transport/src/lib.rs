//! SIP transport layer for the udpcall stack
//!
//! Call setup and teardown run over plain UDP: one datagram carries exactly
//! one SIP message. This crate owns the SIP socket and converts between
//! datagrams and [`Message`](udpcall_sip_core::Message) values.

pub mod error;
pub mod transport;

pub use error::{Error, Result};
pub use transport::udp::UdpTransport;
pub use transport::MAX_DATAGRAM_SIZE;

/// Bind a UDP transport to the specified address
pub async fn bind_udp(addr: std::net::SocketAddr) -> Result<UdpTransport> {
    UdpTransport::bind(addr).await
}

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::{bind_udp, Error, Result, UdpTransport};
}
