//! Network transport for RTP/RTCP

mod udp;

pub use udp::{bind_udp_socket, DEFAULT_RECV_BUFFER_SIZE};
