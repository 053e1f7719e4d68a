//! Transport implementations

pub mod udp;

/// Largest datagram the transport reads or writes
pub const MAX_DATAGRAM_SIZE: usize = 65_507;
