use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the SIP transport
#[derive(Error, Debug)]
pub enum Error {
    /// Socket I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Nothing arrived before the deadline
    #[error("No message received within {0:?}")]
    Timeout(Duration),

    /// The transport was closed
    #[error("Transport closed")]
    Closed,

    /// A datagram arrived but is not a valid SIP message
    #[error("Unparseable SIP message from {peer}: {error}")]
    Parse {
        peer: SocketAddr,
        #[source]
        error: udpcall_sip_core::Error,
    },

    /// Serialized message does not fit in one datagram
    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

impl Error {
    /// Whether the error is a receive deadline expiring
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}
