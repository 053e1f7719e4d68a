use std::io;

use thiserror::Error;

/// Error type for RTP operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid packet format
    #[error("Invalid RTP packet format: {0}")]
    InvalidPacket(String),

    /// Buffer too small
    #[error("Buffer too small for RTP packet: need {required} but have {available}")]
    BufferTooSmall {
        required: usize,
        available: usize,
    },

    /// Invalid parameter for RTP operation
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// RTCP error
    #[error("RTCP error: {0}")]
    RtcpError(String),

    /// IO error when sending/receiving packets
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Audio source failed to produce a frame
    #[error("Audio source error: {0}")]
    Source(String),

    /// Audio sink failed to accept a payload
    #[error("Audio sink error: {0}")]
    Sink(String),
}

impl Error {
    /// Whether the error concerns a malformed packet rather than a resource
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::InvalidPacket(_) | Error::BufferTooSmall { .. } | Error::RtcpError(_)
        )
    }
}
