//! Error types for call control and orchestration

use std::io;
use std::time::Duration;

use thiserror::Error;
use udpcall_sip_core::StatusCode;

use crate::session::CallState;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors raised while setting up, running or tearing down a call
#[derive(Error, Debug)]
pub enum SessionError {
    /// The peer did not answer in time
    #[error("No response from peer within {0:?}")]
    Timeout(Duration),

    /// The peer answered the INVITE with a 4xx, 5xx or 6xx
    #[error("Call rejected: {status} {reason}")]
    Rejected { status: StatusCode, reason: String },

    /// A final response that is neither success nor failure (e.g. 3xx)
    #[error("Unexpected response: {status} {reason}")]
    UnexpectedResponse { status: StatusCode, reason: String },

    /// The peer violated the call flow or sent something unusable
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// SIP or SDP encoding failed
    #[error("Codec error: {0}")]
    Codec(#[from] udpcall_sip_core::Error),

    /// The SIP socket failed
    #[error("Transport error: {0}")]
    Transport(#[from] udpcall_sip_transport::Error),

    /// Operation not permitted in the current call state
    #[error("{operation} is not allowed in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: CallState,
    },

    /// RTP / RTCP or audio resource failure
    #[error("Media error: {0}")]
    Media(#[from] udpcall_rtp_core::Error),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout(_))
    }
}
