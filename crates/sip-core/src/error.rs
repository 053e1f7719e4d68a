use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encoding or decoding SIP and SDP text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid SIP method token
    #[error("Invalid SIP method: {0}")]
    InvalidMethod(String),

    /// Invalid SIP URI
    #[error("Invalid SIP URI: {0}")]
    InvalidUri(String),

    /// Start line carried something other than SIP/2.0
    #[error("Invalid SIP version: {0}")]
    InvalidVersion(String),

    /// Status code outside 100..=699 or not three digits
    #[error("Invalid status code: {0}")]
    InvalidStatusCode(String),

    /// Invalid SIP header syntax
    #[error("Invalid SIP header: {0}")]
    InvalidHeader(String),

    /// A header required by the operation is absent
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    /// Body shorter than the declared Content-Length
    #[error("Content-Length mismatch: declared {declared} bytes but body has {actual}")]
    ContentLengthMismatch {
        declared: usize,
        actual: usize,
    },

    /// Invalid message framing
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    /// Invalid or incomplete SDP body
    #[error("Invalid SDP: {0}")]
    InvalidSdp(String),

    /// Parser error
    #[error("Parser error: {0}")]
    Parser(String),
}

impl<'a> From<nom::Err<nom::error::Error<&'a str>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&'a str>>) -> Self {
        Error::Parser(format!("Parsing failed: {err}"))
    }
}
