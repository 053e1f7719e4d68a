//! RTP and RTCP packet definitions
//!
//! All multi-byte fields are big-endian (network byte order).

mod header;
mod rtp;

pub mod rtcp;

pub use header::{RtpHeader, RTP_MIN_HEADER_SIZE, RTP_VERSION};
pub use rtp::{strip_padding, RtpPacket};
