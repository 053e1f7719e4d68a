//! RTP Core library for the udpcall project
//!
//! This crate carries the media half of a call: RTP packet encoding and
//! decoding, the sender and receiver loops that move audio frames over UDP,
//! and the periodic RTCP Sender / Receiver Report task.
//!
//! The library is organized into several modules:
//!
//! - `packet`: RTP and RTCP packet definitions and processing
//! - `media`: RTP sender and receiver loops
//! - `rtcp_reporter`: cancellable periodic RTCP reporting with a passive listener
//! - `stats`: lock-free counters shared between a media loop and its reporter
//! - `transport`: UDP socket setup for media
//! - `traits`: audio source / sink seams implemented by callers

mod error;

pub mod media;
pub mod packet;
pub mod rtcp_reporter;
pub mod stats;
pub mod traits;
pub mod transport;

pub use error::Error;

pub use packet::rtcp::{
    NtpTimestamp, RtcpPacket, RtcpPacketType, RtcpReceiverReport, RtcpReportBlock,
    RtcpSenderReport,
};
pub use packet::{RtpHeader, RtpPacket};

pub use media::{
    ReceiveSummary, RtpReceiver, RtpReceiverConfig, RtpSender, RtpSenderConfig, SendSummary,
    StreamEnd,
};
pub use rtcp_reporter::{
    ReceiverReportBuilder, ReportBuilder, ReporterSummary, RtcpReporter, RtcpReporterConfig,
    RtcpReporterHandle, SenderReportBuilder,
};
pub use stats::{RtpStats, StatsSnapshot};
pub use traits::{AudioSink, AudioSource, MemorySink, PcmFrameSource};

/// The default maximum size for RTP packets in bytes
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1500;

/// Datagram marking the end of an RTP stream
pub const END_OF_STREAM: &[u8] = b"END";

/// Typedef for RTP timestamp values
pub type RtpTimestamp = u32;

/// Typedef for RTP sequence numbers
pub type RtpSequenceNumber = u16;

/// Typedef for RTP synchronization source identifier
pub type RtpSsrc = u32;

/// Typedef for RTP contributing source identifier
pub type RtpCsrc = u32;

/// Result type for RTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::{
        AudioSink, AudioSource, Error, ReceiveSummary, Result, RtcpReporter, RtcpReporterConfig,
        RtcpReporterHandle, RtpHeader, RtpPacket, RtpReceiver, RtpSender, RtpSequenceNumber,
        RtpSsrc, RtpStats, RtpTimestamp, StreamEnd, END_OF_STREAM,
    };

    pub use crate::packet::rtcp::{
        NtpTimestamp, RtcpPacket, RtcpReceiverReport, RtcpReportBlock, RtcpSenderReport,
    };
}
