//! RTP media loops
//!
//! [`RtpSender`] turns audio frames into RTP datagrams and ends the stream
//! with the [`END_OF_STREAM`](crate::END_OF_STREAM) marker; [`RtpReceiver`]
//! does the reverse until it sees the marker or goes idle. Both update an
//! [`RtpStats`](crate::RtpStats) that an RTCP reporter can read
//! concurrently.

mod receiver;
mod sender;

use std::time::Duration;

pub use receiver::{ReceiveSummary, RtpReceiver, RtpReceiverConfig, StreamEnd};
pub use sender::{RtpSender, RtpSenderConfig, SendSummary};

/// Audio clock rate for narrowband calls
pub const DEFAULT_CLOCK_RATE: u32 = 8000;

/// 20 ms of audio at 8 kHz
pub const DEFAULT_FRAME_SAMPLES: usize = 160;

/// How long a receiver waits for the next datagram before giving up
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Playout duration of `samples` at `clock_rate`
pub fn frame_duration(samples: usize, clock_rate: u32) -> Duration {
    if clock_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(samples as u64 * 1_000_000_000 / clock_rate as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration() {
        assert_eq!(frame_duration(DEFAULT_FRAME_SAMPLES, DEFAULT_CLOCK_RATE), Duration::from_millis(20));
        assert_eq!(frame_duration(80, 8000), Duration::from_millis(10));
        assert_eq!(frame_duration(160, 0), Duration::ZERO);
    }
}
