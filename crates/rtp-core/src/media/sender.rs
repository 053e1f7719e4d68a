use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::{frame_duration, DEFAULT_CLOCK_RATE};
use crate::packet::RtpPacket;
use crate::stats::RtpStats;
use crate::traits::AudioSource;
use crate::{Result, RtpSequenceNumber, RtpSsrc, RtpTimestamp, END_OF_STREAM};

/// Sender settings negotiated during call setup
#[derive(Debug, Clone)]
pub struct RtpSenderConfig {
    /// Payload type written into every header
    pub payload_type: u8,

    /// RTP clock rate used for pacing
    pub clock_rate: u32,

    /// Send frames in real time instead of as fast as possible
    pub pacing: bool,
}

impl Default for RtpSenderConfig {
    fn default() -> Self {
        Self {
            payload_type: 0,
            clock_rate: DEFAULT_CLOCK_RATE,
            pacing: true,
        }
    }
}

/// Totals for one finished stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendSummary {
    pub packets: u64,
    pub bytes: u64,
}

/// Sends audio frames to one remote endpoint as RTP
///
/// The SSRC and the initial sequence number and timestamp are random. Each
/// packet advances the sequence number by one (wrapping at 2^16) and the
/// timestamp by the frame's sample count.
pub struct RtpSender {
    socket: UdpSocket,
    remote: SocketAddr,
    config: RtpSenderConfig,
    ssrc: RtpSsrc,
    sequence: RtpSequenceNumber,
    timestamp: RtpTimestamp,
    stats: Arc<RtpStats>,
}

impl RtpSender {
    pub fn new(socket: UdpSocket, remote: SocketAddr, config: RtpSenderConfig) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            socket,
            remote,
            config,
            ssrc: rng.gen(),
            sequence: rng.gen(),
            timestamp: rng.gen(),
            stats: Arc::new(RtpStats::new()),
        }
    }

    /// Overrides the random SSRC
    pub fn with_ssrc(mut self, ssrc: RtpSsrc) -> Self {
        self.ssrc = ssrc;
        self
    }

    /// Overrides the random initial sequence number and timestamp
    pub fn with_initial_state(mut self, sequence: RtpSequenceNumber, timestamp: RtpTimestamp) -> Self {
        self.sequence = sequence;
        self.timestamp = timestamp;
        self
    }

    pub fn ssrc(&self) -> RtpSsrc {
        self.ssrc
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Counters shared with an RTCP reporter
    pub fn stats(&self) -> Arc<RtpStats> {
        Arc::clone(&self.stats)
    }

    /// Sends one frame as a single RTP packet
    pub async fn send_frame(&mut self, frame: Bytes) -> Result<()> {
        // 16-bit mono: two bytes per sample
        let samples = (frame.len() / 2) as u32;
        let payload_len = frame.len();
        let packet = RtpPacket::new_with_payload(
            self.config.payload_type,
            self.sequence,
            self.timestamp,
            self.ssrc,
            frame,
        );

        self.socket.send_to(&packet.serialize()?, self.remote).await?;
        trace!(
            "Sent RTP seq={} ts={} len={} to {}",
            self.sequence,
            self.timestamp,
            payload_len,
            self.remote
        );

        self.stats.record_sent(payload_len, self.timestamp);
        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(samples);
        Ok(())
    }

    /// Sends the end-of-stream marker datagram
    pub async fn send_end_of_stream(&self) -> Result<()> {
        self.socket.send_to(END_OF_STREAM, self.remote).await?;
        debug!("Sent end-of-stream marker to {}", self.remote);
        Ok(())
    }

    /// Sends every frame of `source`, then the end-of-stream marker
    ///
    /// The marker also goes out when the source or a send fails, so the
    /// receiver stops instead of waiting for its idle timeout.
    pub async fn run<S: AudioSource + ?Sized>(&mut self, source: &mut S) -> Result<SendSummary> {
        info!(
            "Streaming RTP to {} (ssrc={:#010x}, pt={})",
            self.remote, self.ssrc, self.config.payload_type
        );

        let mut summary = SendSummary::default();
        let streamed = self.stream_frames(source, &mut summary).await;

        match (streamed, self.send_end_of_stream().await) {
            (Ok(()), Ok(())) => {
                info!(
                    "RTP stream to {} finished: {} packets, {} bytes",
                    self.remote, summary.packets, summary.bytes
                );
                Ok(summary)
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), end) => {
                if let Err(end_err) = end {
                    warn!("Failed to send end-of-stream marker to {}: {}", self.remote, end_err);
                }
                warn!(
                    "RTP stream to {} aborted after {} packets: {}",
                    self.remote, summary.packets, e
                );
                Err(e)
            }
        }
    }

    async fn stream_frames<S: AudioSource + ?Sized>(
        &mut self,
        source: &mut S,
        summary: &mut SendSummary,
    ) -> Result<()> {
        let mut deadline: Option<Instant> = None;

        while let Some(frame) = source.next_frame()? {
            if let Some(at) = deadline {
                tokio::time::sleep_until(at).await;
            }
            let samples = frame.len() / 2;
            let len = frame.len() as u64;
            self.send_frame(frame).await?;
            summary.packets += 1;
            summary.bytes += len;

            if self.config.pacing {
                let step = frame_duration(samples, self.config.clock_rate);
                deadline = Some(deadline.unwrap_or_else(Instant::now) + step);
            }
        }
        Ok(())
    }

    /// Sequence number the next packet will carry
    pub fn next_sequence(&self) -> RtpSequenceNumber {
        self.sequence
    }

    /// Timestamp the next packet will carry
    pub fn next_timestamp(&self) -> RtpTimestamp {
        self.timestamp
    }

    /// Frame pacing interval for frames of `samples`, if pacing is on
    pub fn pacing_interval(&self, samples: usize) -> Option<Duration> {
        self.config
            .pacing
            .then(|| frame_duration(samples, self.config.clock_rate))
    }
}
