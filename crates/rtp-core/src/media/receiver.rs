use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

use super::DEFAULT_IDLE_TIMEOUT;
use crate::packet::{strip_padding, RtpHeader};
use crate::stats::RtpStats;
use crate::traits::AudioSink;
use crate::transport::{bind_udp_socket, DEFAULT_RECV_BUFFER_SIZE};
use crate::{Result, END_OF_STREAM};

/// Largest datagram the receiver reads
const MAX_DATAGRAM_SIZE: usize = 65_536;

/// Receiver settings
#[derive(Debug, Clone)]
pub struct RtpReceiverConfig {
    /// Kernel receive buffer requested for the socket
    pub recv_buffer_size: usize,

    /// Give up when nothing arrives for this long; `None` waits forever
    pub idle_timeout: Option<Duration>,
}

impl Default for RtpReceiverConfig {
    fn default() -> Self {
        Self {
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }
}

/// Why the receive loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Empty datagram or the end-of-stream marker
    EndOfStream,
    /// Nothing arrived within the idle timeout
    IdleTimeout,
}

/// Totals for one received stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveSummary {
    pub packets: u64,
    pub bytes: u64,
    pub end: StreamEnd,
}

/// Receives one RTP stream and forwards payloads in arrival order
///
/// There is no jitter buffer: packets are not reordered or deduplicated.
pub struct RtpReceiver {
    socket: UdpSocket,
    config: RtpReceiverConfig,
    stats: Arc<RtpStats>,
}

impl RtpReceiver {
    /// Binds a receiver socket with the configured receive buffer
    pub fn bind(addr: SocketAddr, config: RtpReceiverConfig) -> Result<Self> {
        let socket = bind_udp_socket(addr, Some(config.recv_buffer_size))?;
        Ok(Self::from_socket(socket, config))
    }

    /// Wraps an already bound socket
    pub fn from_socket(socket: UdpSocket, config: RtpReceiverConfig) -> Self {
        Self {
            socket,
            config,
            stats: Arc::new(RtpStats::new()),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Counters shared with an RTCP reporter
    pub fn stats(&self) -> Arc<RtpStats> {
        Arc::clone(&self.stats)
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        match self.config.idle_timeout {
            Some(idle) => match tokio::time::timeout(idle, self.socket.recv_from(buf)).await {
                Ok(result) => Ok(Some(result?)),
                Err(_) => Ok(None),
            },
            None => Ok(Some(self.socket.recv_from(buf).await?)),
        }
    }

    /// Runs until the end-of-stream marker, an empty datagram or the idle
    /// timeout, then calls [`AudioSink::finish`]
    ///
    /// Datagrams without a valid RTP header are logged and skipped. Socket
    /// and sink failures end the loop with an error.
    pub async fn run<S: AudioSink + ?Sized>(&mut self, sink: &mut S) -> Result<ReceiveSummary> {
        info!("Receiving RTP on {}", self.local_addr()?);
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut packets = 0u64;
        let mut bytes = 0u64;

        let end = loop {
            let Some((len, peer)) = self.recv(&mut buf).await? else {
                warn!("No RTP received for {:?}, ending stream", self.config.idle_timeout);
                break StreamEnd::IdleTimeout;
            };

            let datagram = &buf[..len];
            if datagram.is_empty() || datagram == END_OF_STREAM {
                debug!("End of stream from {}", peer);
                break StreamEnd::EndOfStream;
            }

            let mut cursor = datagram;
            let header = match RtpHeader::parse(&mut cursor) {
                Ok(header) => header,
                Err(e) => {
                    warn!("Dropping invalid RTP datagram from {} ({} bytes): {}", peer, len, e);
                    continue;
                }
            };
            let payload = match strip_padding(&header, cursor) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Dropping RTP datagram from {} ({} bytes): {}", peer, len, e);
                    continue;
                }
            };
            trace!(
                "Received RTP seq={} ts={} len={} from {}",
                header.sequence_number,
                header.timestamp,
                payload.len(),
                peer
            );

            sink.write_payload(payload)?;
            self.stats.record_received(
                header.ssrc,
                header.sequence_number,
                header.timestamp,
                payload.len(),
            );
            packets += 1;
            bytes += payload.len() as u64;
        };

        sink.finish()?;
        info!(
            "RTP stream ended ({:?}): {} packets, {} bytes",
            end, packets, bytes
        );
        Ok(ReceiveSummary { packets, bytes, end })
    }
}

