//! Periodic RTCP reporting
//!
//! An [`RtcpReporter`] sends one report to the peer's RTCP address right
//! away and then once per interval, building each report from the live
//! [`RtpStats`] of the media loop it accompanies. What kind of report is
//! sent is decided by its [`ReportBuilder`]: a media sender uses
//! [`SenderReportBuilder`], a media receiver [`ReceiverReportBuilder`].
//!
//! Optionally a passive listener runs on the same socket and logs every
//! RTCP packet the peer sends; it never answers.
//!
//! Both tasks share one [`CancellationToken`]. [`RtcpReporterHandle::stop`]
//! cancels it, which wakes the interval sleep and the pending receive
//! immediately, then joins both tasks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::packet::rtcp::{
    NtpTimestamp, RtcpPacket, RtcpReceiverReport, RtcpReportBlock, RtcpSenderReport,
};
use crate::stats::{RtpStats, StatsSnapshot};
use crate::{Result, RtpSsrc};

/// Interval between reports
pub const DEFAULT_RTCP_INTERVAL: Duration = Duration::from_secs(5);

const MAX_RTCP_PACKET_SIZE: usize = 1500;

/// Builds the report sent on every tick
pub trait ReportBuilder: Send + Sync + 'static {
    /// Short name used in log lines ("SR", "RR")
    fn kind(&self) -> &'static str;

    fn build(&self, stats: &StatsSnapshot) -> RtcpPacket;
}

/// Sender Report: wall clock and send counters
#[derive(Debug, Clone)]
pub struct SenderReportBuilder {
    pub ssrc: RtpSsrc,
}

impl SenderReportBuilder {
    pub fn new(ssrc: RtpSsrc) -> Self {
        Self { ssrc }
    }
}

impl ReportBuilder for SenderReportBuilder {
    fn kind(&self) -> &'static str {
        "SR"
    }

    fn build(&self, stats: &StatsSnapshot) -> RtcpPacket {
        // Counters wrap modulo 2^32 on the wire
        RtcpPacket::SenderReport(RtcpSenderReport::new(
            self.ssrc,
            NtpTimestamp::now_seconds(),
            stats.packets as u32,
            stats.octets as u32,
        ))
    }
}

/// Receiver Report: one block for the source being received
///
/// Loss and jitter are not measured, so those fields are always zero.
#[derive(Debug, Clone)]
pub struct ReceiverReportBuilder {
    pub ssrc: RtpSsrc,
}

impl ReceiverReportBuilder {
    pub fn new(ssrc: RtpSsrc) -> Self {
        Self { ssrc }
    }
}

impl ReportBuilder for ReceiverReportBuilder {
    fn kind(&self) -> &'static str {
        "RR"
    }

    fn build(&self, stats: &StatsSnapshot) -> RtcpPacket {
        let mut rr = RtcpReceiverReport::new(self.ssrc);
        if let Some(source) = stats.source_ssrc {
            let mut block = RtcpReportBlock::new(source);
            block.highest_seq = stats.extended_highest_seq;
            rr.add_report_block(block);
        }
        RtcpPacket::ReceiverReport(rr)
    }
}

/// Reporter settings
#[derive(Debug, Clone)]
pub struct RtcpReporterConfig {
    pub interval: Duration,

    /// Run the passive listener on the reporter socket
    pub listen: bool,
}

impl Default for RtcpReporterConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RTCP_INTERVAL,
            listen: true,
        }
    }
}

/// Counts reported by [`RtcpReporterHandle::stop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReporterSummary {
    /// Reports successfully sent
    pub reports_sent: u64,
    /// RTCP packets received and parsed by the listener
    pub reports_received: u64,
}

/// Periodic RTCP reporter, not yet started
pub struct RtcpReporter<B: ReportBuilder> {
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
    builder: B,
    stats: Arc<RtpStats>,
    config: RtcpReporterConfig,
}

impl<B: ReportBuilder> RtcpReporter<B> {
    pub fn new(
        socket: UdpSocket,
        remote: SocketAddr,
        builder: B,
        stats: Arc<RtpStats>,
        config: RtcpReporterConfig,
    ) -> Self {
        Self {
            socket: Arc::new(socket),
            remote,
            builder,
            stats,
            config,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Spawns the reporter (and the listener when enabled)
    pub fn spawn(self) -> RtcpReporterHandle {
        let token = CancellationToken::new();
        let local_addr = self.socket.local_addr().ok();

        let listener = self.config.listen.then(|| {
            tokio::spawn(run_listener(Arc::clone(&self.socket), token.clone()))
        });

        info!(
            "Starting RTCP {} reporter to {} every {:?}",
            self.builder.kind(),
            self.remote,
            self.config.interval
        );
        let reporter = tokio::spawn(run_reporter(
            self.socket,
            self.remote,
            self.builder,
            self.stats,
            self.config.interval,
            token.clone(),
        ));

        RtcpReporterHandle {
            token,
            local_addr,
            reporter: Some(reporter),
            listener,
        }
    }
}

async fn run_reporter<B: ReportBuilder>(
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
    builder: B,
    stats: Arc<RtpStats>,
    interval: Duration,
    token: CancellationToken,
) -> u64 {
    let mut sent = 0u64;

    while !token.is_cancelled() {
        let packet = builder.build(&stats.snapshot());
        let bytes = match packet.serialize() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("rtcp: failed to encode {}: {}", builder.kind(), e);
                break;
            }
        };

        if let Err(e) = socket.send_to(&bytes, remote).await {
            error!("rtcp: failed to send {} to {}: {}", builder.kind(), remote, e);
            break;
        }
        sent += 1;
        debug!("Sent RTCP {} #{} to {}", builder.kind(), sent, remote);

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    debug!("RTCP {} reporter stopped after {} reports", builder.kind(), sent);
    sent
}

async fn run_listener(socket: Arc<UdpSocket>, token: CancellationToken) -> u64 {
    let mut buf = vec![0u8; MAX_RTCP_PACKET_SIZE];
    let mut received = 0u64;

    loop {
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = socket.recv_from(&mut buf) => result,
        };

        match result {
            Ok((len, peer)) => match RtcpPacket::parse_compound(&buf[..len]) {
                Ok(packets) => {
                    received += 1;
                    for packet in &packets {
                        log_packet(packet, peer);
                    }
                }
                Err(e) => warn!("rtcp: unparseable packet from {} ({} bytes): {}", peer, len, e),
            },
            Err(e) if token.is_cancelled() => {
                debug!("RTCP listener closed: {}", e);
                break;
            }
            Err(e) => {
                error!("rtcp: listener transport error: {}", e);
                break;
            }
        }
    }

    debug!("RTCP listener stopped after {} packets", received);
    received
}

fn log_packet(packet: &RtcpPacket, peer: SocketAddr) {
    match packet {
        RtcpPacket::SenderReport(sr) => info!(
            "RTCP SR from {}: ssrc={:#010x} ntp={} packets={} octets={}",
            peer,
            sr.ssrc,
            sr.ntp_timestamp.seconds,
            sr.sender_packet_count,
            sr.sender_octet_count
        ),
        RtcpPacket::ReceiverReport(rr) => {
            info!(
                "RTCP RR from {}: ssrc={:#010x} blocks={}",
                peer,
                rr.ssrc,
                rr.report_blocks.len()
            );
            for block in &rr.report_blocks {
                info!(
                    "  source={:#010x} lost={} fraction={} highest_seq={} jitter={}",
                    block.ssrc,
                    block.cumulative_lost,
                    block.fraction_lost,
                    block.highest_seq,
                    block.jitter
                );
            }
        }
        RtcpPacket::Other { packet_type, body } => {
            trace!("RTCP {:?} from {} ({} bytes)", packet_type, peer, body.len())
        }
    }
}

/// Handle to a running reporter
///
/// Dropping the handle cancels both tasks without waiting for them.
pub struct RtcpReporterHandle {
    token: CancellationToken,
    local_addr: Option<SocketAddr>,
    reporter: Option<JoinHandle<u64>>,
    listener: Option<JoinHandle<u64>>,
}

impl RtcpReporterHandle {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Whether the reporter task has already exited (for example after a
    /// send failure)
    pub fn is_finished(&self) -> bool {
        self.reporter.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Cancels both tasks and waits for them to exit
    pub async fn stop(mut self) -> ReporterSummary {
        self.token.cancel();

        let reports_sent = match self.reporter.take() {
            Some(handle) => join_task(handle, "reporter").await,
            None => 0,
        };
        let reports_received = match self.listener.take() {
            Some(handle) => join_task(handle, "listener").await,
            None => 0,
        };

        info!(
            "RTCP stopped: {} reports sent, {} received",
            reports_sent, reports_received
        );
        ReporterSummary {
            reports_sent,
            reports_received,
        }
    }
}

async fn join_task(handle: JoinHandle<u64>, name: &str) -> u64 {
    match handle.await {
        Ok(count) => count,
        Err(e) => {
            error!("rtcp: {} task failed: {}", name, e);
            0
        }
    }
}

impl Drop for RtcpReporterHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
