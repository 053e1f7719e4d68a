//! Call orchestration
//!
//! A [`CallEndpoint`] binds all three sockets of one side of a call (SIP,
//! RTP, RTCP) before any signalling happens, so RTP arriving right after
//! the handshake is already queued. Running the call then goes through:
//!
//! 1. SIP offer/answer until `Established`
//! 2. RTCP reporter (and listener) spawned
//! 3. RTP media loop: the caller sends, the callee receives
//! 4. RTCP reporter stopped and joined
//! 5. SIP teardown, always attempted, also after a failure

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{error, info, warn};

use udpcall_rtp_core::media::{RtpReceiverConfig, RtpSenderConfig};
use udpcall_rtp_core::transport::bind_udp_socket;
use udpcall_rtp_core::{
    AudioSink, AudioSource, ReceiveSummary, ReceiverReportBuilder, ReportBuilder, ReporterSummary,
    RtcpReporter, RtcpReporterConfig, RtpReceiver, RtpSender, RtpStats, SendSummary,
    SenderReportBuilder,
};
use udpcall_sip_transport::UdpTransport;

use crate::config::EndpointConfig;
use crate::error::{Result, SessionError};
use crate::session::{NegotiatedMedia, Role, SessionParams, SipSession, Teardown};

/// What happened during one finished call
#[derive(Debug, Clone)]
pub struct CallReport {
    pub call_id: String,
    pub media: NegotiatedMedia,
    /// Caller side only
    pub sent: Option<SendSummary>,
    /// Callee side only
    pub received: Option<ReceiveSummary>,
    pub rtcp: ReporterSummary,
    pub teardown: Teardown,
}

/// One side of a call with its sockets bound
pub struct CallEndpoint {
    config: EndpointConfig,
    role: Role,
    session: SipSession,
    rtp_socket: UdpSocket,
    rtcp_socket: UdpSocket,
}

impl CallEndpoint {
    /// Binds the RTP, RTCP and SIP sockets
    pub async fn bind(role: Role, config: EndpointConfig) -> Result<Self> {
        config.validate()?;

        let rtp_socket = bind_udp_socket(
            config.media.local_rtp_addr,
            Some(config.media.recv_buffer_size),
        )?;
        let rtcp_socket = UdpSocket::bind(config.rtcp.local_addr).await?;
        let transport = UdpTransport::bind(config.sip.local_addr).await?;

        let remote_rtp = config.media.remote_rtp_addr;
        let params = SessionParams {
            local_sip: transport.local_addr(),
            remote_sip: config.sip.remote_addr,
            local_rtp: rtp_socket.local_addr()?,
            local_rtcp: rtcp_socket.local_addr()?,
            remote_rtp,
            remote_rtcp: config
                .rtcp
                .remote_addr
                .unwrap_or_else(|| SocketAddr::new(remote_rtp.ip(), remote_rtp.port().wrapping_add(1))),
            timeout: config.sip_timeout(),
        };
        info!(
            "{} endpoint: SIP {} RTP {} RTCP {}",
            role, params.local_sip, params.local_rtp, params.local_rtcp
        );

        Ok(Self {
            session: SipSession::new(role, transport, params),
            config,
            role,
            rtp_socket,
            rtcp_socket,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn session(&self) -> &SipSession {
        &self.session
    }

    pub fn local_sip_addr(&self) -> SocketAddr {
        self.session.local_addr()
    }

    pub fn local_rtp_addr(&self) -> SocketAddr {
        self.session.call().local_rtp
    }

    pub fn local_rtcp_addr(&self) -> SocketAddr {
        self.session.call().local_rtcp
    }

    /// Places the call and streams `source` to the callee
    pub async fn run_as_caller<S: AudioSource + ?Sized>(self, source: &mut S) -> Result<CallReport> {
        self.ensure_role(Role::Caller)?;
        let Self {
            config,
            mut session,
            rtp_socket,
            rtcp_socket,
            ..
        } = self;

        let media = match session.start_call().await {
            Ok(media) => media,
            Err(e) => {
                release(&mut session).await;
                return Err(e);
            }
        };

        let sender_config = RtpSenderConfig {
            payload_type: media.payload_type,
            clock_rate: media.clock_rate,
            pacing: config.media.pacing,
        };
        let mut sender = RtpSender::new(rtp_socket, media.remote_rtp, sender_config);
        let builder = SenderReportBuilder::new(sender.ssrc());
        let reporter = start_reporter(&config, &media, rtcp_socket, builder, sender.stats());

        let streamed = sender.run(source).await;
        let rtcp = reporter.stop().await;
        let teardown = session.end_call().await;

        let sent = streamed.map_err(|e| {
            error!("rtp: sending to {} failed: {}", media.remote_rtp, e);
            SessionError::Media(e)
        })?;
        let teardown = teardown?;

        Ok(CallReport {
            call_id: session.call().call_id.clone(),
            media,
            sent: Some(sent),
            received: None,
            rtcp,
            teardown,
        })
    }

    /// Answers one incoming call and writes the received audio to `sink`
    pub async fn run_as_callee<K: AudioSink + ?Sized>(self, sink: &mut K) -> Result<CallReport> {
        self.ensure_role(Role::Callee)?;
        let Self {
            config,
            mut session,
            rtp_socket,
            rtcp_socket,
            ..
        } = self;

        let media = match session.receive_call().await {
            Ok(media) => media,
            Err(e) => {
                release(&mut session).await;
                return Err(e);
            }
        };

        let receiver_config = RtpReceiverConfig {
            recv_buffer_size: config.media.recv_buffer_size,
            idle_timeout: config.idle_timeout(),
        };
        let mut receiver = RtpReceiver::from_socket(rtp_socket, receiver_config);
        let builder = ReceiverReportBuilder::new(rand::random());
        let reporter = start_reporter(&config, &media, rtcp_socket, builder, receiver.stats());

        let received = receiver.run(sink).await;
        let rtcp = reporter.stop().await;
        let teardown = session.end_call().await;

        let received = received.map_err(|e| {
            error!("rtp: receiving on {} failed: {}", session.call().local_rtp, e);
            SessionError::Media(e)
        })?;
        let teardown = teardown?;

        Ok(CallReport {
            call_id: session.call().call_id.clone(),
            media,
            sent: None,
            received: Some(received),
            rtcp,
            teardown,
        })
    }

    fn ensure_role(&self, role: Role) -> Result<()> {
        if self.role != role {
            return Err(SessionError::InvalidState {
                operation: match role {
                    Role::Caller => "run_as_caller",
                    Role::Callee => "run_as_callee",
                },
                state: self.session.state(),
            });
        }
        Ok(())
    }
}

/// Configured RTCP address wins over the one learned from SDP
fn remote_rtcp(config: &EndpointConfig, media: &NegotiatedMedia) -> SocketAddr {
    config.rtcp.remote_addr.unwrap_or(media.remote_rtcp)
}

fn start_reporter<B: ReportBuilder>(
    config: &EndpointConfig,
    media: &NegotiatedMedia,
    socket: UdpSocket,
    builder: B,
    stats: Arc<RtpStats>,
) -> udpcall_rtp_core::RtcpReporterHandle {
    let reporter_config = RtcpReporterConfig {
        interval: config.rtcp_interval(),
        listen: config.rtcp.listen,
    };
    RtcpReporter::new(socket, remote_rtcp(config, media), builder, stats, reporter_config).spawn()
}

async fn release(session: &mut SipSession) {
    if let Err(e) = session.end_call().await {
        warn!("teardown: {}", e);
    }
}
