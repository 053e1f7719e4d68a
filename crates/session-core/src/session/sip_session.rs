use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use udpcall_sip_core::{
    generate_branch, generate_call_id, generate_tag, Header, HeaderName, Message, Method, Request,
    RequestBuilder, Response, ResponseBuilder, SessionDescription, SipUri, StatusCode,
    SDP_CONTENT_TYPE,
};
use udpcall_sip_transport::{Error as TransportError, UdpTransport};

use super::{CallSession, CallState, NegotiatedMedia, Role, Teardown};
use crate::error::{Result, SessionError};

/// Addresses and timer a [`SipSession`] is created with
///
/// The media addresses must be the addresses the RTP and RTCP sockets are
/// actually bound to: they are advertised in SDP.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub local_sip: SocketAddr,
    pub remote_sip: SocketAddr,
    pub local_rtp: SocketAddr,
    pub local_rtcp: SocketAddr,
    /// Initial guess, replaced by what the peer's SDP advertises
    pub remote_rtp: SocketAddr,
    pub remote_rtcp: SocketAddr,
    /// Bound on every wait for a response, ACK or BYE
    pub timeout: Duration,
}

/// SIP state machine for one call leg
pub struct SipSession {
    transport: UdpTransport,
    call: CallSession,
    timeout: Duration,
    local_tag: String,
    remote_tag: Option<String>,
    /// 200 OK sent to the INVITE, kept for retransmitted INVITEs
    answer: Option<Response>,
}

impl SipSession {
    /// Binds the SIP socket at `params.local_sip`
    pub async fn bind(role: Role, params: SessionParams) -> Result<Self> {
        let transport = UdpTransport::bind(params.local_sip).await?;
        Ok(Self::new(role, transport, params))
    }

    /// Wraps an already bound transport
    pub fn new(role: Role, transport: UdpTransport, mut params: SessionParams) -> Self {
        params.local_sip = transport.local_addr();
        let call = CallSession::new(role, generate_call_id(), &params);
        Self {
            transport,
            call,
            timeout: params.timeout,
            local_tag: generate_tag(),
            remote_tag: None,
            answer: None,
        }
    }

    pub fn call(&self) -> &CallSession {
        &self.call
    }

    pub fn state(&self) -> CallState {
        self.call.state()
    }

    pub fn role(&self) -> Role {
        self.call.role
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Sends the INVITE with an SDP offer and waits for the answer
    ///
    /// On 200 OK the remote RTP endpoint becomes the one in the answer and
    /// ACK is sent. Provisional responses are logged and the wait goes on
    /// within the same deadline. Any failure closes the session.
    pub async fn start_call(&mut self) -> Result<NegotiatedMedia> {
        self.ensure(Role::Caller, CallState::Idle, "start_call")?;

        let offer = self.local_description();
        let cseq = self.call.next_cseq();
        let invite = self
            .request(Method::Invite, cseq)
            .body(SDP_CONTENT_TYPE, offer.to_string())
            .build();

        info!(
            "Calling {} (call-id {}), offering RTP on {}",
            self.call.remote_sip, self.call.call_id, self.call.local_rtp
        );
        if let Err(e) = self.transport.send_message(&invite.into(), self.call.remote_sip).await {
            return Err(self.fail(e.into()));
        }
        self.call.set_state(CallState::OfferSent);

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let response = match self.transport.recv_message_timeout(remaining).await {
                Ok((Message::Response(response), _)) => response,
                Ok((Message::Request(request), peer)) => {
                    let err = SessionError::Protocol(format!(
                        "expected a response to INVITE, got {} from {}",
                        request.method, peer
                    ));
                    return Err(self.fail(err));
                }
                Err(TransportError::Timeout(_)) => {
                    return Err(self.fail(SessionError::Timeout(self.timeout)));
                }
                Err(e @ TransportError::Parse { .. }) => {
                    let err = SessionError::Protocol(e.to_string());
                    return Err(self.fail(err));
                }
                Err(e) => return Err(self.fail(e.into())),
            };

            if !self.same_call(response.call_id()) {
                warn!(
                    "Ignoring {} {} for another call ({:?})",
                    response.status,
                    response.reason,
                    response.call_id()
                );
                continue;
            }

            let status = response.status;
            if status.is_provisional() {
                info!("Call {} progressing: {} {}", self.call.call_id, status, response.reason);
                continue;
            }
            if status.is_success() {
                return self.accept_answer(response, cseq).await;
            }

            let reason = response.reason.clone();
            let err = if status.is_error() {
                SessionError::Rejected { status, reason }
            } else {
                SessionError::UnexpectedResponse { status, reason }
            };
            return Err(self.fail(err));
        }
    }

    async fn accept_answer(&mut self, response: Response, cseq: u32) -> Result<NegotiatedMedia> {
        let answer = match parse_body(response.body_str()) {
            Ok(answer) => answer,
            Err(e) => return Err(self.fail(e)),
        };
        let media = self.adopt_remote_media(&answer);
        self.remote_tag = response.to_tag().map(str::to_string);

        let ack = self.request(Method::Ack, cseq).build();
        if let Err(e) = self.transport.send_message(&ack.into(), self.call.remote_sip).await {
            return Err(self.fail(e.into()));
        }

        self.call.set_state(CallState::Established);
        info!(
            "Call {} established, sending RTP to {}",
            self.call.call_id, media.remote_rtp
        );
        Ok(media)
    }

    /// Waits for an INVITE, answers it and waits for the ACK
    ///
    /// Requests other than INVITE and unparseable datagrams are skipped
    /// while idle. An INVITE whose SDP is unusable is answered with 488 and
    /// the wait continues. The 200 OK goes to the address the INVITE came
    /// from.
    pub async fn receive_call(&mut self) -> Result<NegotiatedMedia> {
        self.ensure(Role::Callee, CallState::Idle, "receive_call")?;
        info!("Waiting for INVITE on {}", self.transport.local_addr());

        let (invite, peer, offer) = loop {
            let (invite, peer) = match self.transport.recv_message().await {
                Ok((Message::Request(request), peer)) if request.method == Method::Invite => {
                    (request, peer)
                }
                Ok((other, peer)) => {
                    warn!("Ignoring {} from {} while idle", other.start_line(), peer);
                    continue;
                }
                Err(e @ TransportError::Parse { .. }) => {
                    warn!("sip: {}", e);
                    continue;
                }
                Err(e) => return Err(self.fail(e.into())),
            };

            match parse_body(invite.body_str()) {
                Ok(offer) => break (invite, peer, offer),
                Err(e) => {
                    warn!("sip: rejecting INVITE from {}: {}", peer, e);
                    let reject =
                        ResponseBuilder::for_request(StatusCode::NOT_ACCEPTABLE_HERE, &invite)
                            .to_tag(&self.local_tag)
                            .build();
                    if let Err(e) = self.transport.send_message(&reject.into(), peer).await {
                        return Err(self.fail(e.into()));
                    }
                }
            }
        };

        if let Some(call_id) = invite.call_id() {
            self.call.call_id = call_id.to_string();
        }
        self.remote_tag = invite.from_tag().map(str::to_string);
        self.call.remote_sip = peer;
        let media = self.adopt_remote_media(&offer);

        let answer = ResponseBuilder::for_request(StatusCode::OK, &invite)
            .to_tag(&self.local_tag)
            .header(Header::new(
                HeaderName::Contact,
                format!("<{}>", SipUri::from_addr(self.call.local_sip)),
            ))
            .body(SDP_CONTENT_TYPE, self.local_description().to_string())
            .build();
        if let Err(e) = self.transport.send_message(&answer.clone().into(), peer).await {
            return Err(self.fail(e.into()));
        }
        self.answer = Some(answer);
        self.call.set_state(CallState::OfferReceived);
        info!("Answered call {} from {}", self.call.call_id, peer);

        self.wait_for_ack().await?;
        self.call.set_state(CallState::Established);
        info!(
            "Call {} established, expecting RTP on {}",
            self.call.call_id, self.call.local_rtp
        );
        Ok(media)
    }

    async fn wait_for_ack(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.transport.recv_message_timeout(remaining).await {
                Ok((Message::Request(request), peer)) if self.in_dialog(&request) => {
                    match request.method {
                        Method::Ack => return Ok(()),
                        Method::Invite => {
                            debug!("Retransmitted INVITE from {}, resending 200 OK", peer);
                            if let Some(answer) = self.answer.clone() {
                                if let Err(e) = self.transport.send_message(&answer.into(), peer).await {
                                    return Err(self.fail(e.into()));
                                }
                            }
                        }
                        _ => warn!("Ignoring {} from {} while waiting for ACK", request.method, peer),
                    }
                }
                Ok((other, peer)) => {
                    warn!("Ignoring {} from {} while waiting for ACK", other.start_line(), peer)
                }
                Err(TransportError::Timeout(_)) => {
                    return Err(self.fail(SessionError::Timeout(self.timeout)));
                }
                Err(e @ TransportError::Parse { .. }) => warn!("sip: {}", e),
                Err(e) => return Err(self.fail(e.into())),
            }
        }
    }

    /// Sends BYE, waits for the peer's BYE and releases the socket
    ///
    /// Only an established call sends BYE. In any other state the socket is
    /// just released, so this can always be called on the way out. A
    /// missing peer BYE is logged and the socket is released anyway.
    pub async fn end_call(&mut self) -> Result<Teardown> {
        match self.call.state() {
            CallState::Established => {}
            CallState::Closed => return Ok(Teardown::Released),
            state => {
                debug!("Releasing SIP socket of call {} in state {:?}", self.call.call_id, state);
                self.close();
                return Ok(Teardown::Released);
            }
        }

        let cseq = self.call.next_cseq();
        let bye = self.request(Method::Bye, cseq).build();
        if let Err(e) = self.transport.send_message(&bye.into(), self.call.remote_sip).await {
            return Err(self.fail(e.into()));
        }
        self.call.set_state(CallState::Terminating);

        let outcome = self.wait_for_bye().await;
        self.close();
        info!("Call {} closed ({:?})", self.call.call_id, outcome);
        Ok(outcome)
    }

    async fn wait_for_bye(&mut self) -> Teardown {
        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.transport.recv_message_timeout(remaining).await {
                Ok((Message::Request(request), peer))
                    if request.method == Method::Bye && self.in_dialog(&request) =>
                {
                    let ok = ResponseBuilder::for_request(StatusCode::OK, &request).build();
                    if let Err(e) = self.transport.send_message(&ok.into(), peer).await {
                        debug!("teardown: could not answer BYE: {}", e);
                    }
                    return Teardown::PeerBye;
                }
                Ok((other, peer)) => {
                    debug!("Ignoring {} from {} while terminating", other.start_line(), peer)
                }
                Err(TransportError::Timeout(_)) => {
                    warn!(
                        "teardown: no BYE from {} within {:?}",
                        self.call.remote_sip, self.timeout
                    );
                    return Teardown::TimedOut;
                }
                Err(e @ TransportError::Parse { .. }) => debug!("teardown: {}", e),
                Err(e) => {
                    warn!("teardown: transport error while waiting for BYE: {}", e);
                    return Teardown::TimedOut;
                }
            }
        }
    }

    fn request(&self, method: Method, cseq: u32) -> RequestBuilder {
        let local = SipUri::from_addr(self.call.local_sip);
        let remote = SipUri::from_addr(self.call.remote_sip);
        let builder = RequestBuilder::new(method.clone(), remote.clone())
            .via(self.call.local_sip, &generate_branch())
            .from(local.clone(), Some(&self.local_tag))
            .to(remote, self.remote_tag.as_deref())
            .call_id(self.call.call_id.as_str())
            .cseq(cseq);
        if method == Method::Invite {
            builder.contact(local)
        } else {
            builder
        }
    }

    fn in_dialog(&self, request: &Request) -> bool {
        self.same_call(request.call_id())
    }

    fn same_call(&self, call_id: Option<&str>) -> bool {
        call_id == Some(self.call.call_id.as_str())
    }

    fn local_description(&self) -> SessionDescription {
        let ip = advertised_ip(self.call.local_rtp, self.call.local_sip);
        SessionDescription::audio(ip, self.call.local_rtp.port())
            .with_rtcp_port(self.call.local_rtcp.port())
    }

    fn adopt_remote_media(&mut self, remote: &SessionDescription) -> NegotiatedMedia {
        self.call.remote_rtp = SocketAddr::new(remote.connection_addr, remote.media_port);
        self.call.remote_rtcp = SocketAddr::new(remote.connection_addr, remote.effective_rtcp_port());
        debug!(
            "Peer media: RTP {} RTCP {} ({} {}/{})",
            self.call.remote_rtp,
            self.call.remote_rtcp,
            remote.payload_type,
            remote.codec,
            remote.clock_rate
        );
        NegotiatedMedia {
            remote_rtp: self.call.remote_rtp,
            remote_rtcp: self.call.remote_rtcp,
            payload_type: remote.payload_type,
            codec: remote.codec.clone(),
            clock_rate: remote.clock_rate,
        }
    }

    fn ensure(&self, role: Role, state: CallState, operation: &'static str) -> Result<()> {
        if self.call.role != role || self.call.state() != state {
            return Err(SessionError::InvalidState {
                operation,
                state: self.call.state(),
            });
        }
        Ok(())
    }

    /// Closes the session after a failure and hands the error back
    fn fail(&mut self, err: SessionError) -> SessionError {
        error!("sip: call {} failed: {}", self.call.call_id, err);
        self.close();
        err
    }

    fn close(&mut self) {
        self.transport.close();
        self.call.set_state(CallState::Closed);
    }
}

fn parse_body(body: Option<&str>) -> Result<SessionDescription> {
    let body = body.ok_or_else(|| SessionError::Protocol("message carries no SDP body".into()))?;
    Ok(SessionDescription::parse(body)?)
}

fn advertised_ip(media: SocketAddr, sip: SocketAddr) -> IpAddr {
    if !media.ip().is_unspecified() {
        media.ip()
    } else if !sip.ip().is_unspecified() {
        sip.ip()
    } else {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }
}
