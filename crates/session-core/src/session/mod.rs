//! SIP call-control state
//!
//! One [`SipSession`] drives one call leg through
//! `Idle → OfferSent | OfferReceived → Established → Terminating → Closed`.
//! The [`Role`] only decides which side sends the offer; teardown is the
//! same for both: send BYE, wait for the peer's BYE, release the socket.

mod sip_session;

pub use sip_session::{SessionParams, SipSession};

use std::fmt;
use std::net::SocketAddr;

use tracing::debug;

/// Which side of the offer/answer exchange this endpoint plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sends the INVITE with the SDP offer
    Caller,
    /// Waits for an INVITE and answers it
    Callee,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Caller => write!(f, "caller"),
            Role::Callee => write!(f, "callee"),
        }
    }
}

/// Lifecycle state of a call leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    Idle,
    /// INVITE sent, waiting for the final response
    OfferSent,
    /// INVITE answered with 200 OK, waiting for ACK
    OfferReceived,
    Established,
    /// BYE sent, waiting for the peer's BYE
    Terminating,
    Closed,
}

impl CallState {
    pub fn is_closed(&self) -> bool {
        matches!(self, CallState::Closed)
    }
}

/// Addresses and identifiers of one call
#[derive(Debug, Clone)]
pub struct CallSession {
    pub role: Role,
    pub call_id: String,
    pub local_sip: SocketAddr,
    pub remote_sip: SocketAddr,
    pub local_rtp: SocketAddr,
    pub remote_rtp: SocketAddr,
    pub local_rtcp: SocketAddr,
    pub remote_rtcp: SocketAddr,
    state: CallState,
    cseq: u32,
}

impl CallSession {
    pub(crate) fn new(role: Role, call_id: String, params: &SessionParams) -> Self {
        Self {
            role,
            call_id,
            local_sip: params.local_sip,
            remote_sip: params.remote_sip,
            local_rtp: params.local_rtp,
            remote_rtp: params.remote_rtp,
            local_rtcp: params.local_rtcp,
            remote_rtcp: params.remote_rtcp,
            state: CallState::Idle,
            cseq: 0,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// CSeq of the last request sent, 0 before the first
    pub fn cseq(&self) -> u32 {
        self.cseq
    }

    pub(crate) fn next_cseq(&mut self) -> u32 {
        self.cseq += 1;
        self.cseq
    }

    pub(crate) fn set_state(&mut self, state: CallState) {
        if self.state != state {
            debug!("Call {} ({}): {:?} -> {:?}", self.call_id, self.role, self.state, state);
            self.state = state;
        }
    }
}

/// Media parameters agreed during the offer/answer exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedMedia {
    /// Where the peer receives RTP
    pub remote_rtp: SocketAddr,
    /// Where the peer receives RTCP
    pub remote_rtcp: SocketAddr,
    pub payload_type: u8,
    pub codec: String,
    pub clock_rate: u32,
}

/// How teardown finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// BYE sent and the peer's BYE received
    PeerBye,
    /// BYE sent, the peer's BYE never arrived
    TimedOut,
    /// The call was never established; the socket was just released
    Released,
}
