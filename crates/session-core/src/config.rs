//! Endpoint configuration
//!
//! An [`EndpointConfig`] holds every address and timer one side of a call
//! needs. Defaults reproduce the two-process loopback deployment: the
//! caller's SIP socket on 127.0.0.1:5060 calls 127.0.0.1:5061, and the
//! callee receives RTP on 5004 and RTCP on 5005.
//!
//! Configuration is read from TOML; every field is optional and falls back
//! to its default:
//!
//! ```toml
//! [sip]
//! local_addr = "127.0.0.1:5061"
//! remote_addr = "127.0.0.1:5060"
//! timeout_ms = 5000
//!
//! [media]
//! local_rtp_addr = "127.0.0.1:5004"
//! pacing = true
//!
//! [rtcp]
//! local_addr = "127.0.0.1:5005"
//! interval_ms = 5000
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use udpcall_rtp_core::media::{DEFAULT_CLOCK_RATE, DEFAULT_FRAME_SAMPLES};
use udpcall_rtp_core::transport::DEFAULT_RECV_BUFFER_SIZE;

use crate::error::{Result, SessionError};
use crate::session::Role;

const CALLER_SIP: u16 = 5060;
const CALLEE_SIP: u16 = 5061;
const CALLEE_RTP: u16 = 5004;
const CALLEE_RTCP: u16 = 5005;
const EPHEMERAL: u16 = 0;

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Complete configuration of one call endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub sip: SipConfig,
    pub media: MediaConfig,
    pub rtcp: RtcpConfig,
}

/// SIP signalling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SipConfig {
    pub local_addr: SocketAddr,
    pub remote_addr: SocketAddr,
    /// Wait for a response, ACK or BYE
    pub timeout_ms: u64,
}

/// RTP settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub local_rtp_addr: SocketAddr,
    /// Initial RTP destination; the caller replaces it with the answer's
    pub remote_rtp_addr: SocketAddr,
    pub frame_samples: usize,
    pub clock_rate: u32,
    pub pacing: bool,
    pub recv_buffer_size: usize,
    /// 0 disables the idle timeout
    pub idle_timeout_ms: u64,
}

/// RTCP settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtcpConfig {
    pub local_addr: SocketAddr,
    /// Overrides the address learned from SDP
    pub remote_addr: Option<SocketAddr>,
    pub interval_ms: u64,
    pub listen: bool,
}

impl Default for SipConfig {
    fn default() -> Self {
        Self {
            local_addr: addr(CALLER_SIP),
            remote_addr: addr(CALLEE_SIP),
            timeout_ms: 5_000,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            local_rtp_addr: addr(EPHEMERAL),
            remote_rtp_addr: addr(CALLEE_RTP),
            frame_samples: DEFAULT_FRAME_SAMPLES,
            clock_rate: DEFAULT_CLOCK_RATE,
            pacing: true,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            idle_timeout_ms: 30_000,
        }
    }
}

impl Default for RtcpConfig {
    fn default() -> Self {
        Self {
            local_addr: addr(EPHEMERAL),
            remote_addr: None,
            interval_ms: 5_000,
            listen: true,
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::for_role(Role::Caller)
    }
}

impl EndpointConfig {
    /// Default configuration for one side of the loopback deployment
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Caller => Self {
                sip: SipConfig::default(),
                media: MediaConfig::default(),
                rtcp: RtcpConfig::default(),
            },
            Role::Callee => Self {
                sip: SipConfig {
                    local_addr: addr(CALLEE_SIP),
                    remote_addr: addr(CALLER_SIP),
                    ..Default::default()
                },
                media: MediaConfig {
                    local_rtp_addr: addr(CALLEE_RTP),
                    remote_rtp_addr: addr(EPHEMERAL),
                    ..Default::default()
                },
                rtcp: RtcpConfig {
                    local_addr: addr(CALLEE_RTCP),
                    ..Default::default()
                },
            },
        }
    }

    /// Parses a TOML document; absent fields keep their defaults
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Serializes back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SessionError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sip.timeout_ms == 0 {
            return Err(SessionError::Config("sip.timeout_ms must be positive".into()));
        }
        if self.rtcp.interval_ms == 0 {
            return Err(SessionError::Config("rtcp.interval_ms must be positive".into()));
        }
        if self.media.frame_samples == 0 {
            return Err(SessionError::Config("media.frame_samples must be positive".into()));
        }
        if self.media.clock_rate == 0 {
            return Err(SessionError::Config("media.clock_rate must be positive".into()));
        }
        Ok(())
    }

    pub fn sip_timeout(&self) -> Duration {
        Duration::from_millis(self.sip.timeout_ms)
    }

    pub fn rtcp_interval(&self) -> Duration {
        Duration::from_millis(self.rtcp.interval_ms)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.media.idle_timeout_ms > 0).then(|| Duration::from_millis(self.media.idle_timeout_ms))
    }

    /// Bytes per frame of 16-bit mono PCM
    pub fn frame_bytes(&self) -> usize {
        self.media.frame_samples * 2
    }
}
