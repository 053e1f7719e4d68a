//! Session Description Protocol (SDP)
//!
//! The offer and answer exchanged in INVITE / 200 OK describe a single
//! audio stream:
//!
//! ```text
//! v=0
//! o=- 0 0 IN IP4 127.0.0.1
//! s=VoIP Call
//! c=IN IP4 127.0.0.1
//! t=0 0
//! m=audio 5004 RTP/AVP 0
//! a=rtpmap:0 PCMU/8000
//! a=rtcp:5005
//! ```
//!
//! Parsing is line based (`<type>=<value>`). Only the first `m=audio`
//! section is read; other media sections and unknown attributes are
//! ignored. A media-level `c=` line overrides the session-level one.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use nom::{
    character::complete::{anychar, char, not_line_ending},
    IResult,
};

use crate::error::{Error, Result};

/// Session name written into every offer and answer
pub const DEFAULT_SESSION_NAME: &str = "VoIP Call";

/// Static payload type for G.711 mu-law (RFC 3551)
pub const PCMU_PAYLOAD_TYPE: u8 = 0;

/// Audio clock rate used for narrowband calls
pub const DEFAULT_CLOCK_RATE: u32 = 8000;

/// Parse one `<type>=<value>` line, returning the remaining input
pub fn parse_sdp_line(input: &str) -> IResult<&str, (char, &str)> {
    let (input, key) = anychar(input)?;
    let (input, _) = char('=')(input)?;
    let (input, value) = not_line_ending(input)?;
    let input = input.trim_start_matches(['\r', '\n']);
    Ok((input, (key, value.trim())))
}

/// Parsed or composed session description for one audio stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    /// Address in the `o=` line
    pub origin_addr: IpAddr,
    /// `s=` line
    pub session_name: String,
    /// Address media should be sent to (`c=`)
    pub connection_addr: IpAddr,
    /// RTP port from the `m=audio` line
    pub media_port: u16,
    /// First payload type listed in the `m=audio` line
    pub payload_type: u8,
    /// Encoding name from the matching `a=rtpmap`
    pub codec: String,
    /// Clock rate from the matching `a=rtpmap`
    pub clock_rate: u32,
    /// Explicit RTCP port (`a=rtcp:`), if advertised
    pub rtcp_port: Option<u16>,
}

impl SessionDescription {
    /// PCMU/8000 audio offer for the given address and RTP port
    pub fn audio(addr: IpAddr, media_port: u16) -> Self {
        Self {
            origin_addr: addr,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            connection_addr: addr,
            media_port,
            payload_type: PCMU_PAYLOAD_TYPE,
            codec: "PCMU".to_string(),
            clock_rate: DEFAULT_CLOCK_RATE,
            rtcp_port: None,
        }
    }

    /// Advertises an explicit RTCP port
    pub fn with_rtcp_port(mut self, port: u16) -> Self {
        self.rtcp_port = Some(port);
        self
    }

    /// RTCP port the peer expects: the advertised one, else RTP port + 1
    pub fn effective_rtcp_port(&self) -> u16 {
        self.rtcp_port
            .unwrap_or_else(|| self.media_port.wrapping_add(1))
    }

    pub fn parse(input: &str) -> Result<Self> {
        input.parse()
    }
}

fn addr_type(addr: &IpAddr) -> &'static str {
    match addr {
        IpAddr::V4(_) => "IP4",
        IpAddr::V6(_) => "IP6",
    }
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v=0\r\n")?;
        write!(
            f,
            "o=- 0 0 IN {} {}\r\n",
            addr_type(&self.origin_addr),
            self.origin_addr
        )?;
        write!(f, "s={}\r\n", self.session_name)?;
        write!(
            f,
            "c=IN {} {}\r\n",
            addr_type(&self.connection_addr),
            self.connection_addr
        )?;
        write!(f, "t=0 0\r\n")?;
        write!(f, "m=audio {} RTP/AVP {}\r\n", self.media_port, self.payload_type)?;
        write!(
            f,
            "a=rtpmap:{} {}/{}\r\n",
            self.payload_type, self.codec, self.clock_rate
        )?;
        if let Some(port) = self.rtcp_port {
            write!(f, "a=rtcp:{}\r\n", port)?;
        }
        Ok(())
    }
}

/// `IN IP4 <addr>` / `IN IP6 <addr>`
fn parse_net_addr(value: &str) -> Result<IpAddr> {
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("IN"), Some("IP4" | "IP6"), Some(addr)) => addr
            .parse::<IpAddr>()
            .map_err(|_| Error::InvalidSdp(format!("invalid address '{}'", addr))),
        _ => Err(Error::InvalidSdp(format!("invalid network address '{}'", value))),
    }
}

fn parse_origin(value: &str) -> Result<IpAddr> {
    // <username> <sess-id> <sess-version> <nettype> <addrtype> <address>
    let fields: Vec<&str> = value.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(Error::InvalidSdp(format!("invalid origin '{}'", value)));
    }
    parse_net_addr(&fields[3..].join(" "))
}

/// `audio <port> RTP/AVP <fmt> ...`, `None` for non-audio media
fn parse_media(value: &str) -> Result<Option<(u16, u8)>> {
    let mut parts = value.split_whitespace();
    if parts.next() != Some("audio") {
        return Ok(None);
    }
    let port = parts
        .next()
        .and_then(|p| p.split('/').next())
        .and_then(|p| p.parse::<u16>().ok())
        .ok_or_else(|| Error::InvalidSdp(format!("invalid media port in '{}'", value)))?;
    let _proto = parts
        .next()
        .ok_or_else(|| Error::InvalidSdp(format!("missing transport in '{}'", value)))?;
    let pt = parts
        .next()
        .and_then(|p| p.parse::<u8>().ok())
        .filter(|pt| *pt < 128)
        .ok_or_else(|| Error::InvalidSdp(format!("invalid payload type in '{}'", value)))?;
    Ok(Some((port, pt)))
}

/// `rtpmap:<pt> <codec>/<rate>[/<channels>]`
fn parse_rtpmap(value: &str) -> Option<(u8, String, u32)> {
    let (pt, encoding) = value.split_once(' ')?;
    let pt = pt.parse::<u8>().ok()?;
    let mut parts = encoding.trim().split('/');
    let codec = parts.next()?.to_string();
    let rate = parts.next()?.parse::<u32>().ok()?;
    Some((pt, codec, rate))
}

/// `rtcp:<port> [IN IP4 <addr>]`
fn parse_rtcp_attr(value: &str) -> Result<u16> {
    value
        .split_whitespace()
        .next()
        .and_then(|p| p.parse::<u16>().ok())
        .ok_or_else(|| Error::InvalidSdp(format!("invalid rtcp attribute '{}'", value)))
}

impl FromStr for SessionDescription {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut origin_addr = None;
        let mut session_name = None;
        let mut session_conn = None;
        let mut media_conn = None;
        let mut media: Option<(u16, u8)> = None;
        let mut rtpmaps: Vec<(u8, String, u32)> = Vec::new();
        let mut rtcp_port = None;
        // true while inside the first audio section
        let mut in_audio = false;
        let mut seen_media = false;
        let mut version_seen = false;

        let mut input = s.trim_start();
        while !input.is_empty() {
            let (rest, (key, value)) = parse_sdp_line(input)
                .map_err(|_| Error::InvalidSdp(format!("malformed line near '{}'", first_line(input))))?;
            input = rest;

            match key {
                'v' => {
                    if value != "0" {
                        return Err(Error::InvalidSdp(format!("unsupported version '{}'", value)));
                    }
                    version_seen = true;
                }
                'o' => origin_addr = Some(parse_origin(value)?),
                's' => session_name = Some(value.to_string()),
                'c' if !seen_media => session_conn = Some(parse_net_addr(value)?),
                'c' if in_audio => media_conn = Some(parse_net_addr(value)?),
                'm' => {
                    seen_media = true;
                    in_audio = false;
                    if media.is_none() {
                        if let Some(parsed) = parse_media(value)? {
                            media = Some(parsed);
                            in_audio = true;
                        }
                    }
                }
                'a' if in_audio => {
                    if let Some(map) = value.strip_prefix("rtpmap:") {
                        if let Some(entry) = parse_rtpmap(map) {
                            rtpmaps.push(entry);
                        }
                    } else if let Some(rtcp) = value.strip_prefix("rtcp:") {
                        rtcp_port = Some(parse_rtcp_attr(rtcp)?);
                    }
                }
                _ => {}
            }
        }

        if !version_seen {
            return Err(Error::InvalidSdp("missing v= line".to_string()));
        }
        let (media_port, payload_type) =
            media.ok_or_else(|| Error::InvalidSdp("missing m=audio line".to_string()))?;
        let connection_addr = media_conn
            .or(session_conn)
            .ok_or_else(|| Error::InvalidSdp("missing c= line".to_string()))?;

        // Static payload types may omit a=rtpmap
        let (codec, clock_rate) = match rtpmaps.into_iter().find(|(pt, _, _)| *pt == payload_type) {
            Some((_, codec, rate)) => (codec, rate),
            None if payload_type == PCMU_PAYLOAD_TYPE => ("PCMU".to_string(), DEFAULT_CLOCK_RATE),
            None => {
                return Err(Error::InvalidSdp(format!(
                    "no rtpmap for dynamic payload type {}",
                    payload_type
                )))
            }
        };

        Ok(SessionDescription {
            origin_addr: origin_addr.unwrap_or(connection_addr),
            session_name: session_name.unwrap_or_else(|| "-".to_string()),
            connection_addr,
            media_port,
            payload_type,
            codec,
            clock_rate,
            rtcp_port,
        })
    }
}

fn first_line(input: &str) -> &str {
    input.lines().next().unwrap_or_default()
}
