//! # SIP URI
//!
//! A deliberately small `sip:` URI: optional user part, host and optional
//! port. Calls in this stack address peers directly by IP and port, so the
//! URI can be converted to and from a [`SocketAddr`].
//!
//! ```rust
//! use udpcall_sip_core::types::SipUri;
//!
//! let uri: SipUri = "sip:127.0.0.1:5061".parse().unwrap();
//! assert_eq!(uri.host, "127.0.0.1");
//! assert_eq!(uri.port, Some(5061));
//! assert_eq!(uri.to_string(), "sip:127.0.0.1:5061");
//! assert_eq!(uri.socket_addr(), Some("127.0.0.1:5061".parse().unwrap()));
//! ```

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default SIP port over UDP
pub const DEFAULT_SIP_PORT: u16 = 5060;

/// A `sip:[user@]host[:port]` URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SipUri {
    /// Optional user part
    pub user: Option<String>,
    /// Host name or IP address (IPv6 without brackets)
    pub host: String,
    /// Optional port
    pub port: Option<u16>,
}

impl SipUri {
    /// Creates a URI pointing directly at a socket address
    pub fn from_addr(addr: SocketAddr) -> Self {
        Self {
            user: None,
            host: addr.ip().to_string(),
            port: Some(addr.port()),
        }
    }

    /// Resolves the URI to a socket address when the host is an IP literal
    ///
    /// A missing port resolves to [`DEFAULT_SIP_PORT`].
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        let ip = self.host.parse::<IpAddr>().ok()?;
        Some(SocketAddr::new(ip, self.port.unwrap_or(DEFAULT_SIP_PORT)))
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sip:")?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

impl FromStr for SipUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix('<').and_then(|s| s.strip_suffix('>')).unwrap_or(s);
        let rest = s
            .strip_prefix("sip:")
            .ok_or_else(|| Error::InvalidUri(s.to_string()))?;

        // URI parameters and headers are not used by this stack
        let rest = rest.split([';', '?']).next().unwrap_or_default();

        let (user, hostport) = match rest.rsplit_once('@') {
            Some((user, hostport)) if !user.is_empty() => (Some(user.to_string()), hostport),
            Some(_) => return Err(Error::InvalidUri(s.to_string())),
            None => (None, rest),
        };

        let (host, port) = if let Some(bracketed) = hostport.strip_prefix('[') {
            let (host, after) = bracketed
                .split_once(']')
                .ok_or_else(|| Error::InvalidUri(s.to_string()))?;
            let port = match after.strip_prefix(':') {
                Some(port) => Some(parse_port(port, s)?),
                None if after.is_empty() => None,
                None => return Err(Error::InvalidUri(s.to_string())),
            };
            (host, port)
        } else {
            match hostport.split_once(':') {
                Some((host, port)) => (host, Some(parse_port(port, s)?)),
                None => (hostport, None),
            }
        };

        if host.is_empty() {
            return Err(Error::InvalidUri(s.to_string()));
        }

        Ok(SipUri {
            user,
            host: host.to_string(),
            port,
        })
    }
}

fn parse_port(port: &str, uri: &str) -> Result<u16> {
    port.parse::<u16>()
        .map_err(|_| Error::InvalidUri(uri.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_user() {
        let uri: SipUri = "sip:alice@10.0.0.1:5070".parse().unwrap();
        assert_eq!(uri.user.as_deref(), Some("alice"));
        assert_eq!(uri.host, "10.0.0.1");
        assert_eq!(uri.port, Some(5070));
        assert_eq!(uri.to_string(), "sip:alice@10.0.0.1:5070");
    }

    #[test]
    fn test_parse_angle_brackets_and_params() {
        let uri: SipUri = "<sip:127.0.0.1:5060;transport=udp>".parse().unwrap();
        assert_eq!(uri.host, "127.0.0.1");
        assert_eq!(uri.port, Some(5060));
    }

    #[test]
    fn test_default_port() {
        let uri: SipUri = "sip:192.168.1.2".parse().unwrap();
        assert_eq!(uri.port, None);
        assert_eq!(uri.socket_addr(), Some("192.168.1.2:5060".parse().unwrap()));
    }

    #[test]
    fn test_ipv6() {
        let addr: SocketAddr = "[::1]:5061".parse().unwrap();
        let uri = SipUri::from_addr(addr);
        assert_eq!(uri.to_string(), "sip:[::1]:5061");

        let parsed: SipUri = uri.to_string().parse().unwrap();
        assert_eq!(parsed.host, "::1");
        assert_eq!(parsed.socket_addr(), Some(addr));
    }

    #[test]
    fn test_hostname_has_no_socket_addr() {
        let uri: SipUri = "sip:example.com:5060".parse().unwrap();
        assert_eq!(uri.socket_addr(), None);
    }

    #[test]
    fn test_invalid() {
        assert!("http://example.com".parse::<SipUri>().is_err());
        assert!("sip:".parse::<SipUri>().is_err());
        assert!("sip:host:notaport".parse::<SipUri>().is_err());
        assert!("sip:@host".parse::<SipUri>().is_err());
        assert!("sip:[::1".parse::<SipUri>().is_err());
    }
}
