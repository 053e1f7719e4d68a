//! SIP headers
//!
//! Headers are kept as name / raw value pairs in the order they appear on
//! the wire. [`HeaderName`] recognizes the headers this stack reads and
//! writes, including their compact forms (RFC 3261 Section 7.3.3).

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::parser::is_token_char;

/// Name of a SIP header
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderName {
    Via,
    To,
    From,
    CallId,
    CSeq,
    Contact,
    MaxForwards,
    ContentType,
    ContentLength,
    /// Any other header, stored as received
    Other(String),
}

impl HeaderName {
    /// Canonical (long form) name
    pub fn as_str(&self) -> &str {
        match self {
            HeaderName::Via => "Via",
            HeaderName::To => "To",
            HeaderName::From => "From",
            HeaderName::CallId => "Call-ID",
            HeaderName::CSeq => "CSeq",
            HeaderName::Contact => "Contact",
            HeaderName::MaxForwards => "Max-Forwards",
            HeaderName::ContentType => "Content-Type",
            HeaderName::ContentLength => "Content-Length",
            HeaderName::Other(name) => name,
        }
    }

    /// Case-insensitive comparison, needed for `Other` names
    pub fn matches(&self, other: &HeaderName) -> bool {
        match (self, other) {
            (HeaderName::Other(a), HeaderName::Other(b)) => a.eq_ignore_ascii_case(b),
            _ => self == other,
        }
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeaderName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.chars().all(is_token_char) {
            return Err(Error::InvalidHeader(format!("invalid header name '{}'", s)));
        }
        let name = match s.to_ascii_lowercase().as_str() {
            "via" | "v" => HeaderName::Via,
            "to" | "t" => HeaderName::To,
            "from" | "f" => HeaderName::From,
            "call-id" | "i" => HeaderName::CallId,
            "cseq" => HeaderName::CSeq,
            "contact" | "m" => HeaderName::Contact,
            "max-forwards" => HeaderName::MaxForwards,
            "content-type" | "c" => HeaderName::ContentType,
            "content-length" | "l" => HeaderName::ContentLength,
            _ => HeaderName::Other(s.to_string()),
        };
        Ok(name)
    }
}

/// A single header line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: HeaderName,
    pub value: String,
}

impl Header {
    pub fn new(name: HeaderName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Returns the `tag` parameter of a From / To header value, if any
pub fn tag_param(value: &str) -> Option<&str> {
    // Parameters follow the closing '>' of a name-addr
    let params = match value.rfind('>') {
        Some(idx) => &value[idx + 1..],
        None => value,
    };
    params
        .split(';')
        .skip(1)
        .filter_map(|param| param.trim().split_once('='))
        .find(|(name, _)| name.eq_ignore_ascii_case("tag"))
        .map(|(_, tag)| tag.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_forms() {
        assert_eq!("v".parse::<HeaderName>().unwrap(), HeaderName::Via);
        assert_eq!("i".parse::<HeaderName>().unwrap(), HeaderName::CallId);
        assert_eq!("l".parse::<HeaderName>().unwrap(), HeaderName::ContentLength);
        assert_eq!("c".parse::<HeaderName>().unwrap(), HeaderName::ContentType);
    }

    #[test]
    fn test_case_insensitive_names() {
        assert_eq!("CALL-ID".parse::<HeaderName>().unwrap(), HeaderName::CallId);
        assert_eq!("content-length".parse::<HeaderName>().unwrap(), HeaderName::ContentLength);

        let a: HeaderName = "X-Custom".parse().unwrap();
        let b: HeaderName = "x-custom".parse().unwrap();
        assert!(a.matches(&b));
    }

    #[test]
    fn test_invalid_name() {
        assert!("".parse::<HeaderName>().is_err());
        assert!("Call ID".parse::<HeaderName>().is_err());
    }

    #[test]
    fn test_tag_param() {
        assert_eq!(tag_param("<sip:127.0.0.1:5060>;tag=abc123"), Some("abc123"));
        assert_eq!(tag_param("<sip:127.0.0.1:5060;transport=udp>"), None);
        assert_eq!(tag_param("sip:127.0.0.1:5060;TAG=x"), Some("x"));
        assert_eq!(tag_param("<sip:127.0.0.1:5060>"), None);
    }
}
