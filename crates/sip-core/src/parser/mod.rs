//! SIP message parser
//!
//! Parses a single datagram into a [`Message`]. The grammar handled here is
//! the line-oriented subset of RFC 3261 a direct peer-to-peer call needs:
//!
//! - a request-line (`METHOD SP Request-URI SP SIP/2.0`) or a status-line
//!   (`SIP/2.0 SP 3DIGIT SP Reason-Phrase`)
//! - `Name: value` header lines, with continuation lines folded in
//! - an empty line followed by the body
//!
//! Lines may end in CRLF or a bare LF. When `Content-Length` is present the
//! body is cut to that length (extra bytes after a UDP message are
//! discarded, RFC 3261 Section 18.3); a body shorter than the declared
//! length is an error.

use bytes::Bytes;
use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, space0, space1},
    combinator::rest,
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::types::{Header, HeaderName, Message, Method, Request, Response, SipUri, StatusCode};
use crate::SIP_VERSION;

/// RFC 3261 `token` character
pub fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c)
}

fn token(input: &str) -> IResult<&str, &str> {
    take_while1(is_token_char)(input)
}

fn non_space(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}

/// `METHOD SP Request-URI SP SIP-Version`
fn request_line(input: &str) -> IResult<&str, (&str, &str, &str)> {
    tuple((
        token,
        preceded(space1, non_space),
        preceded(space1, non_space),
    ))(input)
}

/// `SIP-Version SP Status-Code SP Reason-Phrase`
fn status_line(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = tag(SIP_VERSION)(input)?;
    let (input, code) = preceded(space1, digit1)(input)?;
    let (input, reason) = preceded(space0, rest)(input)?;
    Ok((input, (code, reason.trim())))
}

/// `header-name HCOLON header-value`
fn header_line(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, name) = take_while1(|c: char| c != ':' && !c.is_whitespace())(input)?;
    let (input, _) = tuple((space0, char(':')))(input)?;
    let (input, value) = rest(input)?;
    Ok((input, (name, value.trim())))
}

/// Splits a datagram into its header section and body
fn split_head_body(data: &[u8]) -> Result<(&str, &[u8])> {
    let crlf = find(data, b"\r\n\r\n").map(|pos| (pos, pos + 4));
    let lf = find(data, b"\n\n").map(|pos| (pos, pos + 2));
    let (head_end, body_start) = match (crlf, lf) {
        (Some(a), Some(b)) => a.min(b),
        (Some(sep), None) | (None, Some(sep)) => sep,
        // No body separator: everything is header section, tolerate a
        // missing final empty line
        (None, None) => (data.len(), data.len()),
    };

    let head = std::str::from_utf8(&data[..head_end])
        .map_err(|_| Error::InvalidFormat("header section is not valid UTF-8".to_string()))?;
    Ok((head, &data[body_start..]))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Vec<Header>> {
    let mut headers: Vec<Header> = Vec::new();
    for line in lines {
        if line.starts_with([' ', '\t']) {
            // Folded continuation of the previous header
            let last = headers
                .last_mut()
                .ok_or_else(|| Error::InvalidHeader(format!("continuation without header: '{}'", line)))?;
            last.value.push(' ');
            last.value.push_str(line.trim());
            continue;
        }
        if line.is_empty() {
            continue;
        }
        let (_, (name, value)) = header_line(line)
            .map_err(|_| Error::InvalidHeader(format!("malformed header line '{}'", line)))?;
        headers.push(Header::new(name.parse::<HeaderName>()?, value));
    }
    Ok(headers)
}

fn extract_body(headers: &[Header], raw: &[u8]) -> Result<Bytes> {
    let declared = headers
        .iter()
        .find(|h| h.name == HeaderName::ContentLength)
        .map(|h| {
            h.value
                .parse::<usize>()
                .map_err(|_| Error::InvalidHeader(format!("invalid Content-Length '{}'", h.value)))
        })
        .transpose()?;

    match declared {
        Some(declared) if declared > raw.len() => Err(Error::ContentLengthMismatch {
            declared,
            actual: raw.len(),
        }),
        Some(declared) => Ok(Bytes::copy_from_slice(&raw[..declared])),
        None => Ok(Bytes::copy_from_slice(raw)),
    }
}

/// Parses one SIP message from a datagram
///
/// # Examples
///
/// ```rust
/// use udpcall_sip_core::{parse_message, Method};
///
/// let data = b"BYE sip:127.0.0.1:5061 SIP/2.0\r\nCall-ID: x\r\nCSeq: 2 BYE\r\nContent-Length: 0\r\n\r\n";
/// let message = parse_message(data).unwrap();
/// assert_eq!(message.method(), Some(&Method::Bye));
/// ```
pub fn parse_message(data: &[u8]) -> Result<Message> {
    // Leading CRLFs are keep-alives, skip them
    let start = data
        .iter()
        .position(|b| *b != b'\r' && *b != b'\n')
        .ok_or_else(|| Error::InvalidFormat("empty message".to_string()))?;
    let (head, raw_body) = split_head_body(&data[start..])?;

    let mut lines = head.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));
    let first = lines
        .next()
        .ok_or_else(|| Error::InvalidFormat("missing start line".to_string()))?;

    if first.starts_with("SIP/") {
        let (_, (code, reason)) = status_line(first)
            .map_err(|_| Error::InvalidFormat(format!("malformed status line '{}'", first)))?;
        let status = code.parse::<StatusCode>()?;
        let headers = parse_headers(lines)?;
        let body = extract_body(&headers, raw_body)?;
        let reason = if reason.is_empty() {
            status.reason_phrase().to_string()
        } else {
            reason.to_string()
        };
        return Ok(Message::Response(Response {
            status,
            reason,
            headers,
            body,
        }));
    }

    let (remaining, (method, uri, version)) = request_line(first)
        .map_err(|_| Error::InvalidFormat(format!("malformed request line '{}'", first)))?;
    if !remaining.trim().is_empty() {
        return Err(Error::InvalidFormat(format!("malformed request line '{}'", first)));
    }
    if version != SIP_VERSION {
        return Err(Error::InvalidVersion(version.to_string()));
    }
    let method = method.parse::<Method>()?;
    let uri = uri.parse::<SipUri>()?;
    let headers = parse_headers(lines)?;
    let body = extract_body(&headers, raw_body)?;

    Ok(Message::Request(Request {
        method,
        uri,
        headers,
        body,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CSeq;

    const INVITE: &str = "INVITE sip:127.0.0.1:5061 SIP/2.0\r\n\
Via: SIP/2.0/UDP 127.0.0.1:5060\r\n\
To: <sip:127.0.0.1:5061>\r\n\
From: <sip:127.0.0.1:5060>\r\n\
Call-ID: 7a3f1c2e-0000-4000-8000-000000000001\r\n\
CSeq: 1 INVITE\r\n\
Content-Type: application/sdp\r\n\
Content-Length: 5\r\n\
\r\n\
v=0\r\n";

    #[test]
    fn test_parse_invite() {
        let msg = parse_message(INVITE.as_bytes()).unwrap();
        let Message::Request(req) = msg else {
            panic!("expected request");
        };
        assert_eq!(req.method, Method::Invite);
        assert_eq!(req.uri.port, Some(5061));
        assert_eq!(req.call_id(), Some("7a3f1c2e-0000-4000-8000-000000000001"));
        assert_eq!(req.cseq(), Some(CSeq::new(1, Method::Invite)));
        assert_eq!(req.content_type(), Some("application/sdp"));
        assert_eq!(req.body.as_ref(), b"v=0\r\n");
    }

    #[test]
    fn test_parse_response() {
        let data = b"SIP/2.0 486 Busy Here\r\nCall-ID: abc\r\nCSeq: 1 INVITE\r\nContent-Length: 0\r\n\r\n";
        let msg = parse_message(data).unwrap();
        let Message::Response(resp) = msg else {
            panic!("expected response");
        };
        assert_eq!(resp.status, StatusCode::BUSY_HERE);
        assert_eq!(resp.reason, "Busy Here");
        assert!(resp.body.is_empty());
    }

    #[test]
    fn test_parse_response_without_reason() {
        let msg = parse_message(b"SIP/2.0 200\r\n\r\n").unwrap();
        let Message::Response(resp) = msg else {
            panic!("expected response");
        };
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.reason, "OK");
    }

    #[test]
    fn test_bare_lf_and_compact_headers() {
        let data = b"ACK sip:127.0.0.1:5061 SIP/2.0\ni: abc\nl: 0\n\n";
        let msg = parse_message(data).unwrap();
        assert_eq!(msg.method(), Some(&Method::Ack));
        assert_eq!(msg.call_id(), Some("abc"));
    }

    #[test]
    fn test_folded_header() {
        let data = b"BYE sip:127.0.0.1:5061 SIP/2.0\r\nVia: SIP/2.0/UDP\r\n  127.0.0.1:5060\r\n\r\n";
        let msg = parse_message(data).unwrap();
        assert_eq!(msg.header(&HeaderName::Via), Some("SIP/2.0/UDP 127.0.0.1:5060"));
    }

    #[test]
    fn test_body_truncated_to_content_length() {
        let data = b"SIP/2.0 200 OK\r\nContent-Length: 3\r\n\r\nv=0 trailing junk";
        let msg = parse_message(data).unwrap();
        assert_eq!(msg.body().as_ref(), b"v=0");
    }

    #[test]
    fn test_short_body_is_rejected() {
        let data = b"SIP/2.0 200 OK\r\nContent-Length: 50\r\n\r\nv=0\r\n";
        assert_eq!(
            parse_message(data).unwrap_err(),
            Error::ContentLengthMismatch { declared: 50, actual: 5 }
        );
    }

    #[test]
    fn test_malformed_messages() {
        assert!(parse_message(b"").is_err());
        assert!(parse_message(b"\r\n\r\n").is_err());
        assert!(parse_message(b"hello world").is_err());
        assert!(parse_message(b"INVITE sip:127.0.0.1 SIP/3.0\r\n\r\n").is_err());
        assert!(parse_message(b"SIP/2.0 2000 OK\r\n\r\n").is_err());
        assert!(parse_message(b"SIP/2.0 OK\r\n\r\n").is_err());
        assert!(parse_message(b"BYE sip:127.0.0.1 SIP/2.0\r\nno colon here\r\n\r\n").is_err());
        assert!(parse_message(b"BYE sip:127.0.0.1 SIP/2.0\r\nContent-Length: abc\r\n\r\n").is_err());
        assert!(parse_message(&[0xff, 0xfe, 0x00, 0x01]).is_err());
    }

    #[test]
    fn test_round_trip_through_serializer() {
        let msg = parse_message(INVITE.as_bytes()).unwrap();
        let reparsed = parse_message(&msg.to_bytes()).unwrap();
        assert_eq!(msg, reparsed);
    }

    proptest::proptest! {
        #[test]
        fn test_arbitrary_bytes_never_panic(data in proptest::collection::vec(proptest::num::u8::ANY, 0..512)) {
            let _ = parse_message(&data);
        }

        #[test]
        fn test_call_id_survives_round_trip(call_id in "[A-Za-z0-9.@-]{1,40}") {
            let data = format!("BYE sip:127.0.0.1:5061 SIP/2.0\r\nCall-ID: {}\r\nCSeq: 2 BYE\r\n\r\n", call_id);
            let msg = parse_message(data.as_bytes()).unwrap();
            proptest::prop_assert_eq!(msg.call_id(), Some(call_id.as_str()));
        }
    }
}
