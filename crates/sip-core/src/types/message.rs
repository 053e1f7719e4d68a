//! # SIP Messages
//!
//! A SIP message is either a [`Request`] or a [`Response`]. Both consist of
//! a start line, CRLF-terminated headers, an empty line and an optional
//! body:
//!
//! ```text
//! INVITE sip:127.0.0.1:5061 SIP/2.0
//! Via: SIP/2.0/UDP 127.0.0.1:5060;branch=z9hG4bK...
//! To: <sip:127.0.0.1:5061>
//! From: <sip:127.0.0.1:5060>;tag=...
//! Call-ID: ...
//! CSeq: 1 INVITE
//! Content-Type: application/sdp
//! Content-Length: 133
//!
//! v=0
//! ...
//! ```
//!
//! Serialization always emits a `Content-Length` equal to the exact byte
//! length of the body, adding the header when the message does not carry
//! one.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::types::header::{tag_param, Header, HeaderName};
use crate::types::{CSeq, Method, SipUri, StatusCode};
use crate::SIP_VERSION;

/// SIP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub uri: SipUri,
    pub headers: Vec<Header>,
    pub body: Bytes,
}

/// SIP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub reason: String,
    pub headers: Vec<Header>,
    pub body: Bytes,
}

/// Either kind of SIP message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

fn find_header<'a>(headers: &'a [Header], name: &HeaderName) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.matches(name))
        .map(|h| h.value.as_str())
}

fn write_message(start_line: &str, headers: &[Header], body: &Bytes) -> Bytes {
    let mut buf = BytesMut::with_capacity(start_line.len() + headers.len() * 48 + body.len() + 32);
    buf.put_slice(start_line.as_bytes());
    buf.put_slice(b"\r\n");

    let mut has_length = false;
    for header in headers {
        if header.name == HeaderName::ContentLength {
            // Never trust a stored value; the body is the source of truth
            has_length = true;
            buf.put_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        } else {
            buf.put_slice(header.to_string().as_bytes());
            buf.put_slice(b"\r\n");
        }
    }
    if !has_length {
        buf.put_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    }

    buf.put_slice(b"\r\n");
    buf.put_slice(body);
    buf.freeze()
}

macro_rules! header_accessors {
    ($ty:ty) => {
        impl $ty {
            /// First value of the named header
            pub fn header(&self, name: &HeaderName) -> Option<&str> {
                find_header(&self.headers, name)
            }

            /// Call-ID header value
            pub fn call_id(&self) -> Option<&str> {
                self.header(&HeaderName::CallId)
            }

            /// Parsed CSeq header, `None` if absent or malformed
            pub fn cseq(&self) -> Option<CSeq> {
                self.header(&HeaderName::CSeq)?.parse().ok()
            }

            /// Content-Type header value
            pub fn content_type(&self) -> Option<&str> {
                self.header(&HeaderName::ContentType)
            }

            /// Tag parameter of the From header
            pub fn from_tag(&self) -> Option<&str> {
                tag_param(self.header(&HeaderName::From)?)
            }

            /// Tag parameter of the To header
            pub fn to_tag(&self) -> Option<&str> {
                tag_param(self.header(&HeaderName::To)?)
            }

            /// Body decoded as UTF-8, `None` for an empty or binary body
            pub fn body_str(&self) -> Option<&str> {
                if self.body.is_empty() {
                    return None;
                }
                std::str::from_utf8(&self.body).ok()
            }
        }
    };
}

header_accessors!(Request);
header_accessors!(Response);

impl Request {
    /// Creates a request with no headers and an empty body
    pub fn new(method: Method, uri: SipUri) -> Self {
        Self {
            method,
            uri,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Request-line without the trailing CRLF
    pub fn start_line(&self) -> String {
        format!("{} {} {}", self.method, self.uri, SIP_VERSION)
    }

    /// Serializes the request to wire format
    pub fn to_bytes(&self) -> Bytes {
        write_message(&self.start_line(), &self.headers, &self.body)
    }
}

impl Response {
    /// Creates a response with the standard reason phrase
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: status.reason_phrase().to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Status-line without the trailing CRLF
    pub fn start_line(&self) -> String {
        format!("{} {} {}", SIP_VERSION, self.status.as_u16(), self.reason)
    }

    /// Serializes the response to wire format
    pub fn to_bytes(&self) -> Bytes {
        write_message(&self.start_line(), &self.headers, &self.body)
    }
}

impl Message {
    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Message::Response(_))
    }

    /// Method for requests, `None` for responses
    pub fn method(&self) -> Option<&Method> {
        match self {
            Message::Request(req) => Some(&req.method),
            Message::Response(_) => None,
        }
    }

    /// Status code for responses, `None` for requests
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Message::Request(_) => None,
            Message::Response(resp) => Some(resp.status),
        }
    }

    pub fn headers(&self) -> &[Header] {
        match self {
            Message::Request(req) => &req.headers,
            Message::Response(resp) => &resp.headers,
        }
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        find_header(self.headers(), name)
    }

    pub fn call_id(&self) -> Option<&str> {
        self.header(&HeaderName::CallId)
    }

    pub fn cseq(&self) -> Option<CSeq> {
        self.header(&HeaderName::CSeq)?.parse().ok()
    }

    pub fn body(&self) -> &Bytes {
        match self {
            Message::Request(req) => &req.body,
            Message::Response(resp) => &resp.body,
        }
    }

    /// Start line, used in log output
    pub fn start_line(&self) -> String {
        match self {
            Message::Request(req) => req.start_line(),
            Message::Response(resp) => resp.start_line(),
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        match self {
            Message::Request(req) => req.to_bytes(),
            Message::Response(resp) => resp.to_bytes(),
        }
    }
}

impl From<Request> for Message {
    fn from(req: Request) -> Self {
        Message::Request(req)
    }
}

impl From<Response> for Message {
    fn from(resp: Response) -> Self {
        Message::Response(resp)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_adds_content_length() {
        let mut req = Request::new(Method::Ack, "sip:127.0.0.1:5061".parse().unwrap());
        req.headers.push(Header::new(HeaderName::CallId, "abc"));

        let text = String::from_utf8(req.to_bytes().to_vec()).unwrap();
        assert_eq!(
            text,
            "ACK sip:127.0.0.1:5061 SIP/2.0\r\nCall-ID: abc\r\nContent-Length: 0\r\n\r\n"
        );
    }

    #[test]
    fn test_stale_content_length_is_rewritten() {
        let mut resp = Response::new(StatusCode::OK);
        resp.headers.push(Header::new(HeaderName::ContentLength, "999"));
        resp.body = Bytes::from_static(b"v=0\r\n");

        let text = String::from_utf8(resp.to_bytes().to_vec()).unwrap();
        assert!(text.starts_with("SIP/2.0 200 OK\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(!text.contains("999"));
        assert!(text.ends_with("\r\n\r\nv=0\r\n"));
    }

    #[test]
    fn test_accessors() {
        let mut req = Request::new(Method::Invite, "sip:127.0.0.1:5061".parse().unwrap());
        req.headers.push(Header::new(HeaderName::From, "<sip:127.0.0.1:5060>;tag=1928301774"));
        req.headers.push(Header::new(HeaderName::To, "<sip:127.0.0.1:5061>"));
        req.headers.push(Header::new(HeaderName::CSeq, "1 INVITE"));

        assert_eq!(req.from_tag(), Some("1928301774"));
        assert_eq!(req.to_tag(), None);
        assert_eq!(req.cseq(), Some(CSeq::new(1, Method::Invite)));
        assert_eq!(req.body_str(), None);

        let msg = Message::from(req);
        assert!(msg.is_request());
        assert_eq!(msg.method(), Some(&Method::Invite));
        assert_eq!(msg.status(), None);
    }
}
