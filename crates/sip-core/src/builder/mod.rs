//! Builders for SIP requests and responses
//!
//! [`RequestBuilder`] assembles the headers of a request in a fixed order
//! (Via, Max-Forwards, To, From, Call-ID, CSeq, Contact, Content-Type), and
//! [`ResponseBuilder::for_request`] copies the dialog-identifying headers of
//! the request being answered so the response always matches its request.
//!
//! `Content-Length` is never set by hand: it is written at serialization
//! time from the body actually attached.
//!
//! ```rust
//! use udpcall_sip_core::prelude::*;
//!
//! let invite = RequestBuilder::new(Method::Invite, "sip:127.0.0.1:5061".parse().unwrap())
//!     .via("127.0.0.1:5060".parse().unwrap(), &generate_branch())
//!     .from("sip:127.0.0.1:5060".parse().unwrap(), Some("a73kszlfl"))
//!     .to("sip:127.0.0.1:5061".parse().unwrap(), None)
//!     .call_id("3848276298220188511@127.0.0.1")
//!     .cseq(1)
//!     .build();
//!
//! let ok = ResponseBuilder::for_request(StatusCode::OK, &invite)
//!     .to_tag("314159")
//!     .build();
//!
//! assert_eq!(ok.call_id(), invite.call_id());
//! assert_eq!(ok.cseq(), invite.cseq());
//! assert_eq!(ok.to_tag(), Some("314159"));
//! ```

use std::net::SocketAddr;

use bytes::Bytes;
use uuid::Uuid;

use crate::types::{CSeq, Header, HeaderName, Method, Request, Response, SipUri, StatusCode};

/// Magic cookie every RFC 3261 branch starts with
pub const BRANCH_MAGIC_COOKIE: &str = "z9hG4bK";

const MAX_FORWARDS: &str = "70";

/// Generates a fresh Via branch parameter
pub fn generate_branch() -> String {
    format!("{}{}", BRANCH_MAGIC_COOKIE, Uuid::new_v4().simple())
}

/// Generates a From / To tag
pub fn generate_tag() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..10].to_string()
}

/// Generates a globally unique Call-ID
pub fn generate_call_id() -> String {
    Uuid::new_v4().to_string()
}

fn name_addr(uri: &SipUri, tag: Option<&str>) -> String {
    match tag {
        Some(tag) => format!("<{}>;tag={}", uri, tag),
        None => format!("<{}>", uri),
    }
}

/// Builder for SIP requests
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    uri: SipUri,
    via: Option<String>,
    to: Option<String>,
    from: Option<String>,
    call_id: Option<String>,
    cseq: Option<u32>,
    contact: Option<String>,
    content_type: Option<String>,
    extra: Vec<Header>,
    body: Bytes,
}

impl RequestBuilder {
    /// Starts a request for `method` targeting `uri`
    pub fn new(method: Method, uri: SipUri) -> Self {
        Self {
            method,
            uri,
            via: None,
            to: None,
            from: None,
            call_id: None,
            cseq: None,
            contact: None,
            content_type: None,
            extra: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Sets the Via header for a UDP hop from `sent_by`
    pub fn via(mut self, sent_by: SocketAddr, branch: &str) -> Self {
        self.via = Some(format!("SIP/2.0/UDP {};branch={}", sent_by, branch));
        self
    }

    pub fn from(mut self, uri: SipUri, tag: Option<&str>) -> Self {
        self.from = Some(name_addr(&uri, tag));
        self
    }

    pub fn to(mut self, uri: SipUri, tag: Option<&str>) -> Self {
        self.to = Some(name_addr(&uri, tag));
        self
    }

    pub fn call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    /// Sets the CSeq number; the method is always the request's own
    pub fn cseq(mut self, seq: u32) -> Self {
        self.cseq = Some(seq);
        self
    }

    pub fn contact(mut self, uri: SipUri) -> Self {
        self.contact = Some(format!("<{}>", uri));
        self
    }

    /// Appends an arbitrary header after the standard ones
    pub fn header(mut self, header: Header) -> Self {
        self.extra.push(header);
        self
    }

    /// Attaches a body together with its Content-Type
    pub fn body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.content_type = Some(content_type.to_string());
        self.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        let mut headers = Vec::with_capacity(8 + self.extra.len());
        if let Some(via) = self.via {
            headers.push(Header::new(HeaderName::Via, via));
        }
        headers.push(Header::new(HeaderName::MaxForwards, MAX_FORWARDS));
        if let Some(to) = self.to {
            headers.push(Header::new(HeaderName::To, to));
        }
        if let Some(from) = self.from {
            headers.push(Header::new(HeaderName::From, from));
        }
        if let Some(call_id) = self.call_id {
            headers.push(Header::new(HeaderName::CallId, call_id));
        }
        if let Some(seq) = self.cseq {
            headers.push(Header::new(
                HeaderName::CSeq,
                CSeq::new(seq, self.method.clone()).to_string(),
            ));
        }
        if let Some(contact) = self.contact {
            headers.push(Header::new(HeaderName::Contact, contact));
        }
        if let Some(content_type) = self.content_type {
            headers.push(Header::new(HeaderName::ContentType, content_type));
        }
        headers.extend(self.extra);

        Request {
            method: self.method,
            uri: self.uri,
            headers,
            body: self.body,
        }
    }
}

/// Builder for SIP responses
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    /// Starts an empty response with the standard reason phrase
    pub fn new(status: StatusCode) -> Self {
        Self {
            response: Response::new(status),
        }
    }

    /// Starts a response to `request`
    ///
    /// Via, From, To, Call-ID and CSeq are copied verbatim from the request,
    /// so the response carries the request's CSeq number and method.
    pub fn for_request(status: StatusCode, request: &Request) -> Self {
        let mut response = Response::new(status);
        response.headers = request
            .headers
            .iter()
            .filter(|h| {
                matches!(
                    h.name,
                    HeaderName::Via
                        | HeaderName::From
                        | HeaderName::To
                        | HeaderName::CallId
                        | HeaderName::CSeq
                )
            })
            .cloned()
            .collect();
        Self { response }
    }

    /// Adds a tag to the To header unless it already carries one
    pub fn to_tag(mut self, tag: &str) -> Self {
        if let Some(to) = self
            .response
            .headers
            .iter_mut()
            .find(|h| h.name == HeaderName::To)
        {
            if crate::types::tag_param(&to.value).is_none() {
                to.value.push_str(";tag=");
                to.value.push_str(tag);
            }
        }
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.response.reason = reason.into();
        self
    }

    pub fn header(mut self, header: Header) -> Self {
        self.response.headers.push(header);
        self
    }

    /// Attaches a body together with its Content-Type
    pub fn body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.response
            .headers
            .retain(|h| h.name != HeaderName::ContentType);
        self.response
            .headers
            .push(Header::new(HeaderName::ContentType, content_type));
        self.response.body = body.into();
        self
    }

    pub fn build(self) -> Response {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_message;
    use crate::SDP_CONTENT_TYPE;

    fn invite() -> Request {
        RequestBuilder::new(Method::Invite, "sip:127.0.0.1:5061".parse().unwrap())
            .via("127.0.0.1:5060".parse().unwrap(), "z9hG4bK776asdhds")
            .from("sip:127.0.0.1:5060".parse().unwrap(), Some("1928301774"))
            .to("sip:127.0.0.1:5061".parse().unwrap(), None)
            .call_id("a84b4c76e66710@127.0.0.1")
            .cseq(1)
            .body(SDP_CONTENT_TYPE, "v=0\r\n")
            .build()
    }

    #[test]
    fn test_request_header_order() {
        let text = String::from_utf8(invite().to_bytes().to_vec()).unwrap();
        let expected = "INVITE sip:127.0.0.1:5061 SIP/2.0\r\n\
Via: SIP/2.0/UDP 127.0.0.1:5060;branch=z9hG4bK776asdhds\r\n\
Max-Forwards: 70\r\n\
To: <sip:127.0.0.1:5061>\r\n\
From: <sip:127.0.0.1:5060>;tag=1928301774\r\n\
Call-ID: a84b4c76e66710@127.0.0.1\r\n\
CSeq: 1 INVITE\r\n\
Content-Type: application/sdp\r\n\
Content-Length: 5\r\n\
\r\n\
v=0\r\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_response_echoes_request() {
        let request = invite();
        let response = ResponseBuilder::for_request(StatusCode::OK, &request)
            .to_tag("a6c85cf")
            .body(SDP_CONTENT_TYPE, "v=0\r\n")
            .build();

        assert_eq!(response.call_id(), Some("a84b4c76e66710@127.0.0.1"));
        assert_eq!(response.cseq(), Some(CSeq::new(1, Method::Invite)));
        assert_eq!(response.from_tag(), Some("1928301774"));
        assert_eq!(response.to_tag(), Some("a6c85cf"));
        assert_eq!(
            response.header(&HeaderName::Via),
            request.header(&HeaderName::Via)
        );

        let parsed = parse_message(&response.to_bytes()).unwrap();
        assert_eq!(parsed.status(), Some(StatusCode::OK));
        assert_eq!(parsed.body().as_ref(), b"v=0\r\n");
    }

    #[test]
    fn test_existing_to_tag_is_kept() {
        let request = RequestBuilder::new(Method::Bye, "sip:127.0.0.1:5060".parse().unwrap())
            .to("sip:127.0.0.1:5060".parse().unwrap(), Some("first"))
            .cseq(2)
            .build();
        let response = ResponseBuilder::for_request(StatusCode::OK, &request)
            .to_tag("second")
            .build();
        assert_eq!(response.to_tag(), Some("first"));
    }

    #[test]
    fn test_generated_identifiers() {
        let branch = generate_branch();
        assert!(branch.starts_with(BRANCH_MAGIC_COOKIE));
        assert_ne!(branch, generate_branch());
        assert_eq!(generate_tag().len(), 10);
        assert_ne!(generate_call_id(), generate_call_id());
    }
}
