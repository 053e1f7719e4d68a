//! SIP and SDP wire codec for the udpcall stack
//!
//! This crate turns the text messages exchanged during call setup and
//! teardown into typed values and back. It holds no state and performs no
//! I/O; the transport and session crates build on top of it.
//!
//! The library is organized into several modules:
//!
//! - `types`: methods, status codes, URIs, headers and the message types
//! - `parser`: parsing of raw datagrams into [`Message`] values
//! - `builder`: builders for requests and responses with exact `Content-Length`
//! - `sdp`: the Session Description Protocol body carried by INVITE / 200 OK
//!
//! ## Example
//!
//! ```rust
//! use udpcall_sip_core::prelude::*;
//!
//! let uri: SipUri = "sip:127.0.0.1:5061".parse().unwrap();
//! let request = RequestBuilder::new(Method::Bye, uri)
//!     .call_id("a84b4c76e66710")
//!     .cseq(2)
//!     .build();
//!
//! let bytes = request.to_bytes();
//! let parsed = parse_message(&bytes).unwrap();
//! assert_eq!(parsed.call_id(), Some("a84b4c76e66710"));
//! ```

mod error;

pub mod builder;
pub mod parser;
pub mod sdp;
pub mod types;

pub use error::{Error, Result};

pub use builder::{generate_branch, generate_call_id, generate_tag, RequestBuilder, ResponseBuilder};
pub use parser::parse_message;
pub use sdp::SessionDescription;
pub use types::{CSeq, Header, HeaderName, Message, Method, Request, Response, SipUri, StatusCode};

/// SIP protocol version string used on every start line
pub const SIP_VERSION: &str = "SIP/2.0";

/// MIME type of SDP bodies
pub const SDP_CONTENT_TYPE: &str = "application/sdp";

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::{
        generate_branch, generate_call_id, generate_tag, parse_message, CSeq, Error, Header,
        HeaderName, Message, Method, Request, RequestBuilder, Response, ResponseBuilder, Result,
        SessionDescription, SipUri, StatusCode, SDP_CONTENT_TYPE, SIP_VERSION,
    };
}
