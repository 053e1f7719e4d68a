//! SIP protocol types
//!
//! Typed representations of the pieces that make up a SIP message: the
//! request method, the response status code, the `sip:` URI, headers and
//! the request / response containers themselves.

pub mod cseq;
pub mod header;
pub mod message;
pub mod method;
pub mod status;
pub mod uri;

pub use cseq::CSeq;
pub use header::{tag_param, Header, HeaderName};
pub use message::{Message, Request, Response};
pub use method::Method;
pub use status::StatusCode;
pub use uri::SipUri;
