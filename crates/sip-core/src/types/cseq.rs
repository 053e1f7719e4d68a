use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::Method;

/// CSeq header value: command sequence number plus request method
///
/// Responses echo the CSeq of the request they answer, so the method is
/// always a request method (`1 INVITE`, never `1 200 OK`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSeq {
    pub seq: u32,
    pub method: Method,
}

impl CSeq {
    pub fn new(seq: u32, method: Method) -> Self {
        Self { seq, method }
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}

impl FromStr for CSeq {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let seq = parts
            .next()
            .and_then(|seq| seq.parse::<u32>().ok())
            .ok_or_else(|| Error::InvalidHeader(format!("invalid CSeq '{}'", s)))?;
        let method = parts
            .next()
            .ok_or_else(|| Error::InvalidHeader(format!("CSeq without method '{}'", s)))?
            .parse::<Method>()?;
        if parts.next().is_some() {
            return Err(Error::InvalidHeader(format!("trailing data in CSeq '{}'", s)));
        }
        Ok(CSeq { seq, method })
    }
}
