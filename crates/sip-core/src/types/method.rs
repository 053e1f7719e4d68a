//! # SIP Methods
//!
//! Request methods as defined in [RFC 3261 Section 7.1](https://datatracker.ietf.org/doc/html/rfc3261#section-7.1).
//! Only the methods used by a two-party call get their own variant; anything
//! else round-trips through [`Method::Extension`].
//!
//! Method names are case-sensitive tokens.
//!
//! ```rust
//! use udpcall_sip_core::types::Method;
//! use std::str::FromStr;
//!
//! assert_eq!(Method::from_str("INVITE").unwrap(), Method::Invite);
//! assert_eq!(Method::Bye.to_string(), "BYE");
//! assert!(Method::from_str("").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::parser::is_token_char;

/// SIP request method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// INVITE: initiates a session and carries the SDP offer
    Invite,
    /// ACK: confirms the final response to an INVITE
    Ack,
    /// BYE: terminates a session
    Bye,
    /// CANCEL: cancels a pending INVITE
    Cancel,
    /// OPTIONS: capability query
    Options,
    /// Any other method token
    Extension(String),
}

impl Method {
    /// Returns the wire representation of the method
    pub fn as_str(&self) -> &str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Options => "OPTIONS",
            Method::Extension(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "INVITE" => Ok(Method::Invite),
            "ACK" => Ok(Method::Ack),
            "BYE" => Ok(Method::Bye),
            "CANCEL" => Ok(Method::Cancel),
            "OPTIONS" => Ok(Method::Options),
            _ if !s.is_empty() && s.chars().all(is_token_char) => {
                Ok(Method::Extension(s.to_string()))
            }
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_methods() {
        for (text, method) in [
            ("INVITE", Method::Invite),
            ("ACK", Method::Ack),
            ("BYE", Method::Bye),
            ("CANCEL", Method::Cancel),
            ("OPTIONS", Method::Options),
        ] {
            assert_eq!(Method::from_str(text).unwrap(), method);
            assert_eq!(method.to_string(), text);
        }
    }

    #[test]
    fn test_extension_method() {
        let method = Method::from_str("INFO").unwrap();
        assert_eq!(method, Method::Extension("INFO".to_string()));
        assert_eq!(method.as_str(), "INFO");
    }

    #[test]
    fn test_methods_are_case_sensitive() {
        // "invite" is a valid token but not the INVITE method
        assert_eq!(
            Method::from_str("invite").unwrap(),
            Method::Extension("invite".to_string())
        );
    }

    #[test]
    fn test_invalid_method() {
        assert!(Method::from_str("").is_err());
        assert!(Method::from_str("IN VITE").is_err());
        assert!(Method::from_str("BYE:").is_err());
    }
}
