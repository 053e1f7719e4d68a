//! Call control for the udpcall stack
//!
//! This crate ties the SIP and media layers together into a two-party
//! call:
//!
//! - `session`: the role-parameterized SIP state machine (offer/answer,
//!   BYE/BYE teardown)
//! - `call`: orchestration of one side of a call, from binding sockets to
//!   teardown
//! - `config`: endpoint configuration with TOML loading
//!
//! ## Example
//!
//! ```rust,no_run
//! use udpcall_rtp_core::PcmFrameSource;
//! use udpcall_session_core::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let config = EndpointConfig::for_role(Role::Caller);
//! let mut source = PcmFrameSource::new(vec![0u8; 3200], config.frame_bytes());
//!
//! let endpoint = CallEndpoint::bind(Role::Caller, config).await?;
//! let report = endpoint.run_as_caller(&mut source).await?;
//! println!("sent {:?}, teardown {:?}", report.sent, report.teardown);
//! # Ok(())
//! # }
//! ```

pub mod call;
pub mod config;
pub mod error;
pub mod session;

pub use call::{CallEndpoint, CallReport};
pub use config::{EndpointConfig, MediaConfig, RtcpConfig, SipConfig};
pub use error::{Result, SessionError};
pub use session::{
    CallSession, CallState, NegotiatedMedia, Role, SessionParams, SipSession, Teardown,
};

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::{
        CallEndpoint, CallReport, CallState, EndpointConfig, NegotiatedMedia, Result, Role,
        SessionError, SipSession, Teardown,
    };
}
