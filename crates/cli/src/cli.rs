//! Command-line interface definition

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use udpcall_session_core::{EndpointConfig, Role};

#[derive(Parser, Debug)]
#[command(name = "udpcall")]
#[command(about = "Two-party voice calls over UDP with SIP, RTP and RTCP")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file; flags override its values
    #[arg(short, long, global = true, env = "UDPCALL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, used when RUST_LOG is not set
    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Call the peer and stream a WAV file to it
    Call {
        /// 16-bit mono WAV file to send
        input: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Wait for one call and record the received audio
    Answer {
        /// WAV file to write
        output: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print the default configuration for a role as TOML
    DefaultConfig {
        #[arg(value_enum, default_value = "caller")]
        role: RoleArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Caller,
    Callee,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Caller => Role::Caller,
            RoleArg::Callee => Role::Callee,
        }
    }
}

/// Flags that override configuration values
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Local SIP address
    #[arg(long)]
    pub local_sip: Option<SocketAddr>,

    /// Peer SIP address
    #[arg(long)]
    pub remote_sip: Option<SocketAddr>,

    /// Local RTP address
    #[arg(long)]
    pub local_rtp: Option<SocketAddr>,

    /// Local RTCP address
    #[arg(long)]
    pub local_rtcp: Option<SocketAddr>,

    /// Peer RTCP address, instead of the one advertised in SDP
    #[arg(long)]
    pub remote_rtcp: Option<SocketAddr>,

    /// SIP response / ACK / BYE timeout in milliseconds
    #[arg(long)]
    pub sip_timeout_ms: Option<u64>,

    /// RTCP report interval in milliseconds
    #[arg(long)]
    pub rtcp_interval_ms: Option<u64>,

    /// Samples per RTP packet
    #[arg(long)]
    pub frame_samples: Option<usize>,

    /// Send frames as fast as possible instead of in real time
    #[arg(long)]
    pub no_pacing: bool,

    /// Do not log incoming RTCP reports
    #[arg(long)]
    pub no_rtcp_listen: bool,

    /// Stop receiving after this many idle milliseconds (0 waits forever)
    #[arg(long)]
    pub idle_timeout_ms: Option<u64>,
}

impl Overrides {
    pub fn apply(&self, config: &mut EndpointConfig) {
        if let Some(addr) = self.local_sip {
            config.sip.local_addr = addr;
        }
        if let Some(addr) = self.remote_sip {
            config.sip.remote_addr = addr;
        }
        if let Some(addr) = self.local_rtp {
            config.media.local_rtp_addr = addr;
        }
        if let Some(addr) = self.local_rtcp {
            config.rtcp.local_addr = addr;
        }
        if self.remote_rtcp.is_some() {
            config.rtcp.remote_addr = self.remote_rtcp;
        }
        if let Some(ms) = self.sip_timeout_ms {
            config.sip.timeout_ms = ms;
        }
        if let Some(ms) = self.rtcp_interval_ms {
            config.rtcp.interval_ms = ms;
        }
        if let Some(samples) = self.frame_samples {
            config.media.frame_samples = samples;
        }
        if self.no_pacing {
            config.media.pacing = false;
        }
        if self.no_rtcp_listen {
            config.rtcp.listen = false;
        }
        if let Some(ms) = self.idle_timeout_ms {
            config.media.idle_timeout_ms = ms;
        }
    }
}
