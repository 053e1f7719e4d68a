//! Command-line front end for udpcall
//!
//! `udpcall call <file.wav>` places a call and streams the file;
//! `udpcall answer <file.wav>` waits for one call and records it.

pub mod cli;
pub mod logging;
pub mod wav;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use udpcall_session_core::{CallEndpoint, CallReport, EndpointConfig, Role};

use crate::cli::{Cli, Command, Overrides};
use crate::logging::{parse_log_level, setup_logging, LoggingConfig};
use crate::wav::{WavSink, WavSource};

/// Loads the file if given, else the role's defaults, then applies flags
pub fn load_config(path: Option<&Path>, role: Role, overrides: &Overrides) -> Result<EndpointConfig> {
    let mut config = match path {
        Some(path) => EndpointConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => EndpointConfig::for_role(role),
    };
    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

pub fn init_logging(cli: &Cli) -> Result<()> {
    let mut config = LoggingConfig::new(parse_log_level(&cli.log_level)?);
    if cli.json {
        config = config.with_json();
    }
    setup_logging(config)
}

pub async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Call { input, overrides } => {
            let config = load_config(cli.config.as_deref(), Role::Caller, overrides)?;
            let mut source = WavSource::open(input, config.media.frame_samples)?;

            let endpoint = CallEndpoint::bind(Role::Caller, config)
                .await
                .context("binding caller sockets")?;
            let report = endpoint
                .run_as_caller(&mut source)
                .await
                .context("call failed")?;
            log_report(&report);
        }
        Command::Answer { output, overrides } => {
            let config = load_config(cli.config.as_deref(), Role::Callee, overrides)?;
            let mut sink = WavSink::create(output, config.media.clock_rate)?;

            let endpoint = CallEndpoint::bind(Role::Callee, config)
                .await
                .context("binding callee sockets")?;
            tokio::select! {
                report = endpoint.run_as_callee(&mut sink) => {
                    log_report(&report.context("call failed")?);
                }
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted, abandoning the call");
                }
            }
        }
        Command::DefaultConfig { role } => {
            let config = EndpointConfig::for_role((*role).into());
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}

fn log_report(report: &CallReport) {
    info!("Call {} finished ({:?})", report.call_id, report.teardown);
    if let Some(sent) = report.sent {
        info!("Sent {} RTP packets, {} bytes", sent.packets, sent.bytes);
    }
    if let Some(received) = report.received {
        info!(
            "Received {} RTP packets, {} bytes ({:?})",
            received.packets, received.bytes, received.end
        );
    }
    info!(
        "RTCP: {} reports sent, {} received",
        report.rtcp.reports_sent, report.rtcp.reports_received
    );
}
