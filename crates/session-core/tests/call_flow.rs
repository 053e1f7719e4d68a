//! End-to-end calls between two endpoints over loopback

use std::time::Duration;

use bytes::Bytes;
use tokio::time::timeout;

use udpcall_rtp_core::{AudioSource, MemorySink, PcmFrameSource, StreamEnd};
use udpcall_session_core::{CallEndpoint, EndpointConfig, Role, SessionError, Teardown};

const GUARD: Duration = Duration::from_secs(10);

fn loopback(role: Role) -> EndpointConfig {
    let mut config = EndpointConfig::for_role(role);
    let any = "127.0.0.1:0".parse().unwrap();
    config.sip.local_addr = any;
    config.media.local_rtp_addr = any;
    config.rtcp.local_addr = any;
    config.sip.timeout_ms = 2_000;
    config.rtcp.interval_ms = 1_000;
    config
}

async fn callee(config: EndpointConfig) -> (std::net::SocketAddr, tokio::task::JoinHandle<(
    udpcall_session_core::Result<udpcall_session_core::CallReport>,
    MemorySink,
)>) {
    let endpoint = CallEndpoint::bind(Role::Callee, config).await.unwrap();
    let sip_addr = endpoint.local_sip_addr();
    let task = tokio::spawn(async move {
        let mut sink = MemorySink::new();
        let report = endpoint.run_as_callee(&mut sink).await;
        (report, sink)
    });
    (sip_addr, task)
}

#[tokio::test]
async fn test_full_call_delivers_every_frame() {
    let (callee_sip, callee_task) = callee(loopback(Role::Callee)).await;

    let mut config = loopback(Role::Caller);
    config.sip.remote_addr = callee_sip;
    let pcm: Vec<u8> = (0..320 * 20).map(|i| (i % 253) as u8).collect();
    let mut source = PcmFrameSource::new(pcm.clone(), config.frame_bytes());

    let caller = CallEndpoint::bind(Role::Caller, config).await.unwrap();
    let caller_report = timeout(GUARD, caller.run_as_caller(&mut source))
        .await
        .unwrap()
        .unwrap();
    let (callee_report, sink) = timeout(GUARD, callee_task).await.unwrap().unwrap();
    let callee_report = callee_report.unwrap();

    assert_eq!(caller_report.call_id, callee_report.call_id);
    assert_eq!(caller_report.sent.unwrap().packets, 20);
    let received = callee_report.received.unwrap();
    assert_eq!(received.packets, 20);
    assert_eq!(received.end, StreamEnd::EndOfStream);
    assert_eq!(sink.pcm(), pcm);
    assert!(sink.finished);

    // Paced at 20 ms per frame, so both first reports cross during the call
    assert!(caller_report.rtcp.reports_sent >= 1);
    assert!(callee_report.rtcp.reports_sent >= 1);
    assert!(caller_report.rtcp.reports_received >= 1);
    assert!(callee_report.rtcp.reports_received >= 1);

    assert_eq!(caller_report.teardown, Teardown::PeerBye);
    assert_eq!(callee_report.teardown, Teardown::PeerBye);
}

#[tokio::test]
async fn test_unanswered_call_times_out() {
    let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let mut config = loopback(Role::Caller);
    config.sip.remote_addr = silent.local_addr().unwrap();
    config.sip.timeout_ms = 200;
    let mut source = PcmFrameSource::new(vec![0u8; 320], 320);

    let caller = CallEndpoint::bind(Role::Caller, config).await.unwrap();
    let err = timeout(GUARD, caller.run_as_caller(&mut source))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, SessionError::Timeout(_)));
    assert_eq!(source.remaining_frames(), 1);
}

/// Fails after a fixed number of frames
struct FailingSource {
    frames_left: usize,
}

impl AudioSource for FailingSource {
    fn next_frame(&mut self) -> udpcall_rtp_core::Result<Option<Bytes>> {
        if self.frames_left == 0 {
            return Err(udpcall_rtp_core::Error::Source("device unplugged".into()));
        }
        self.frames_left -= 1;
        Ok(Some(Bytes::from(vec![1u8; 320])))
    }
}

#[tokio::test]
async fn test_media_failure_still_tears_down() {
    // Default 30 s idle timeout: only the end-of-stream marker can end the callee's stream
    let callee_config = loopback(Role::Callee);
    assert_eq!(callee_config.idle_timeout(), Some(Duration::from_secs(30)));
    let (callee_sip, callee_task) = callee(callee_config).await;

    let mut config = loopback(Role::Caller);
    config.sip.remote_addr = callee_sip;
    let mut source = FailingSource { frames_left: 2 };

    let caller = CallEndpoint::bind(Role::Caller, config).await.unwrap();
    let started = std::time::Instant::now();
    let err = timeout(GUARD, caller.run_as_caller(&mut source))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, SessionError::Media(udpcall_rtp_core::Error::Source(_))));
    // The peer's BYE arrived; the 2 s BYE wait did not run out
    assert!(started.elapsed() < Duration::from_millis(1_500));

    let (callee_report, sink) = timeout(Duration::from_secs(3), callee_task)
        .await
        .unwrap()
        .unwrap();
    let callee_report = callee_report.unwrap();
    let received = callee_report.received.unwrap();
    assert_eq!(received.packets, 2);
    assert_eq!(received.end, StreamEnd::EndOfStream);
    assert_eq!(sink.payloads.len(), 2);
    assert!(sink.finished);
    assert_eq!(callee_report.teardown, Teardown::PeerBye);
}
