//! A call that streams one WAV file into another

use std::time::Duration;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tokio::time::timeout;

use udpcall_cli::wav::{WavSink, WavSource};
use udpcall_session_core::{CallEndpoint, EndpointConfig, Role, Teardown};

fn loopback(role: Role) -> EndpointConfig {
    let mut config = EndpointConfig::for_role(role);
    let any = "127.0.0.1:0".parse().unwrap();
    config.sip.local_addr = any;
    config.media.local_rtp_addr = any;
    config.rtcp.local_addr = any;
    config.media.pacing = false;
    config
}

#[tokio::test]
async fn test_wav_file_survives_the_call() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");

    let samples: Vec<i16> = (0..1000).map(|i| ((i * 97) % 30000 - 15000) as i16).collect();
    let spec = WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&input, spec).unwrap();
    for &s in &samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();

    let callee = CallEndpoint::bind(Role::Callee, loopback(Role::Callee)).await.unwrap();
    let callee_sip = callee.local_sip_addr();
    let mut sink = WavSink::create(&output, 8000).unwrap();
    let callee_task = tokio::spawn(async move {
        let report = callee.run_as_callee(&mut sink).await;
        (report, sink.samples_written())
    });

    let mut config = loopback(Role::Caller);
    config.sip.remote_addr = callee_sip;
    let mut source = WavSource::open(&input, config.media.frame_samples).unwrap();
    let caller = CallEndpoint::bind(Role::Caller, config).await.unwrap();
    let report = timeout(Duration::from_secs(10), caller.run_as_caller(&mut source))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.sent.unwrap().packets, 7);

    let (callee_report, written) = timeout(Duration::from_secs(10), callee_task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(callee_report.unwrap().teardown, Teardown::PeerBye);
    assert_eq!(written, 1000);

    let received: Vec<i16> = WavReader::open(&output)
        .unwrap()
        .samples::<i16>()
        .map(|s| s.unwrap())
        .collect();
    assert_eq!(received, samples);
}
