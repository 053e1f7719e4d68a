//! RTP sender / receiver over loopback

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use udpcall_rtp_core::media::{RtpReceiverConfig, RtpSenderConfig};
use udpcall_rtp_core::{
    AudioSource, Error, MemorySink, PcmFrameSource, RtpPacket, RtpReceiver, RtpSender, StreamEnd,
    END_OF_STREAM,
};

const GUARD: Duration = Duration::from_secs(5);

fn localhost() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

fn receiver() -> RtpReceiver {
    RtpReceiver::bind(localhost(), RtpReceiverConfig::default()).unwrap()
}

fn unpaced() -> RtpSenderConfig {
    RtpSenderConfig {
        pacing: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_three_packets_then_end_marker() {
    let mut receiver = receiver();
    let target = receiver.local_addr().unwrap();
    let peer = UdpSocket::bind(localhost()).await.unwrap();

    for (i, payload) in [&b"first"[..], b"second", b"third"].iter().enumerate() {
        let packet = RtpPacket::new_with_payload(0, 100 + i as u16, 160 * i as u32, 42, Bytes::copy_from_slice(payload));
        peer.send_to(&packet.serialize().unwrap(), target).await.unwrap();
    }
    peer.send_to(END_OF_STREAM, target).await.unwrap();

    let mut sink = MemorySink::new();
    let summary = timeout(GUARD, receiver.run(&mut sink)).await.unwrap().unwrap();

    assert_eq!(summary.end, StreamEnd::EndOfStream);
    assert_eq!(summary.packets, 3);
    assert_eq!(summary.bytes, 16);
    assert_eq!(sink.payloads, vec![
        Bytes::from_static(b"first"),
        Bytes::from_static(b"second"),
        Bytes::from_static(b"third"),
    ]);
    assert!(sink.finished);

    let stats = receiver.stats().snapshot();
    assert_eq!(stats.packets, 3);
    assert_eq!(stats.source_ssrc, Some(42));
    assert_eq!(stats.extended_highest_seq, 102);
}

#[tokio::test]
async fn test_invalid_datagram_is_skipped() {
    let mut receiver = receiver();
    let target = receiver.local_addr().unwrap();
    let peer = UdpSocket::bind(localhost()).await.unwrap();

    peer.send_to(&[0x00, 0x01, 0x02], target).await.unwrap();
    peer.send_to(&[0x40; 20], target).await.unwrap();
    let packet = RtpPacket::new_with_payload(0, 1, 0, 7, Bytes::from_static(b"audio"));
    peer.send_to(&packet.serialize().unwrap(), target).await.unwrap();
    peer.send_to(END_OF_STREAM, target).await.unwrap();

    let mut sink = MemorySink::new();
    let summary = timeout(GUARD, receiver.run(&mut sink)).await.unwrap().unwrap();
    assert_eq!(summary.packets, 1);
    assert_eq!(sink.pcm(), b"audio");
}

#[tokio::test]
async fn test_bad_padding_is_skipped() {
    let mut receiver = receiver();
    let target = receiver.local_addr().unwrap();
    let peer = UdpSocket::bind(localhost()).await.unwrap();

    let mut zero_count = RtpPacket::new_with_payload(0, 1, 0, 7, Bytes::from_static(b"ab\0"))
        .serialize()
        .unwrap()
        .to_vec();
    zero_count[0] |= 0x20;
    peer.send_to(&zero_count, target).await.unwrap();

    let mut padded = RtpPacket::new_with_payload(0, 2, 160, 7, Bytes::from_static(b"cd"))
        .serialize()
        .unwrap()
        .to_vec();
    padded[0] |= 0x20;
    padded.extend_from_slice(&[0, 2]);
    peer.send_to(&padded, target).await.unwrap();
    peer.send_to(END_OF_STREAM, target).await.unwrap();

    let mut sink = MemorySink::new();
    let summary = timeout(GUARD, receiver.run(&mut sink)).await.unwrap().unwrap();
    assert_eq!(summary.packets, 1);
    assert_eq!(sink.pcm(), b"cd");
}

#[tokio::test]
async fn test_empty_datagram_ends_stream() {
    let mut receiver = receiver();
    let target = receiver.local_addr().unwrap();
    let peer = UdpSocket::bind(localhost()).await.unwrap();
    peer.send_to(&[], target).await.unwrap();

    let mut sink = MemorySink::new();
    let summary = timeout(GUARD, receiver.run(&mut sink)).await.unwrap().unwrap();
    assert_eq!(summary.end, StreamEnd::EndOfStream);
    assert_eq!(summary.packets, 0);
    assert!(sink.finished);
}

#[tokio::test]
async fn test_idle_timeout() {
    let config = RtpReceiverConfig {
        idle_timeout: Some(Duration::from_millis(100)),
        ..Default::default()
    };
    let mut receiver = RtpReceiver::bind(localhost(), config).unwrap();

    let mut sink = MemorySink::new();
    let summary = timeout(GUARD, receiver.run(&mut sink)).await.unwrap().unwrap();
    assert_eq!(summary.end, StreamEnd::IdleTimeout);
    assert!(sink.finished);
}

#[tokio::test]
async fn test_sender_sequence_and_timestamps() {
    let capture = UdpSocket::bind(localhost()).await.unwrap();
    let socket = UdpSocket::bind(localhost()).await.unwrap();
    let mut sender = RtpSender::new(socket, capture.local_addr().unwrap(), unpaced())
        .with_ssrc(0x1234)
        .with_initial_state(65534, 1000);

    let mut source = PcmFrameSource::new(vec![7u8; 320 * 4], 320);
    let summary = timeout(GUARD, sender.run(&mut source)).await.unwrap().unwrap();
    assert_eq!(summary.packets, 4);
    assert_eq!(summary.bytes, 1280);

    let mut buf = vec![0u8; 2048];
    let mut packets = Vec::new();
    loop {
        let (len, _) = timeout(GUARD, capture.recv_from(&mut buf)).await.unwrap().unwrap();
        if &buf[..len] == END_OF_STREAM {
            break;
        }
        packets.push(RtpPacket::parse(&buf[..len]).unwrap());
    }

    let seqs: Vec<u16> = packets.iter().map(|p| p.header.sequence_number).collect();
    assert_eq!(seqs, vec![65534, 65535, 0, 1]);
    let timestamps: Vec<u32> = packets.iter().map(|p| p.header.timestamp).collect();
    assert_eq!(timestamps, vec![1000, 1160, 1320, 1480]);
    assert!(packets.iter().all(|p| p.header.ssrc == 0x1234 && p.header.payload_type == 0));
    assert!(packets.iter().all(|p| p.payload.len() == 320));

    let stats = sender.stats().snapshot();
    assert_eq!(stats.packets, 4);
    assert_eq!(stats.octets, 1280);
    assert_eq!(stats.last_timestamp, 1480);
    assert_eq!(sender.next_sequence(), 2);
}

#[tokio::test]
async fn test_sender_to_receiver() {
    let mut receiver = receiver();
    let socket = UdpSocket::bind(localhost()).await.unwrap();
    let mut sender = RtpSender::new(socket, receiver.local_addr().unwrap(), unpaced());

    let pcm: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let mut source = PcmFrameSource::new(pcm.clone(), 320);

    let recv_task = tokio::spawn(async move {
        let mut sink = MemorySink::new();
        let summary = receiver.run(&mut sink).await.unwrap();
        (summary, sink)
    });

    sender.run(&mut source).await.unwrap();
    let (summary, sink) = timeout(GUARD, recv_task).await.unwrap().unwrap();

    assert_eq!(summary.packets, 4);
    assert_eq!(summary.end, StreamEnd::EndOfStream);
    assert_eq!(sink.pcm(), pcm);
}

/// Yields `frames` frames, then fails
struct BrokenSource {
    frames: usize,
}

impl AudioSource for BrokenSource {
    fn next_frame(&mut self) -> udpcall_rtp_core::Result<Option<Bytes>> {
        if self.frames == 0 {
            return Err(Error::Source("read failed".into()));
        }
        self.frames -= 1;
        Ok(Some(Bytes::from_static(&[3u8; 320])))
    }
}

#[tokio::test]
async fn test_source_failure_still_ends_stream() {
    // Default idle timeout is 30 s; the receiver must stop on the marker
    let mut receiver = receiver();
    let socket = UdpSocket::bind(localhost()).await.unwrap();
    let mut sender = RtpSender::new(socket, receiver.local_addr().unwrap(), unpaced());

    let recv_task = tokio::spawn(async move {
        let mut sink = MemorySink::new();
        let summary = receiver.run(&mut sink).await.unwrap();
        (summary, sink)
    });

    let err = sender.run(&mut BrokenSource { frames: 2 }).await.unwrap_err();
    assert!(matches!(err, Error::Source(_)));

    let (summary, sink) = timeout(Duration::from_secs(2), recv_task).await.unwrap().unwrap();
    assert_eq!(summary.end, StreamEnd::EndOfStream);
    assert_eq!(summary.packets, 2);
    assert_eq!(sink.payloads.len(), 2);
}

#[tokio::test]
async fn test_paced_sender_takes_real_time() {
    let capture = UdpSocket::bind(localhost()).await.unwrap();
    let socket = UdpSocket::bind(localhost()).await.unwrap();
    let mut sender = RtpSender::new(socket, capture.local_addr().unwrap(), RtpSenderConfig::default());
    assert_eq!(sender.pacing_interval(160), Some(Duration::from_millis(20)));

    // Five 20 ms frames: at least four full intervals between first and last
    let mut source = PcmFrameSource::new(vec![0u8; 320 * 5], 320);
    let start = std::time::Instant::now();
    sender.run(&mut source).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(80));
}
