//! RTCP reporter lifecycle over loopback

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::time::timeout;

use udpcall_rtp_core::{
    ReceiverReportBuilder, RtcpPacket, RtcpReporter, RtcpReporterConfig, RtpStats,
    SenderReportBuilder,
};

fn localhost() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

fn slow(listen: bool) -> RtcpReporterConfig {
    RtcpReporterConfig {
        interval: Duration::from_secs(60),
        listen,
    }
}

async fn recv_rtcp(socket: &UdpSocket) -> RtcpPacket {
    let mut buf = vec![0u8; 1500];
    let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
        .await
        .expect("no RTCP packet received")
        .unwrap();
    RtcpPacket::parse(&buf[..len]).unwrap()
}

#[tokio::test]
async fn test_first_report_is_sent_immediately() {
    let peer = UdpSocket::bind(localhost()).await.unwrap();
    let stats = Arc::new(RtpStats::new());
    stats.record_sent(320, 8000);

    let socket = UdpSocket::bind(localhost()).await.unwrap();
    let handle = RtcpReporter::new(
        socket,
        peer.local_addr().unwrap(),
        SenderReportBuilder::new(0xfeed),
        Arc::clone(&stats),
        slow(false),
    )
    .spawn();

    match recv_rtcp(&peer).await {
        RtcpPacket::SenderReport(sr) => {
            assert_eq!(sr.ssrc, 0xfeed);
            assert_eq!(sr.sender_packet_count, 1);
            assert_eq!(sr.sender_octet_count, 320);
        }
        other => panic!("expected SR, got {:?}", other),
    }

    let summary = handle.stop().await;
    assert_eq!(summary.reports_sent, 1);
}

#[tokio::test]
async fn test_stop_interrupts_interval_sleep() {
    let peer = UdpSocket::bind(localhost()).await.unwrap();
    let socket = UdpSocket::bind(localhost()).await.unwrap();
    let handle = RtcpReporter::new(
        socket,
        peer.local_addr().unwrap(),
        ReceiverReportBuilder::new(1),
        Arc::new(RtpStats::new()),
        slow(true),
    )
    .spawn();

    // Reporter is now sleeping for a minute, listener blocked in recv
    recv_rtcp(&peer).await;

    let start = Instant::now();
    timeout(Duration::from_secs(1), handle.stop())
        .await
        .expect("stop did not interrupt the interval");
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_reports_at_interval() {
    let peer = UdpSocket::bind(localhost()).await.unwrap();
    let socket = UdpSocket::bind(localhost()).await.unwrap();
    let config = RtcpReporterConfig {
        interval: Duration::from_millis(50),
        listen: false,
    };
    let handle = RtcpReporter::new(
        socket,
        peer.local_addr().unwrap(),
        ReceiverReportBuilder::new(9),
        Arc::new(RtpStats::new()),
        config,
    )
    .spawn();

    for _ in 0..3 {
        assert!(matches!(recv_rtcp(&peer).await, RtcpPacket::ReceiverReport(rr) if rr.ssrc == 9));
    }
    assert!(handle.stop().await.reports_sent >= 3);
}

#[tokio::test]
async fn test_sender_and_receiver_exchange_reports() {
    let sr_socket = UdpSocket::bind(localhost()).await.unwrap();
    let rr_socket = UdpSocket::bind(localhost()).await.unwrap();
    let sr_addr = sr_socket.local_addr().unwrap();
    let rr_addr = rr_socket.local_addr().unwrap();

    let send_stats = Arc::new(RtpStats::new());
    let recv_stats = Arc::new(RtpStats::new());
    recv_stats.record_received(0x5555, 3, 480, 320);

    let sender_side = RtcpReporter::new(
        sr_socket,
        rr_addr,
        SenderReportBuilder::new(0x5555),
        send_stats,
        slow(true),
    )
    .spawn();
    let receiver_side = RtcpReporter::new(
        rr_socket,
        sr_addr,
        ReceiverReportBuilder::new(0x6666),
        recv_stats,
        slow(true),
    )
    .spawn();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let sent_summary = sender_side.stop().await;
    let recv_summary = receiver_side.stop().await;
    assert_eq!(sent_summary.reports_sent, 1);
    assert_eq!(recv_summary.reports_sent, 1);
    assert_eq!(sent_summary.reports_received, 1);
    assert_eq!(recv_summary.reports_received, 1);
}

#[tokio::test]
async fn test_send_failure_ends_only_the_reporter() {
    let socket = UdpSocket::bind(localhost()).await.unwrap();
    // An IPv4 socket cannot send to an IPv6 destination
    let unreachable: SocketAddr = "[::1]:9".parse().unwrap();
    let handle = RtcpReporter::new(
        socket,
        unreachable,
        SenderReportBuilder::new(1),
        Arc::new(RtpStats::new()),
        slow(true),
    )
    .spawn();

    let deadline = Instant::now() + Duration::from_secs(2);
    while !handle.is_finished() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(handle.is_finished());

    let summary = timeout(Duration::from_secs(1), handle.stop()).await.unwrap();
    assert_eq!(summary.reports_sent, 0);
}
