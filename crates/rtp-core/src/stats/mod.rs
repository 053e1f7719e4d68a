//! RTP Statistics Module
//!
//! [`RtpStats`] holds the counters an RTCP report is built from. The media
//! loop that owns the RTP socket is the only writer; the reporter task
//! reads a consistent-enough [`StatsSnapshot`] through a shared `Arc`.
//! All fields are atomics so neither side ever blocks the other.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crate::{RtpSequenceNumber, RtpSsrc, RtpTimestamp};

/// Point-in-time copy of [`RtpStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// RTP packets sent or received
    pub packets: u64,

    /// Payload octets sent or received
    pub octets: u64,

    /// Extended highest sequence number received (cycles << 16 | seq)
    pub extended_highest_seq: u32,

    /// SSRC of the stream being received, once one has been seen
    pub source_ssrc: Option<RtpSsrc>,

    /// RTP timestamp of the last packet sent or received
    pub last_timestamp: RtpTimestamp,
}

/// Lock-free RTP stream counters
#[derive(Debug, Default)]
pub struct RtpStats {
    packets: AtomicU64,
    octets: AtomicU64,
    extended_highest_seq: AtomicU32,
    source_ssrc: AtomicU32,
    has_source: AtomicBool,
    last_timestamp: AtomicU32,
}

impl RtpStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one packet sent with `payload_len` payload bytes
    pub fn record_sent(&self, payload_len: usize, timestamp: RtpTimestamp) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.octets.fetch_add(payload_len as u64, Ordering::Relaxed);
        self.last_timestamp.store(timestamp, Ordering::Relaxed);
    }

    /// Records one packet received from `ssrc`
    ///
    /// The extended highest sequence number only moves forward; a packet
    /// arriving late (less than half the sequence space behind) leaves it
    /// unchanged, and a wrap past 65535 adds a cycle. A new SSRC restarts
    /// the sequence tracking.
    pub fn record_received(
        &self,
        ssrc: RtpSsrc,
        seq: RtpSequenceNumber,
        timestamp: RtpTimestamp,
        payload_len: usize,
    ) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.octets.fetch_add(payload_len as u64, Ordering::Relaxed);
        self.last_timestamp.store(timestamp, Ordering::Relaxed);

        let known_source = self.has_source.load(Ordering::Acquire)
            && self.source_ssrc.load(Ordering::Relaxed) == ssrc;
        if !known_source {
            self.source_ssrc.store(ssrc, Ordering::Relaxed);
            self.extended_highest_seq.store(seq as u32, Ordering::Relaxed);
            self.has_source.store(true, Ordering::Release);
            return;
        }

        let current = self.extended_highest_seq.load(Ordering::Relaxed);
        let delta = seq.wrapping_sub(current as u16);
        if delta != 0 && delta < 0x8000 {
            self.extended_highest_seq
                .store(current.wrapping_add(delta as u32), Ordering::Relaxed);
        }
    }

    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn octets(&self) -> u64 {
        self.octets.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let source_ssrc = self
            .has_source
            .load(Ordering::Acquire)
            .then(|| self.source_ssrc.load(Ordering::Relaxed));
        StatsSnapshot {
            packets: self.packets(),
            octets: self.octets(),
            extended_highest_seq: self.extended_highest_seq.load(Ordering::Relaxed),
            source_ssrc,
            last_timestamp: self.last_timestamp.load(Ordering::Relaxed),
        }
    }
}
