use bytes::{Buf, BufMut, BytesMut};

use crate::error::Error;
use crate::{Result, RtpSsrc};

/// Largest value of the 24-bit cumulative-lost field
pub const MAX_CUMULATIVE_LOST: u32 = 0x00FF_FFFF;

/// Reception report block carried by SR and RR packets (RFC 3550 6.4.1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcpReportBlock {
    /// SSRC identifier of the source this report is for
    pub ssrc: RtpSsrc,

    /// Fraction of packets lost since the last report, 8-bit fixed point
    pub fraction_lost: u8,

    /// Cumulative number of packets lost (24 bits on the wire)
    pub cumulative_lost: u32,

    /// Extended highest sequence number received
    pub highest_seq: u32,

    /// Interarrival jitter estimate
    pub jitter: u32,

    /// Middle 32 bits of the last SR NTP timestamp from this source
    pub last_sr: u32,

    /// Delay since last SR in units of 1/65536 s
    pub delay_since_last_sr: u32,
}

impl RtcpReportBlock {
    /// Size of a report block in bytes
    pub const SIZE: usize = 24;

    /// Block for `ssrc` with every counter at zero
    pub fn new(ssrc: RtpSsrc) -> Self {
        Self {
            ssrc,
            fraction_lost: 0,
            cumulative_lost: 0,
            highest_seq: 0,
            jitter: 0,
            last_sr: 0,
            delay_since_last_sr: 0,
        }
    }

    pub fn parse(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < Self::SIZE {
            return Err(Error::BufferTooSmall {
                required: Self::SIZE,
                available: buf.remaining(),
            });
        }

        let ssrc = buf.get_u32();
        // Fraction lost (8 bits) followed by cumulative lost (24 bits)
        let loss = buf.get_u32();

        Ok(Self {
            ssrc,
            fraction_lost: (loss >> 24) as u8,
            cumulative_lost: loss & MAX_CUMULATIVE_LOST,
            highest_seq: buf.get_u32(),
            jitter: buf.get_u32(),
            last_sr: buf.get_u32(),
            delay_since_last_sr: buf.get_u32(),
        })
    }

    pub fn serialize(&self, buf: &mut BytesMut) {
        buf.reserve(Self::SIZE);
        buf.put_u32(self.ssrc);
        let cumulative = self.cumulative_lost.min(MAX_CUMULATIVE_LOST);
        buf.put_u32((self.fraction_lost as u32) << 24 | cumulative);
        buf.put_u32(self.highest_seq);
        buf.put_u32(self.jitter);
        buf.put_u32(self.last_sr);
        buf.put_u32(self.delay_since_last_sr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout() {
        let block = RtcpReportBlock {
            ssrc: 0x01020304,
            fraction_lost: 0x40,
            cumulative_lost: 0x000a0b0c,
            highest_seq: 0x0001_0005,
            jitter: 7,
            last_sr: 8,
            delay_since_last_sr: 9,
        };
        let mut buf = BytesMut::new();
        block.serialize(&mut buf);

        assert_eq!(buf.len(), RtcpReportBlock::SIZE);
        assert_eq!(&buf[..12], &[1, 2, 3, 4, 0x40, 0x0a, 0x0b, 0x0c, 0, 1, 0, 5]);
        assert_eq!(RtcpReportBlock::parse(&mut buf.freeze()).unwrap(), block);
    }

    #[test]
    fn test_cumulative_lost_is_clamped() {
        let mut block = RtcpReportBlock::new(1);
        block.cumulative_lost = u32::MAX;
        let mut buf = BytesMut::new();
        block.serialize(&mut buf);

        let parsed = RtcpReportBlock::parse(&mut buf.freeze()).unwrap();
        assert_eq!(parsed.fraction_lost, 0);
        assert_eq!(parsed.cumulative_lost, MAX_CUMULATIVE_LOST);
    }

    #[test]
    fn test_short_buffer() {
        let data = [0u8; 23];
        assert!(matches!(
            RtcpReportBlock::parse(&mut &data[..]),
            Err(Error::BufferTooSmall { required: 24, available: 23 })
        ));
    }
}
