use bytes::{Buf, BufMut, BytesMut};

use super::ntp::NtpTimestamp;
use super::report_block::RtcpReportBlock;
use crate::error::Error;
use crate::{Result, RtpSsrc};

/// Size of the SSRC plus sender info section
const SENDER_INFO_SIZE: usize = 24;

/// RTCP Sender Report (SR) packet body
///
/// Six 32-bit big-endian words. The counters follow the NTP timestamp
/// directly and the last word is reserved (sent as zero, ignored on parse),
/// so there is no RTP timestamp word as in RFC 3550 Section 6.4.1.
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         SSRC of sender                        |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// |              NTP timestamp, most significant word             |
/// |             NTP timestamp, least significant word             |
/// |                     sender's packet count                     |
/// |                      sender's octet count                     |
/// |                            reserved                           |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcpSenderReport {
    /// SSRC of the sender
    pub ssrc: RtpSsrc,

    /// Wall-clock time the report was generated
    pub ntp_timestamp: NtpTimestamp,

    /// Packets sent since the start of transmission
    pub sender_packet_count: u32,

    /// Payload octets sent since the start of transmission
    pub sender_octet_count: u32,

    /// Reception reports for sources this sender also receives
    pub report_blocks: Vec<RtcpReportBlock>,
}

impl RtcpSenderReport {
    pub fn new(
        ssrc: RtpSsrc,
        ntp_timestamp: NtpTimestamp,
        sender_packet_count: u32,
        sender_octet_count: u32,
    ) -> Self {
        Self {
            ssrc,
            ntp_timestamp,
            sender_packet_count,
            sender_octet_count,
            report_blocks: Vec::new(),
        }
    }

    /// Body size in bytes, common header excluded
    pub fn size(&self) -> usize {
        SENDER_INFO_SIZE + self.report_blocks.len() * RtcpReportBlock::SIZE
    }

    /// Serialize the body (without the common header)
    pub fn serialize(&self) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(self.size());
        buf.put_u32(self.ssrc);
        buf.put_u32(self.ntp_timestamp.seconds);
        buf.put_u32(self.ntp_timestamp.fraction);
        buf.put_u32(self.sender_packet_count);
        buf.put_u32(self.sender_octet_count);
        buf.put_u32(0);
        for block in &self.report_blocks {
            block.serialize(&mut buf);
        }
        Ok(buf)
    }

    /// Parse a body carrying `report_count` blocks
    pub fn parse(buf: &mut impl Buf, report_count: u8) -> Result<Self> {
        if buf.remaining() < SENDER_INFO_SIZE {
            return Err(Error::BufferTooSmall {
                required: SENDER_INFO_SIZE,
                available: buf.remaining(),
            });
        }

        let ssrc = buf.get_u32();
        let ntp_timestamp = NtpTimestamp {
            seconds: buf.get_u32(),
            fraction: buf.get_u32(),
        };
        let sender_packet_count = buf.get_u32();
        let sender_octet_count = buf.get_u32();
        let _reserved = buf.get_u32();

        let report_blocks = (0..report_count)
            .map(|_| RtcpReportBlock::parse(buf))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            ssrc,
            ntp_timestamp,
            sender_packet_count,
            sender_octet_count,
            report_blocks,
        })
    }
}
