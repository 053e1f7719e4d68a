//! RTCP Packet module
//!
//! This module provides structures for handling RTCP packets as defined in
//! RFC 3550. Sender Reports and Receiver Reports are fully supported; other
//! packet types found in a compound packet are recognized and skipped.
//!
//! Every RTCP packet starts with the same 4-byte header:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|    RC   |      PT       |             length            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! `length` is the packet size in 32-bit words minus one, header included.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Error;
use crate::Result;

mod ntp;
mod receiver_report;
mod report_block;
mod sender_report;

pub use ntp::NtpTimestamp;
pub use receiver_report::RtcpReceiverReport;
pub use report_block::RtcpReportBlock;
pub use sender_report::RtcpSenderReport;

/// RTCP version (same as RTP, always 2)
pub const RTCP_VERSION: u8 = 2;

/// Size of the common RTCP header
pub const RTCP_HEADER_SIZE: usize = 4;

/// Largest report count the 5-bit RC field can carry
pub const MAX_REPORT_COUNT: usize = 31;

/// RTCP packet types as defined in RFC 3550
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RtcpPacketType {
    /// Sender Report (SR)
    SenderReport = 200,

    /// Receiver Report (RR)
    ReceiverReport = 201,

    /// Source Description (SDES)
    SourceDescription = 202,

    /// Goodbye (BYE)
    Goodbye = 203,

    /// Application-Defined (APP)
    ApplicationDefined = 204,
}

impl TryFrom<u8> for RtcpPacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            200 => Ok(RtcpPacketType::SenderReport),
            201 => Ok(RtcpPacketType::ReceiverReport),
            202 => Ok(RtcpPacketType::SourceDescription),
            203 => Ok(RtcpPacketType::Goodbye),
            204 => Ok(RtcpPacketType::ApplicationDefined),
            _ => Err(Error::RtcpError(format!("Unknown RTCP packet type: {}", value))),
        }
    }
}

/// RTCP packet variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtcpPacket {
    /// Sender Report (SR)
    SenderReport(RtcpSenderReport),

    /// Receiver Report (RR)
    ReceiverReport(RtcpReceiverReport),

    /// A known packet type whose body is not decoded
    Other {
        packet_type: RtcpPacketType,
        body: Bytes,
    },
}

impl RtcpPacket {
    /// Packet type of this packet
    pub fn packet_type(&self) -> RtcpPacketType {
        match self {
            RtcpPacket::SenderReport(_) => RtcpPacketType::SenderReport,
            RtcpPacket::ReceiverReport(_) => RtcpPacketType::ReceiverReport,
            RtcpPacket::Other { packet_type, .. } => *packet_type,
        }
    }

    /// Parse the first RTCP packet in `data`
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut buf = Bytes::copy_from_slice(data);
        Self::parse_one(&mut buf)
    }

    /// Parse every packet of a compound RTCP packet
    pub fn parse_compound(data: &[u8]) -> Result<Vec<Self>> {
        let mut buf = Bytes::copy_from_slice(data);
        let mut packets = Vec::new();
        while buf.has_remaining() {
            packets.push(Self::parse_one(&mut buf)?);
        }
        if packets.is_empty() {
            return Err(Error::BufferTooSmall {
                required: RTCP_HEADER_SIZE,
                available: 0,
            });
        }
        Ok(packets)
    }

    fn parse_one(buf: &mut Bytes) -> Result<Self> {
        if buf.remaining() < RTCP_HEADER_SIZE {
            return Err(Error::BufferTooSmall {
                required: RTCP_HEADER_SIZE,
                available: buf.remaining(),
            });
        }

        let first_byte = buf.get_u8();
        let version = first_byte >> 6;
        if version != RTCP_VERSION {
            return Err(Error::RtcpError(format!("Invalid RTCP version: {}", version)));
        }
        let padding = (first_byte >> 5) & 0x01 != 0;
        let report_count = first_byte & 0x1F;

        let packet_type = RtcpPacketType::try_from(buf.get_u8())?;

        // Words minus one, which equals the body size in words
        let length = buf.get_u16() as usize * 4;
        if buf.remaining() < length {
            return Err(Error::BufferTooSmall {
                required: length,
                available: buf.remaining(),
            });
        }

        let mut body = buf.split_to(length);
        if padding {
            let pad = body.last().copied().unwrap_or(0) as usize;
            if pad == 0 || pad > body.len() {
                return Err(Error::RtcpError(format!("Invalid RTCP padding: {}", pad)));
            }
            body.truncate(body.len() - pad);
        }

        match packet_type {
            RtcpPacketType::SenderReport => Ok(RtcpPacket::SenderReport(
                RtcpSenderReport::parse(&mut body, report_count)?,
            )),
            RtcpPacketType::ReceiverReport => Ok(RtcpPacket::ReceiverReport(
                RtcpReceiverReport::parse(&mut body, report_count)?,
            )),
            other => Ok(RtcpPacket::Other {
                packet_type: other,
                body,
            }),
        }
    }

    /// Serialize the packet including its common header
    pub fn serialize(&self) -> Result<Bytes> {
        let (report_count, body) = match self {
            RtcpPacket::SenderReport(sr) => (sr.report_blocks.len(), sr.serialize()?),
            RtcpPacket::ReceiverReport(rr) => (rr.report_blocks.len(), rr.serialize()?),
            RtcpPacket::Other { body, .. } => (0, BytesMut::from(&body[..])),
        };

        if report_count > MAX_REPORT_COUNT {
            return Err(Error::RtcpError(format!(
                "Too many report blocks: {}",
                report_count
            )));
        }
        if body.len() % 4 != 0 {
            return Err(Error::RtcpError(format!(
                "RTCP body is not a whole number of words: {} bytes",
                body.len()
            )));
        }

        let total = RTCP_HEADER_SIZE + body.len();
        let mut buf = BytesMut::with_capacity(total);
        buf.put_u8((RTCP_VERSION << 6) | report_count as u8);
        buf.put_u8(self.packet_type() as u8);
        buf.put_u16((total / 4 - 1) as u16);
        buf.put_slice(&body);
        Ok(buf.freeze())
    }
}
