use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use super::header::RtpHeader;
use crate::error::Error;
use crate::{Result, RtpSequenceNumber, RtpSsrc, RtpTimestamp};

/// RTP packet implementation
#[derive(Clone, PartialEq, Eq)]
pub struct RtpPacket {
    /// RTP header
    pub header: RtpHeader,

    /// Payload data
    pub payload: Bytes,
}

impl RtpPacket {
    /// Create a new RTP packet
    pub fn new(header: RtpHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Create a new RTP packet with basic parameters
    pub fn new_with_payload(
        payload_type: u8,
        sequence_number: RtpSequenceNumber,
        timestamp: RtpTimestamp,
        ssrc: RtpSsrc,
        payload: Bytes,
    ) -> Self {
        let header = RtpHeader::new(payload_type, sequence_number, timestamp, ssrc);
        Self { header, payload }
    }

    /// Get the total size of the packet in bytes
    pub fn size(&self) -> usize {
        self.header.size() + self.payload.len()
    }

    /// Parse an RTP packet from bytes
    ///
    /// Trailing padding announced by the P bit is stripped from the payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut buf = Bytes::copy_from_slice(data);
        let header = RtpHeader::parse(&mut buf)?;

        let payload_len = strip_padding(&header, &buf)?.len();
        let payload = buf.slice(0..payload_len);

        Ok(Self { header, payload })
    }

    /// Serialize the packet to bytes
    ///
    /// The padding flag is ignored on output; packets are always written
    /// without padding.
    pub fn serialize(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.size());
        let mut header = self.header.clone();
        header.padding = false;
        header.serialize(&mut buf)?;
        buf.put_slice(&self.payload);
        Ok(buf.freeze())
    }
}

/// Payload bytes that follow `header`, with any trailing padding removed
///
/// With the P bit set the last byte counts the padding octets, itself
/// included; zero or more than the remaining bytes is invalid.
pub fn strip_padding<'a>(header: &RtpHeader, body: &'a [u8]) -> Result<&'a [u8]> {
    if !header.padding {
        return Ok(body);
    }
    let padding = body.last().copied().unwrap_or(0) as usize;
    if padding == 0 || padding > body.len() {
        return Err(Error::InvalidPacket(format!(
            "Invalid padding value: {} with {} bytes remaining",
            padding,
            body.len()
        )));
    }
    Ok(&body[..body.len() - padding])
}

impl fmt::Debug for RtpPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RtpPacket")
            .field("header", &self.header)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_serialize_parse() {
        let payload = Bytes::from_static(&[1, 2, 3, 4, 5, 6]);
        let packet = RtpPacket::new_with_payload(0, 65535, 160, 0xcafebabe, payload.clone());

        let bytes = packet.serialize().unwrap();
        assert_eq!(bytes.len(), 12 + 6);

        let parsed = RtpPacket::parse(&bytes).unwrap();
        assert_eq!(parsed, packet);
        assert_eq!(parsed.payload, payload);
    }

    #[test]
    fn test_padding_is_stripped() {
        let mut data = RtpPacket::new_with_payload(0, 1, 2, 3, Bytes::from_static(b"abcd"))
            .serialize()
            .unwrap()
            .to_vec();
        data[0] |= 0x20;
        data.extend_from_slice(&[0, 0, 3]);

        let parsed = RtpPacket::parse(&data).unwrap();
        assert_eq!(&parsed.payload[..], b"abcd");
    }

    #[test]
    fn test_bad_padding() {
        let mut data = RtpPacket::new_with_payload(0, 1, 2, 3, Bytes::from_static(b"ab"))
            .serialize()
            .unwrap()
            .to_vec();
        data[0] |= 0x20;
        data.push(9);
        assert!(RtpPacket::parse(&data).is_err());
    }

    #[test]
    fn test_zero_padding_count_is_invalid() {
        let mut header = RtpHeader::new(0, 1, 2, 3);
        header.padding = true;
        assert!(strip_padding(&header, b"ab\0").is_err());
        assert!(strip_padding(&header, b"").is_err());
        assert_eq!(strip_padding(&header, b"ab\x01").unwrap(), b"ab");

        header.padding = false;
        assert_eq!(strip_padding(&header, b"ab\0").unwrap(), b"ab\0");
    }

    #[test]
    fn test_sentinel_is_not_rtp() {
        assert!(RtpPacket::parse(crate::END_OF_STREAM).is_err());
    }
}
