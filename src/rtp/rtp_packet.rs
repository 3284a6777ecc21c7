//! Minimal RTP packet model + encode/decode per RFC 3550.
//! This module has **no** session logic (no jitter calc, no RTX, etc.).
//! It focuses on immutable packet structs and safe serialization.

use byteorder::{BigEndian, ByteOrder};

use super::{rtp_error::RtpError, rtp_header::RtpHeader, rtp_header_extension::RtpHeaderExtension};
use crate::constants::RTP_VERSION;

/// Complete RTP packet (header + payload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub header: RtpHeader,
    /// Payload without any trailing padding bytes. If padding was present,
    /// use `padding_bytes` to know how much was removed during decode.
    pub payload: Vec<u8>,
    /// Count of padding bytes (from the last byte) if the P bit was set.
    pub padding_bytes: u8,
}

impl RtpPacket {
    pub fn new(header: RtpHeader, payload: Vec<u8>) -> Self {
        Self {
            header,
            payload,
            padding_bytes: 0,
        }
    }

    /// Convenience constructor.
    pub fn simple(
        payload_type: u8,
        marker: bool,
        seq: u16,
        ts: u32,
        ssrc: u32,
        payload: Vec<u8>,
    ) -> Self {
        let header = RtpHeader::new(payload_type, seq, ts, ssrc).with_marker(marker);
        Self::new(header, payload)
    }

    #[inline]
    pub fn ssrc(&self) -> u32 {
        self.header.ssrc
    }

    #[inline]
    pub fn seq(&self) -> u16 {
        self.header.sequence_number
    }

    #[inline]
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    #[inline]
    pub fn payload_type(&self) -> u8 {
        self.header.payload_type
    }

    #[inline]
    pub fn marker(&self) -> bool {
        self.header.marker
    }

    /// Decode one packet from a datagram.
    pub fn decode(buf: &[u8]) -> Result<Self, RtpError> {
        if buf.len() < 12 {
            return Err(RtpError::TooShort);
        }

        let b0 = buf[0];
        let version = b0 >> 6;
        if version != RTP_VERSION {
            return Err(RtpError::BadVersion(version));
        }
        let padding = (b0 & 0x20) != 0;
        let extension = (b0 & 0x10) != 0;
        let csrc_count = (b0 & 0x0F) as usize;

        let b1 = buf[1];
        let marker = (b1 & 0x80) != 0;
        let payload_type = b1 & 0x7F;

        let sequence_number = BigEndian::read_u16(&buf[2..4]);
        let timestamp = BigEndian::read_u32(&buf[4..8]);
        let ssrc = BigEndian::read_u32(&buf[8..12]);

        let mut idx = 12usize;
        if buf.len() < idx + csrc_count * 4 {
            return Err(RtpError::CsrcCountMismatch {
                expected: csrc_count,
                buf_left: buf.len() - idx,
            });
        }
        let mut csrcs = Vec::with_capacity(csrc_count);
        for _ in 0..csrc_count {
            csrcs.push(BigEndian::read_u32(&buf[idx..idx + 4]));
            idx += 4;
        }

        let header_extension = if extension {
            if buf.len() < idx + 4 {
                return Err(RtpError::HeaderExtensionTooShort);
            }
            let profile = BigEndian::read_u16(&buf[idx..idx + 2]);
            let words = BigEndian::read_u16(&buf[idx + 2..idx + 4]) as usize;
            idx += 4;
            if buf.len() < idx + words * 4 {
                return Err(RtpError::HeaderExtensionTooShort);
            }
            let data = buf[idx..idx + words * 4].to_vec();
            idx += words * 4;
            Some(RtpHeaderExtension::new(profile, data))
        } else {
            None
        };

        let mut payload = buf[idx..].to_vec();
        let mut padding_bytes = 0u8;
        if padding {
            // Last byte counts itself; zero is invalid per RFC 3550.
            padding_bytes = *payload.last().ok_or(RtpError::PaddingTooShort)?;
            if padding_bytes == 0 || payload.len() < padding_bytes as usize {
                return Err(RtpError::PaddingTooShort);
            }
            payload.truncate(payload.len() - padding_bytes as usize);
        }

        let header = RtpHeader {
            version,
            padding,
            extension,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrcs,
            header_extension,
        };
        Ok(Self {
            header,
            payload,
            padding_bytes,
        })
    }

    /// Serialize header + payload. Stripped padding is not re-appended;
    /// the P bit is only set when padding survives in `padding_bytes`.
    pub fn encode(&self) -> Vec<u8> {
        let h = &self.header;
        let mut out = Vec::with_capacity(h.wire_len() + self.payload.len());

        let b0 = (h.version & 0b11) << 6
            | u8::from(h.padding) << 5
            | u8::from(h.header_extension.is_some()) << 4
            | (h.csrcs.len() as u8 & 0x0F);
        out.push(b0);
        out.push(u8::from(h.marker) << 7 | (h.payload_type & 0x7F));
        out.extend_from_slice(&h.sequence_number.to_be_bytes());
        out.extend_from_slice(&h.timestamp.to_be_bytes());
        out.extend_from_slice(&h.ssrc.to_be_bytes());
        for csrc in &h.csrcs {
            out.extend_from_slice(&csrc.to_be_bytes());
        }
        if let Some(ext) = &h.header_extension {
            out.extend_from_slice(&ext.profile.to_be_bytes());
            out.extend_from_slice(&ext.length_words().to_be_bytes());
            out.extend_from_slice(&ext.data);
            for _ in ext.data.len()..ext.padded_len() {
                out.push(0);
            }
        }
        out.extend_from_slice(&self.payload);
        out
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn decode_rejects_short_and_bad_version() {
        assert_eq!(RtpPacket::decode(&[0x80, 0, 0]), Err(RtpError::TooShort));

        let mut buf = vec![0u8; 12];
        buf[0] = 0x40; // version 1
        assert_eq!(RtpPacket::decode(&buf), Err(RtpError::BadVersion(1)));
    }

    #[test]
    fn roundtrip_simple_packet() {
        let pkt = RtpPacket::simple(96, true, 4321, 0x0102_0304, 0xDEAD_BEEF, vec![9, 8, 7]);
        let wire = pkt.encode();
        let back = RtpPacket::decode(&wire).unwrap();
        assert_eq!(back.payload_type(), 96);
        assert!(back.marker());
        assert_eq!(back.seq(), 4321);
        assert_eq!(back.timestamp(), 0x0102_0304);
        assert_eq!(back.ssrc(), 0xDEAD_BEEF);
        assert_eq!(back.payload, vec![9, 8, 7]);
    }

    #[test]
    fn roundtrip_with_csrcs_and_extension() {
        let ext = RtpHeaderExtension::new(0xBEDE, vec![0x10, 0xAA, 0xBB]);
        let header = RtpHeader::new(111, 7, 1000, 42)
            .with_csrcs(vec![1, 2])
            .with_extension(Some(ext));
        let pkt = RtpPacket::new(header, vec![0xFF; 5]);
        let back = RtpPacket::decode(&pkt.encode()).unwrap();
        assert_eq!(back.header.csrcs, vec![1, 2]);
        let ext = back.header.header_extension.unwrap();
        assert_eq!(ext.profile, 0xBEDE);
        // Body comes back padded to a word boundary.
        assert_eq!(ext.data, vec![0x10, 0xAA, 0xBB, 0x00]);
        assert_eq!(back.payload, vec![0xFF; 5]);
    }

    #[test]
    fn decode_strips_padding() {
        let pkt = RtpPacket::simple(96, false, 1, 2, 3, vec![1, 2, 3, 4]);
        let mut wire = pkt.encode();
        wire[0] |= 0x20; // P bit
        wire.extend_from_slice(&[0, 0, 3]); // 3 padding bytes, count last
        let back = RtpPacket::decode(&wire).unwrap();
        assert_eq!(back.payload, vec![1, 2, 3, 4]);
        assert_eq!(back.padding_bytes, 3);
    }

    #[test]
    fn decode_rejects_bogus_padding() {
        let pkt = RtpPacket::simple(96, false, 1, 2, 3, vec![1]);
        let mut wire = pkt.encode();
        wire[0] |= 0x20;
        *wire.last_mut().unwrap() = 200; // claims more padding than payload
        assert_eq!(RtpPacket::decode(&wire), Err(RtpError::PaddingTooShort));
    }

    #[test]
    fn decode_rejects_truncated_csrc_list() {
        let mut wire = RtpPacket::simple(96, false, 1, 2, 3, vec![]).encode();
        wire[0] = (wire[0] & 0xF0) | 0x03; // claim 3 CSRCs, provide none
        assert!(matches!(
            RtpPacket::decode(&wire),
            Err(RtpError::CsrcCountMismatch { expected: 3, .. })
        ));
    }
}
