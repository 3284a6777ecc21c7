use byteorder::{BigEndian, ByteOrder};

use super::{
    common_header::CommonHeader,
    packet_type::{FMT_FIR, PT_PSFB, RtcpPacketType, finish_packet},
    rtcp::RtcpPacket,
    rtcp_error::RtcpError,
};

const MAX_FIR_ENTRIES: usize = 31;

/// One FCI entry of a FIR: the target stream and the request sequence
/// number that lets the encoder discard stale requests (RFC 5104 §4.3.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirEntry {
    pub ssrc: u32,
    pub seq_no: u8,
}

/// Feedback: Full Intra Request (PSFB, FMT=4).
///
/// The media source field of the packet is always zero; targets live in
/// the FCI entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullIntraRequest {
    pub sender_ssrc: u32,
    pub entries: Vec<FirEntry>,
}

impl RtcpPacketType for FullIntraRequest {
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), RtcpError> {
        if self.entries.len() > MAX_FIR_ENTRIES {
            return Err(RtcpError::TooManyFirEntries(self.entries.len()));
        }
        let start = out.len();
        let hdr = CommonHeader::new(FMT_FIR, PT_PSFB, false);
        hdr.encode_into(out);
        out.extend_from_slice(&self.sender_ssrc.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes()); // media source: unused
        for entry in &self.entries {
            out.extend_from_slice(&entry.ssrc.to_be_bytes());
            out.push(entry.seq_no);
            out.extend_from_slice(&[0, 0, 0]); // reserved
        }
        finish_packet(out, start);
        Ok(())
    }

    fn decode(hdr: &CommonHeader, payload: &[u8]) -> Result<RtcpPacket, RtcpError> {
        if hdr.rc_or_fmt() != FMT_FIR {
            return Err(RtcpError::Invalid);
        }
        if payload.len() < 8 {
            return Err(RtcpError::TooShort);
        }
        let sender_ssrc = BigEndian::read_u32(&payload[0..4]);
        // payload[4..8] is the unused media source
        let mut entries = Vec::new();
        let mut idx = 8usize;
        while idx + 8 <= payload.len() {
            entries.push(FirEntry {
                ssrc: BigEndian::read_u32(&payload[idx..idx + 4]),
                seq_no: payload[idx + 4],
            });
            idx += 8;
        }
        if idx != payload.len() {
            return Err(RtcpError::Truncated);
        }
        Ok(RtcpPacket::Fir(FullIntraRequest {
            sender_ssrc,
            entries,
        }))
    }
}

impl FullIntraRequest {
    /// FIR targeting a single stream.
    pub fn single(sender_ssrc: u32, media_ssrc: u32, seq_no: u8) -> Self {
        Self {
            sender_ssrc,
            entries: vec![FirEntry {
                ssrc: media_ssrc,
                seq_no,
            }],
        }
    }
}
