use super::{common_header::CommonHeader, rtcp::RtcpPacket, rtcp_error::RtcpError};

// RTCP packet types (per RFC 3550; feedback per RFC 4585/5104)
pub const PT_SR: u8 = 200;
pub const PT_RR: u8 = 201;
pub const PT_SDES: u8 = 202;
pub const PT_BYE: u8 = 203;
pub const PT_APP: u8 = 204;
pub const PT_RTPFB: u8 = 205; // Transport layer FB (e.g., Generic NACK)
pub const PT_PSFB: u8 = 206; // Payload-specific FB (e.g., PLI, FIR)

/// FMT value selecting FIR inside a PSFB packet (RFC 5104 §4.3.1).
pub const FMT_FIR: u8 = 4;

pub trait RtcpPacketType {
    /// Encode the complete packet (including the common header).
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), RtcpError>;

    /// Decode a packet from the common header and its payload.
    fn decode(hdr: &CommonHeader, payload: &[u8]) -> Result<RtcpPacket, RtcpError>;
}

/// Patch the length field of a packet that started at `start`, once its
/// full body (padded to 32 bits) has been appended.
pub(crate) fn finish_packet(out: &mut Vec<u8>, start: usize) {
    let pad = (4 - (out.len() - start) % 4) % 4;
    if pad != 0 {
        out.extend(std::iter::repeat_n(0u8, pad));
    }
    let total = out.len() - start;
    let len_words = (total / 4) - 1;
    out[start + 2] = ((len_words >> 8) & 0xFF) as u8;
    out[start + 3] = (len_words & 0xFF) as u8;
}
