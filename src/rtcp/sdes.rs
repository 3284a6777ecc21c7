use byteorder::{BigEndian, ByteOrder};

use super::{
    common_header::CommonHeader,
    packet_type::{PT_SDES, RtcpPacketType, finish_packet},
    rtcp::RtcpPacket,
    rtcp_error::RtcpError,
};

/// SDES items (subset; the ingest path only ever inspects CNAME).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdesItem {
    Cname(String), // type=1
    Unknown(u8, Vec<u8>),
}

impl SdesItem {
    fn as_bytes(&self) -> (u8, Vec<u8>) {
        match self {
            SdesItem::Cname(s) => (1, s.as_bytes().to_vec()),
            SdesItem::Unknown(t, v) => (*t, v.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SdesChunk {
    pub ssrc: u32,
    pub items: Vec<SdesItem>,
}

impl SdesChunk {
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), RtcpError> {
        let start = out.len();
        out.extend_from_slice(&self.ssrc.to_be_bytes());
        for item in &self.items {
            let (t, data) = item.as_bytes();
            if data.len() > u8::MAX as usize {
                return Err(RtcpError::SdesItemTooLong);
            }
            out.push(t);
            out.push(data.len() as u8);
            out.extend_from_slice(&data);
        }
        out.push(0); // END
        let rem = (out.len() - start) % 4;
        if rem != 0 {
            out.extend(std::iter::repeat_n(0u8, 4 - rem));
        }
        Ok(())
    }

    fn decode(buf: &[u8]) -> Result<(Self, usize), RtcpError> {
        if buf.len() < 4 {
            return Err(RtcpError::TooShort);
        }
        let ssrc = BigEndian::read_u32(&buf[0..4]);
        let mut idx = 4usize;
        let mut items = Vec::new();

        // Items until END(0). After END, skip to a 4-byte boundary.
        loop {
            if idx >= buf.len() {
                return Err(RtcpError::Truncated);
            }
            let t = buf[idx];
            idx += 1;
            if t == 0 {
                let pad = (4 - (idx % 4)) % 4;
                if buf.len() < idx + pad {
                    return Err(RtcpError::Truncated);
                }
                idx += pad;
                break;
            }
            if idx >= buf.len() {
                return Err(RtcpError::SdesItemTooShort);
            }
            let len = buf[idx] as usize;
            idx += 1;
            if buf.len() < idx + len {
                return Err(RtcpError::SdesItemTooShort);
            }
            let data = &buf[idx..idx + len];
            idx += len;
            let item = match t {
                1 => SdesItem::Cname(String::from_utf8_lossy(data).into_owned()),
                other => SdesItem::Unknown(other, data.to_vec()),
            };
            items.push(item);
        }

        Ok((Self { ssrc, items }, idx))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sdes {
    pub chunks: Vec<SdesChunk>,
}

impl RtcpPacketType for Sdes {
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), RtcpError> {
        let start = out.len();
        let hdr = CommonHeader::new(self.chunks.len() as u8, PT_SDES, false);
        hdr.encode_into(out);
        for chunk in &self.chunks {
            chunk.encode_into(out)?;
        }
        finish_packet(out, start);
        Ok(())
    }

    fn decode(hdr: &CommonHeader, payload: &[u8]) -> Result<RtcpPacket, RtcpError> {
        let count = hdr.rc_or_fmt() as usize;
        let mut chunks = Vec::with_capacity(count);
        let mut idx = 0usize;
        for _ in 0..count {
            let (chunk, used) = SdesChunk::decode(&payload[idx..])?;
            idx += used;
            chunks.push(chunk);
        }
        Ok(RtcpPacket::Sdes(Sdes { chunks }))
    }
}

impl Sdes {
    /// Single-chunk SDES with one CNAME item.
    pub fn cname(ssrc: u32, cname: String) -> Self {
        Self {
            chunks: vec![SdesChunk {
                ssrc,
                items: vec![SdesItem::Cname(cname)],
            }],
        }
    }
}
