//! RFC 3640 MPEG4-generic (AAC) <- RTP depacketizer, high-bitrate mode:
//! sizeLength=13, indexLength=3. The AU-header section prefixes each
//! packet; the access units follow back to back.

use byteorder::{BigEndian, ByteOrder};

use super::{AssembledFrame, DepacketizeError};

#[derive(Debug, Default)]
pub struct Mpeg4GenericDepacketizer;

impl Mpeg4GenericDepacketizer {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&mut self, payloads: &[&[u8]]) -> Result<AssembledFrame, DepacketizeError> {
        if payloads.is_empty() {
            return Err(DepacketizeError::EmptyFrame);
        }

        let mut out = Vec::new();
        for payload in payloads {
            append_access_units(payload, &mut out)?;
        }
        if out.is_empty() {
            return Err(DepacketizeError::EmptyFrame);
        }
        Ok(AssembledFrame {
            payload: out,
            key_frame: false,
        })
    }
}

fn append_access_units(payload: &[u8], out: &mut Vec<u8>) -> Result<(), DepacketizeError> {
    if payload.len() < 2 {
        return Err(DepacketizeError::BadAuHeader);
    }
    // AU-headers-length is in bits; each header is 16 bits in hbr mode.
    let headers_bits = BigEndian::read_u16(&payload[0..2]) as usize;
    let headers_bytes = headers_bits.div_ceil(8);
    if headers_bits % 16 != 0 || payload.len() < 2 + headers_bytes {
        return Err(DepacketizeError::BadAuHeader);
    }

    let mut sizes = Vec::with_capacity(headers_bytes / 2);
    for i in 0..headers_bytes / 2 {
        let header = BigEndian::read_u16(&payload[2 + i * 2..4 + i * 2]);
        sizes.push((header >> 3) as usize); // upper 13 bits: AU size
    }

    let mut data = &payload[2 + headers_bytes..];
    for size in sizes {
        if size == 0 || data.len() < size {
            return Err(DepacketizeError::BadAuHeader);
        }
        out.extend_from_slice(&data[..size]);
        data = &data[size..];
    }
    Ok(())
}
