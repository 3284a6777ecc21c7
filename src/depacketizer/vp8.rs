//! RFC 7741 VP8 <- RTP depacketizer.
//!
//! Strips the payload descriptor from each packet of one frame and
//! concatenates the remainders. The frame is a key frame when the P bit
//! of the VP8 payload header (first post-descriptor byte of the first
//! partition) is clear.

use super::{AssembledFrame, DepacketizeError};

#[derive(Debug, Default)]
pub struct Vp8Depacketizer;

impl Vp8Depacketizer {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&mut self, payloads: &[&[u8]]) -> Result<AssembledFrame, DepacketizeError> {
        let mut out = Vec::new();
        let mut key_frame = false;

        for (i, payload) in payloads.iter().enumerate() {
            if payload.is_empty() {
                return Err(DepacketizeError::EmptyPayload);
            }
            let (start_of_partition, part_id, offset) = parse_descriptor(payload)?;

            if i == 0 {
                // The first packet of a frame must open partition 0.
                if !start_of_partition || part_id != 0 {
                    return Err(DepacketizeError::MissingFrameStart);
                }
                if offset >= payload.len() {
                    return Err(DepacketizeError::BadDescriptor);
                }
                // VP8 payload header, P bit: 0 = key frame
                key_frame = payload[offset] & 0x01 == 0;
            }

            out.extend_from_slice(&payload[offset..]);
        }

        if out.is_empty() {
            return Err(DepacketizeError::EmptyFrame);
        }
        Ok(AssembledFrame {
            payload: out,
            key_frame,
        })
    }
}

/// Walk the variable-length payload descriptor. Returns (S bit, PartID,
/// offset of the VP8 payload).
fn parse_descriptor(payload: &[u8]) -> Result<(bool, u8, usize), DepacketizeError> {
    let b0 = payload[0];
    let extended = b0 & 0x80 != 0; // X
    let start_of_partition = b0 & 0x10 != 0; // S
    let part_id = b0 & 0x0F;
    let mut idx = 1usize;

    if extended {
        if payload.len() <= idx {
            return Err(DepacketizeError::BadDescriptor);
        }
        let ext = payload[idx];
        idx += 1;
        let has_picture_id = ext & 0x80 != 0; // I
        let has_tl0picidx = ext & 0x40 != 0; // L
        let has_tid = ext & 0x20 != 0; // T
        let has_keyidx = ext & 0x10 != 0; // K

        if has_picture_id {
            if payload.len() <= idx {
                return Err(DepacketizeError::BadDescriptor);
            }
            // M bit widens PictureID to 15 bits
            idx += if payload[idx] & 0x80 != 0 { 2 } else { 1 };
        }
        if has_tl0picidx {
            idx += 1;
        }
        if has_tid || has_keyidx {
            idx += 1;
        }
        if payload.len() < idx {
            return Err(DepacketizeError::BadDescriptor);
        }
    }

    Ok((start_of_partition, part_id, idx))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    /// Minimal descriptor: no extension, S bit + PartID 0.
    fn plain(body: &[u8], start: bool) -> Vec<u8> {
        let mut v = vec![if start { 0x10 } else { 0x00 }];
        v.extend_from_slice(body);
        v
    }

    /// Descriptor with X + I (15-bit PictureID).
    fn with_picture_id(body: &[u8], start: bool) -> Vec<u8> {
        let mut v = vec![if start { 0x90 } else { 0x80 }, 0x80, 0x81, 0x02];
        v.extend_from_slice(body);
        v
    }

    #[test]
    fn key_frame_single_packet() {
        // VP8 payload header first byte with P=0 -> key frame
        let pkt = plain(&[0x00, 0xAA, 0xBB], true);
        let payloads: Vec<&[u8]> = vec![&pkt];
        let frame = Vp8Depacketizer::new().assemble(&payloads).unwrap();
        assert_eq!(frame.payload, vec![0x00, 0xAA, 0xBB]);
        assert!(frame.key_frame);
    }

    #[test]
    fn interframe_multi_packet_concatenates() {
        let p1 = with_picture_id(&[0x01, 0x11], true); // P=1 -> interframe
        let p2 = with_picture_id(&[0x22, 0x33], false);
        let payloads: Vec<&[u8]> = vec![&p1, &p2];
        let frame = Vp8Depacketizer::new().assemble(&payloads).unwrap();
        assert_eq!(frame.payload, vec![0x01, 0x11, 0x22, 0x33]);
        assert!(!frame.key_frame);
    }

    #[test]
    fn frame_must_start_at_partition_zero() {
        let pkt = plain(&[0x00], false);
        let payloads: Vec<&[u8]> = vec![&pkt];
        assert_eq!(
            Vp8Depacketizer::new().assemble(&payloads),
            Err(DepacketizeError::MissingFrameStart)
        );
    }

    #[test]
    fn truncated_descriptor_fails() {
        let pkt = vec![0x90]; // X set, no extension byte
        let payloads: Vec<&[u8]> = vec![&pkt];
        assert_eq!(
            Vp8Depacketizer::new().assemble(&payloads),
            Err(DepacketizeError::BadDescriptor)
        );
    }
}
