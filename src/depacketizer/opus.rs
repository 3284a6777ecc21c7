//! RFC 7587 Opus <- RTP depacketizer.
//!
//! An RTP packet carries exactly one Opus packet, so reassembly is a
//! straight copy. Every Opus frame is independently decodable; none is
//! flagged as a key frame.

use super::{AssembledFrame, DepacketizeError};

#[derive(Debug, Default)]
pub struct OpusDepacketizer;

impl OpusDepacketizer {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&mut self, payloads: &[&[u8]]) -> Result<AssembledFrame, DepacketizeError> {
        let payload = match payloads {
            [] => return Err(DepacketizeError::EmptyFrame),
            [single] => *single,
            // More than one packet for an audio frame means the frame
            // grouping upstream broke; keep the first packet's payload.
            [first, ..] => *first,
        };
        if payload.is_empty() {
            return Err(DepacketizeError::EmptyPayload);
        }
        Ok(AssembledFrame {
            payload: payload.to_vec(),
            key_frame: false,
        })
    }
}
