//! RFC 6184 H.264 <- RTP depacketizer (Single NALU, STAP-A, FU-A).
//!
//! Input : the RTP payloads of one access unit, in arrival order.
//! Output: an Annex-B access unit, tagged as key frame when it carries
//!         an IDR slice.
//!
//! Scope : non-interleaved, packetization-mode=1.

use super::{AssembledFrame, DepacketizeError};

const NALU_TYPE_IDR: u8 = 5;
const NALU_TYPE_STAP_A: u8 = 24;
const NALU_TYPE_FU_A: u8 = 28;

#[derive(Debug, Default)]
pub struct H264Depacketizer;

struct FuState {
    buf: Vec<u8>, // complete NAL content: [reconstructed header, ...payload...]
}

impl H264Depacketizer {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&mut self, payloads: &[&[u8]]) -> Result<AssembledFrame, DepacketizeError> {
        let mut nalus: Vec<Vec<u8>> = Vec::new();
        let mut fua: Option<FuState> = None;

        for payload in payloads {
            if payload.is_empty() {
                return Err(DepacketizeError::EmptyPayload);
            }

            let nalu_header = payload[0];
            let nalu_type = nalu_header & 0x1F;

            match nalu_type {
                1..=23 => {
                    if fua.is_some() {
                        return Err(DepacketizeError::FragmentInterrupted);
                    }
                    nalus.push(payload.to_vec());
                }
                NALU_TYPE_STAP_A => {
                    if fua.is_some() {
                        return Err(DepacketizeError::FragmentInterrupted);
                    }
                    unpack_stap_a(&payload[1..], &mut nalus)?;
                }
                NALU_TYPE_FU_A => {
                    if payload.len() < 2 {
                        return Err(DepacketizeError::TruncatedFragment);
                    }
                    let fu_indicator = nalu_header; // F|NRI|28
                    let fu_header = payload[1]; // S|E|R|Type
                    let start = fu_header & 0x80 != 0;
                    let end = fu_header & 0x40 != 0;

                    // Reconstruct the original one-byte NAL header: F|NRI|Type
                    let orig_hdr = (fu_indicator & 0xE0) | (fu_header & 0x1F);

                    if start {
                        if fua.is_some() {
                            return Err(DepacketizeError::FragmentInterrupted);
                        }
                        let mut buf = Vec::with_capacity(payload.len() - 1);
                        buf.push(orig_hdr);
                        buf.extend_from_slice(&payload[2..]);
                        fua = Some(FuState { buf });
                    } else if let Some(st) = fua.as_mut() {
                        st.buf.extend_from_slice(&payload[2..]);
                    } else {
                        return Err(DepacketizeError::FragmentWithoutStart);
                    }

                    if end {
                        match fua.take() {
                            Some(st) => nalus.push(st.buf),
                            None => return Err(DepacketizeError::FragmentWithoutStart),
                        }
                    }
                }
                other => return Err(DepacketizeError::UnsupportedNaluType(other)),
            }
        }

        if fua.is_some() {
            // frame ended while a fragment was still open
            return Err(DepacketizeError::TruncatedFragment);
        }
        if nalus.is_empty() {
            return Err(DepacketizeError::EmptyFrame);
        }

        let key_frame = nalus.iter().any(|n| n[0] & 0x1F == NALU_TYPE_IDR);
        Ok(AssembledFrame {
            payload: build_annexb(&nalus),
            key_frame,
        })
    }
}

/// STAP-A body: repeated (16-bit size, NALU) pairs.
fn unpack_stap_a(mut body: &[u8], nalus: &mut Vec<Vec<u8>>) -> Result<(), DepacketizeError> {
    while !body.is_empty() {
        if body.len() < 2 {
            return Err(DepacketizeError::BadAggregate);
        }
        let size = ((body[0] as usize) << 8) | body[1] as usize;
        body = &body[2..];
        if size == 0 || body.len() < size {
            return Err(DepacketizeError::BadAggregate);
        }
        nalus.push(body[..size].to_vec());
        body = &body[size..];
    }
    Ok(())
}

#[inline]
fn build_annexb(nalus: &[Vec<u8>]) -> Vec<u8> {
    // Pre-size roughly: 4 bytes start code per NAL
    let total_len: usize = nalus.iter().map(|n| n.len() + 4).sum();
    let mut out = Vec::with_capacity(total_len);
    for n in nalus {
        out.extend_from_slice(&[0, 0, 0, 1]);
        out.extend_from_slice(n);
    }
    out
}
