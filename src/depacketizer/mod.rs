//! Codec-specific reassembly of elementary-stream access units from RTP
//! payload sequences. One engine is bound per SSRC at negotiation time
//! and fed complete per-frame payload batches in arrival order.

pub mod h264;
pub mod mpeg4_generic;
pub mod opus;
pub mod vp8;

use std::fmt;

use crate::track::MediaCodecId;

pub use h264::H264Depacketizer;
pub use mpeg4_generic::Mpeg4GenericDepacketizer;
pub use opus::OpusDepacketizer;
pub use vp8::Vp8Depacketizer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepacketizeError {
    EmptyFrame,
    EmptyPayload,
    TruncatedFragment,
    FragmentWithoutStart,
    FragmentInterrupted,
    MissingFrameStart,
    BadDescriptor,
    BadAggregate,
    BadAuHeader,
    UnsupportedNaluType(u8),
}

impl fmt::Display for DepacketizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DepacketizeError::*;
        match self {
            EmptyFrame => write!(f, "no payload survived reassembly"),
            EmptyPayload => write!(f, "empty RTP payload"),
            TruncatedFragment => write!(f, "fragmented unit ended before its end bit"),
            FragmentWithoutStart => write!(f, "fragment continuation without a start"),
            FragmentInterrupted => write!(f, "new unit while a fragment was open"),
            MissingFrameStart => write!(f, "frame does not begin at a partition start"),
            BadDescriptor => write!(f, "malformed payload descriptor"),
            BadAggregate => write!(f, "malformed aggregation packet"),
            BadAuHeader => write!(f, "malformed AU header section"),
            UnsupportedNaluType(t) => write!(f, "unsupported NAL unit type: {t}"),
        }
    }
}

impl std::error::Error for DepacketizeError {}

/// One reassembled access unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledFrame {
    pub payload: Vec<u8>,
    pub key_frame: bool,
}

/// The closed set of reassembly engines. Adding a codec means adding a
/// variant here; every dispatch point is an exhaustive match, so the
/// compiler walks you to each of them.
pub enum Depacketizer {
    H264(H264Depacketizer),
    Vp8(Vp8Depacketizer),
    Opus(OpusDepacketizer),
    Mpeg4GenericAudio(Mpeg4GenericDepacketizer),
}

impl Depacketizer {
    /// Engine for a negotiated codec, or `None` when the codec has no RTP
    /// payload format in this pipeline.
    pub fn for_codec(codec: MediaCodecId) -> Option<Self> {
        match codec {
            MediaCodecId::H264 => Some(Self::H264(H264Depacketizer::new())),
            MediaCodecId::Vp8 => Some(Self::Vp8(Vp8Depacketizer::new())),
            MediaCodecId::Opus | MediaCodecId::Multiopus => {
                Some(Self::Opus(OpusDepacketizer::new()))
            }
            MediaCodecId::Aac => Some(Self::Mpeg4GenericAudio(Mpeg4GenericDepacketizer::new())),
            MediaCodecId::None
            | MediaCodecId::H265
            | MediaCodecId::Vp9
            | MediaCodecId::Jpeg
            | MediaCodecId::Png
            | MediaCodecId::Mp3 => None,
        }
    }

    /// Reassemble one access unit from the payloads of one frame batch,
    /// in arrival order.
    pub fn assemble(&mut self, payloads: &[&[u8]]) -> Result<AssembledFrame, DepacketizeError> {
        match self {
            Self::H264(d) => d.assemble(payloads),
            Self::Vp8(d) => d.assemble(payloads),
            Self::Opus(d) => d.assemble(payloads),
            Self::Mpeg4GenericAudio(d) => d.assemble(payloads),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_the_negotiable_codecs() {
        assert!(matches!(
            Depacketizer::for_codec(MediaCodecId::H264),
            Some(Depacketizer::H264(_))
        ));
        assert!(matches!(
            Depacketizer::for_codec(MediaCodecId::Vp8),
            Some(Depacketizer::Vp8(_))
        ));
        assert!(matches!(
            Depacketizer::for_codec(MediaCodecId::Opus),
            Some(Depacketizer::Opus(_))
        ));
        assert!(matches!(
            Depacketizer::for_codec(MediaCodecId::Multiopus),
            Some(Depacketizer::Opus(_))
        ));
        assert!(matches!(
            Depacketizer::for_codec(MediaCodecId::Aac),
            Some(Depacketizer::Mpeg4GenericAudio(_))
        ));
        assert!(Depacketizer::for_codec(MediaCodecId::Mp3).is_none());
    }
}
