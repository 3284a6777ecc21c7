use std::fmt;

/// Kind of elementary stream a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Video,
    Audio,
    Data,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Video => f.write_str("Video"),
            MediaType::Audio => f.write_str("Audio"),
            MediaType::Data => f.write_str("Data"),
        }
    }
}

/// Codec identity of a track. `None` is the pre-negotiation placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaCodecId {
    #[default]
    None,
    H264,
    H265,
    Vp8,
    Vp9,
    Jpeg,
    Png,
    Aac,
    Opus,
    Multiopus,
    Mp3,
}

impl fmt::Display for MediaCodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaCodecId::None => "none",
            MediaCodecId::H264 => "h264",
            MediaCodecId::H265 => "h265",
            MediaCodecId::Vp8 => "vp8",
            MediaCodecId::Vp9 => "vp9",
            MediaCodecId::Jpeg => "jpeg",
            MediaCodecId::Png => "png",
            MediaCodecId::Aac => "aac",
            MediaCodecId::Opus => "opus",
            MediaCodecId::Multiopus => "multiopus",
            MediaCodecId::Mp3 => "mp3",
        };
        f.write_str(name)
    }
}

/// Bitstream packaging of a payload, both on the wire (origin formats,
/// the `*Rtp*` variants) and after depacketization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitstreamFormat {
    #[default]
    Unknown,
    H264AnnexB,
    H264RtpRfc6184,
    Vp8,
    Vp8RtpRfc7741,
    Opus,
    OpusRtpRfc7587,
    AacRaw,
    AacMpeg4Generic,
}

impl fmt::Display for BitstreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BitstreamFormat::Unknown => "unknown",
            BitstreamFormat::H264AnnexB => "h264_annexb",
            BitstreamFormat::H264RtpRfc6184 => "h264_rtp_rfc6184",
            BitstreamFormat::Vp8 => "vp8",
            BitstreamFormat::Vp8RtpRfc7741 => "vp8_rtp_rfc7741",
            BitstreamFormat::Opus => "opus",
            BitstreamFormat::OpusRtpRfc7587 => "opus_rtp_rfc7587",
            BitstreamFormat::AacRaw => "aac_raw",
            BitstreamFormat::AacMpeg4Generic => "aac_mpeg4_generic",
        };
        f.write_str(name)
    }
}

/// Structural shape of one emitted frame's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketStructure {
    /// Opaque codec frame, no sub-structure the packager must know about.
    Raw,
    /// One or more length/startcode-delimited NAL units.
    Nalu,
}

impl fmt::Display for PacketStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketStructure::Raw => f.write_str("raw"),
            PacketStructure::Nalu => f.write_str("nalu"),
        }
    }
}
