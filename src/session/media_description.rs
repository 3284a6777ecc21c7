//! Already-parsed session description inputs. Offer/answer semantics and
//! SDP text live with the signaling layer; the ingest session only reads
//! the negotiated media lines.

use crate::track::MediaType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDirection {
    SendOnly,
    RecvOnly,
    SendRecv,
    Inactive,
}

impl MediaDirection {
    /// Whether the peer will push media on this line.
    pub fn peer_sends(&self) -> bool {
        matches!(self, MediaDirection::SendOnly | MediaDirection::SendRecv)
    }
}

/// One negotiated `a=extmap` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtmapEntry {
    pub id: u8,
    pub uri: String,
}

/// One payload of a media line. The first entry of a line is the
/// highest-priority (chosen) payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDescription {
    pub payload_type: u8,
    /// Codec name as negotiated (`opus`, `H264`, ...); matched
    /// case-insensitively.
    pub codec: String,
    pub clock_rate: u32,
    /// Encoding parameters; channel count for audio.
    pub channels: Option<u16>,
    /// Negotiated `a=rtcp-fb` capability names (`transport-cc`, ...).
    pub rtcp_feedback: Vec<String>,
    /// Out-of-band parameter sets already rendered to Annex-B, when the
    /// line carried them (H264 sprop-parameter-sets).
    pub h264_extradata: Option<Vec<u8>>,
}

impl PayloadDescription {
    pub fn new(payload_type: u8, codec: &str, clock_rate: u32) -> Self {
        Self {
            payload_type,
            codec: codec.to_string(),
            clock_rate,
            channels: None,
            rtcp_feedback: Vec::new(),
            h264_extradata: None,
        }
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_feedback(mut self, name: &str) -> Self {
        self.rtcp_feedback.push(name.to_string());
        self
    }

    pub fn with_h264_extradata(mut self, extradata: Vec<u8>) -> Self {
        self.h264_extradata = Some(extradata);
        self
    }

    pub fn has_feedback(&self, name: &str) -> bool {
        self.rtcp_feedback.iter().any(|fb| fb.eq_ignore_ascii_case(name))
    }
}

/// One `m=` line after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLineDescription {
    pub kind: MediaType,
    pub direction: MediaDirection,
    pub ssrc: u32,
    pub payloads: Vec<PayloadDescription>,
    pub extmaps: Vec<ExtmapEntry>,
}

impl MediaLineDescription {
    /// The first payload has the highest priority.
    pub fn first_payload(&self) -> Option<&PayloadDescription> {
        self.payloads.first()
    }

    /// Extension-map lookup by URI substring, mirroring how extension
    /// names are negotiated (the full URI carries draft version noise).
    pub fn find_extmap(&self, needle: &str) -> Option<&ExtmapEntry> {
        self.extmaps.iter().find(|entry| entry.uri.contains(needle))
    }
}

/// The media lines of one endpoint's description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDescription {
    pub media: Vec<MediaLineDescription>,
}

impl SessionDescription {
    pub fn new(media: Vec<MediaLineDescription>) -> Self {
        Self { media }
    }
}
