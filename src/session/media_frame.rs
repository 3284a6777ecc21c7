use bytes::Bytes;

use crate::track::{BitstreamFormat, MediaType, PacketStructure};

/// One normalized elementary frame, ready for downstream packaging.
/// Presentation and decode timestamps are equal in this pipeline (no
/// B-frame reordering happens at ingest).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFrame {
    pub track_id: u32,
    pub media_type: MediaType,
    /// Presentation timestamp, in the track's time-base units.
    pub pts: i64,
    /// Decode timestamp, equal to `pts`.
    pub dts: i64,
    pub bitstream_format: BitstreamFormat,
    pub packet_structure: PacketStructure,
    pub key_frame: bool,
    pub payload: Bytes,
}
