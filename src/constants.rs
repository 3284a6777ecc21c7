//! Constants shared across the ingest pipeline.

use std::time::Duration;

/// RTP protocol version (RFC 3550).
pub const RTP_VERSION: u8 = 2;
/// RTCP protocol version (RFC 3550).
pub const RTCP_VERSION: u8 = 2;

/// Minimum interval between outbound keyframe requests. The cooldown is
/// shared by every video SSRC of a session, so it bounds total request
/// volume rather than per-stream volume.
pub const KEYFRAME_REQUEST_COOLDOWN: Duration = Duration::from_millis(3000);

/// How long a track accumulates frames before measured bitrate/framerate
/// become meaningful.
pub const QUALITY_MEASUREMENT_WINDOW: Duration = Duration::from_millis(1000);

/// Upper bound on buffered packets while assembling one access unit.
/// A run past this without a marker means the frame boundary was lost.
pub const MAX_PACKETS_PER_ACCESS_UNIT: usize = 512;
