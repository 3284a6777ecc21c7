pub mod channel_layout;
pub mod clock;
pub mod codec;
pub mod media_track;
pub mod timebase;

pub use channel_layout::AudioChannelLayout;
pub use clock::{ManualClock, MeasurementClock, SharedClock, SystemClock};
pub use codec::{BitstreamFormat, MediaCodecId, MediaType, PacketStructure};
pub use media_track::MediaTrack;
pub use timebase::Timebase;
