pub mod ingest_error;
pub mod ingest_session;
pub mod media_description;
pub mod media_frame;
pub mod stats;

pub use ingest_error::IngestError;
pub use ingest_session::IngestSession;
pub use media_description::{
    ExtmapEntry, MediaDirection, MediaLineDescription, PayloadDescription, SessionDescription,
};
pub use media_frame::MediaFrame;
pub use stats::{IngestStats, IngestStatsSnapshot};
