use std::fmt;

use crate::node::NodeError;

/// Fatal session-level failures. Everything softer (per-frame drops) is
/// absorbed and counted instead; see the stats module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    MediaLineCountMismatch { local: usize, peer: usize },
    MissingPayload { line: usize },
    UnsupportedCodec { codec: String },
    DepacketizerUnavailable { codec: String },
    Node(NodeError),
    LockPoisoned,
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use IngestError::*;
        match self {
            MediaLineCountMismatch { local, peer } => write!(
                f,
                "m= line count of peer ({peer}) does not correspond with local ({local})"
            ),
            MissingPayload { line } => {
                write!(f, "no payload descriptor on media line {line}")
            }
            UnsupportedCodec { codec } => write!(f, "unsupported codec: {codec}"),
            DepacketizerUnavailable { codec } => {
                write!(f, "could not create depacketizer for codec: {codec}")
            }
            Node(e) => write!(f, "node chain error: {e}"),
            LockPoisoned => write!(f, "lifecycle lock poisoned"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<NodeError> for IngestError {
    fn from(e: NodeError) -> Self {
        Self::Node(e)
    }
}
