use std::fmt;

use super::NodeType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    AlreadyStarted(NodeType),
    NotWired(NodeType),
    StageStartFailed(NodeType),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use NodeError::*;
        match self {
            AlreadyStarted(t) => write!(f, "{t} node is already started"),
            NotWired(t) => write!(f, "{t} node started before its neighbors were wired"),
            StageStartFailed(t) => write!(f, "{t} stage failed to start"),
        }
    }
}

impl std::error::Error for NodeError {}
