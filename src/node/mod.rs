//! The ordered transform chain that moves buffers between the transport
//! edge and the RTP/RTCP framing stage, in both directions:
//!
//! inbound:  Edge -> DTLS -> SRTP -> RtpRtcp -> observer callbacks
//! outbound: RtpRtcp -> SRTP -> DTLS -> Edge -> transport handle
//!
//! Cryptographic stages are opaque [`SecurityTransform`] collaborators;
//! the chain only orchestrates lifecycle and buffer flow.

pub mod chain;
pub mod edge;
pub mod framing;
pub mod node_error;
pub mod security;

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::rtcp::RtcpPacket;
use crate::rtp::RtpPacket;

pub use chain::NodeChain;
pub use edge::EdgeStage;
pub use framing::FramingStage;
pub use node_error::NodeError;
pub use security::{PassthroughTransform, SecurityStage};

/// Position tag of a node in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    RtpRtcp,
    Srtp,
    Dtls,
    Edge,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::RtpRtcp => f.write_str("RtpRtcp"),
            NodeType::Srtp => f.write_str("SRTP"),
            NodeType::Dtls => f.write_str("DTLS"),
            NodeType::Edge => f.write_str("Edge"),
        }
    }
}

/// Lifecycle of one node. Data only flows through `Started` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Created,
    Started,
    Stopped,
}

/// Lock-free state cell so data-plane checks stay cheap; transitions are
/// already serialized by the session's lifecycle lock.
pub(crate) struct AtomicNodeState(AtomicU8);

impl AtomicNodeState {
    const CREATED: u8 = 0;
    const STARTED: u8 = 1;
    const STOPPED: u8 = 2;

    pub(crate) fn new(state: NodeState) -> Self {
        let cell = Self(AtomicU8::new(Self::CREATED));
        cell.set(state);
        cell
    }

    pub(crate) fn get(&self) -> NodeState {
        match self.0.load(Ordering::Acquire) {
            Self::CREATED => NodeState::Created,
            Self::STARTED => NodeState::Started,
            _ => NodeState::Stopped,
        }
    }

    pub(crate) fn set(&self, state: NodeState) {
        let raw = match state {
            NodeState::Created => Self::CREATED,
            NodeState::Started => Self::STARTED,
            NodeState::Stopped => Self::STOPPED,
        };
        self.0.store(raw, Ordering::Release);
    }
}

/// An encryption/decryption hop. The chain never inspects key material or
/// handshakes; it hands buffers over and forwards whatever comes back.
pub trait SecurityTransform: Send + Sync {
    fn start(&self) -> bool;
    fn stop(&self);
    /// Inbound direction (toward media). `None` means the transform
    /// consumed or rejected the buffer (handshake traffic, bad auth tag).
    fn decrypt(&self, data: Vec<u8>) -> Option<Vec<u8>>;
    /// Outbound direction (toward the wire).
    fn encrypt(&self, data: Vec<u8>) -> Option<Vec<u8>>;
}

/// Externally-owned, already-connected transport session.
pub trait TransportSession: Send + Sync {
    /// Hand one datagram to the transport. `false` is reported but not
    /// treated as fatal; live sessions prefer dropping to tearing down.
    fn send(&self, data: &[u8]) -> bool;
    /// Release the session. Called at most once per ingest session.
    fn disconnect(&self);
}

/// Callbacks out of the framing stage: complete per-SSRC frame batches
/// and parsed control packets.
pub trait RtpRtcpObserver: Send + Sync {
    fn on_rtp_frame_received(&self, packets: Vec<RtpPacket>);
    fn on_rtcp_received(&self, packet: RtcpPacket);
}
