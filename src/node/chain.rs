//! Doubly-linked list of transform nodes. The chain owns its nodes;
//! neighbor links are plain indices, so bidirectional traversal needs no
//! reference cycles. Lifecycle transitions are expected to be serialized
//! by the owning session; data-plane calls may arrive concurrently and
//! only touch internally-synchronized stage state.

use std::sync::Arc;

use log::debug;

use super::edge::EdgeStage;
use super::framing::FramingStage;
use super::node_error::NodeError;
use super::security::SecurityStage;
use super::{AtomicNodeState, NodeState, NodeType, SecurityTransform, TransportSession};

/// The closed set of stage behaviors a node can host.
enum Stage {
    Framing(FramingStage),
    Security(SecurityStage),
    Edge(EdgeStage),
}

struct Node {
    node_type: NodeType,
    state: AtomicNodeState,
    /// Neighbor toward the media side (framing stage). Index, not owner.
    prev: Option<usize>,
    /// Neighbor toward the wire side (transport edge). Index, not owner.
    next: Option<usize>,
    stage: Stage,
}

pub struct NodeChain {
    nodes: Vec<Node>,
}

impl NodeChain {
    /// Build and wire the standard ingest chain:
    /// RtpRtcp <-> SRTP <-> DTLS <-> Edge.
    pub fn new(
        framing: FramingStage,
        srtp: Box<dyn SecurityTransform>,
        dtls: Box<dyn SecurityTransform>,
        transport: Arc<dyn TransportSession>,
    ) -> Self {
        let nodes = vec![
            Node {
                node_type: NodeType::RtpRtcp,
                state: AtomicNodeState::new(NodeState::Created),
                prev: None,
                next: Some(1),
                stage: Stage::Framing(framing),
            },
            Node {
                node_type: NodeType::Srtp,
                state: AtomicNodeState::new(NodeState::Created),
                prev: Some(0),
                next: Some(2),
                stage: Stage::Security(SecurityStage::new(srtp)),
            },
            Node {
                node_type: NodeType::Dtls,
                state: AtomicNodeState::new(NodeState::Created),
                prev: Some(1),
                next: Some(3),
                stage: Stage::Security(SecurityStage::new(dtls)),
            },
            Node {
                node_type: NodeType::Edge,
                state: AtomicNodeState::new(NodeState::Created),
                prev: Some(2),
                next: None,
                stage: Stage::Edge(EdgeStage::new(transport)),
            },
        ];
        Self { nodes }
    }

    /// Transition every node to `Started`. Nothing flows until the whole
    /// chain is up: states flip only after every stage accepted the
    /// start. A second start without an intervening stop is rejected and
    /// leaves the running chain untouched.
    pub fn start(&self) -> Result<(), NodeError> {
        self.check_wiring()?;

        for node in &self.nodes {
            if node.state.get() == NodeState::Started {
                return Err(NodeError::AlreadyStarted(node.node_type));
            }
        }

        for node in &self.nodes {
            if let Stage::Security(stage) = &node.stage {
                if !stage.start() {
                    return Err(NodeError::StageStartFailed(node.node_type));
                }
            }
        }

        for node in &self.nodes {
            node.state.set(NodeState::Started);
            debug!("[Chain] {} node started", node.node_type);
        }
        Ok(())
    }

    /// Transition every node to `Stopped`. Idempotent: stopping a chain
    /// that is already stopped (or never started) is a successful no-op.
    pub fn stop(&self) {
        for node in &self.nodes {
            if node.state.get() == NodeState::Started {
                if let Stage::Security(stage) = &node.stage {
                    stage.stop();
                }
                debug!("[Chain] {} node stopped", node.node_type);
            }
            node.state.set(NodeState::Stopped);
        }
    }

    /// Inbound entry: a transport datagram enters at the edge and climbs
    /// toward the framing stage, being decrypted on the way.
    pub fn receive_from_transport(&self, data: Vec<u8>) -> bool {
        match self.nodes.last() {
            Some(_) => self.send_data_to_prev_node(self.nodes.len() - 1, data),
            None => false,
        }
    }

    /// Outbound entry: control bytes produced at the framing level walk
    /// down the chain, get protected, and leave through the edge.
    pub fn send_toward_transport(&self, data: Vec<u8>) -> bool {
        self.send_data_to_next_node(0, data)
    }

    /// Access to the framing stage (registrations, feedback state).
    pub fn framing(&self) -> Option<&FramingStage> {
        self.nodes.iter().find_map(|node| match &node.stage {
            Stage::Framing(framing) => Some(framing),
            _ => None,
        })
    }

    /// Deliver `data` to the node at `idx` for inbound processing.
    fn send_data_to_prev_node(&self, idx: usize, data: Vec<u8>) -> bool {
        let node = &self.nodes[idx];
        if node.state.get() != NodeState::Started {
            debug!(
                "[Chain] {} node has not started, inbound data canceled",
                node.node_type
            );
            return false;
        }

        match &node.stage {
            // The edge does not transform inbound traffic.
            Stage::Edge(_) => match node.prev {
                Some(prev) => self.send_data_to_prev_node(prev, data),
                None => false,
            },
            Stage::Security(stage) => match stage.decrypt(data) {
                // `None` means the transform consumed the buffer
                // (handshake traffic) or rejected it; both end here.
                None => true,
                Some(out) => match node.prev {
                    Some(prev) => self.send_data_to_prev_node(prev, out),
                    None => false,
                },
            },
            Stage::Framing(stage) => {
                stage.receive(data);
                true
            }
        }
    }

    /// Deliver `data` to the node at `idx` for outbound processing.
    fn send_data_to_next_node(&self, idx: usize, data: Vec<u8>) -> bool {
        let node = &self.nodes[idx];
        if node.state.get() != NodeState::Started {
            debug!(
                "[Chain] {} node has not started, outbound data canceled",
                node.node_type
            );
            return false;
        }

        match &node.stage {
            // Framing already produced wire-format bytes; pass along.
            Stage::Framing(_) => match node.next {
                Some(next) => self.send_data_to_next_node(next, data),
                None => false,
            },
            Stage::Security(stage) => match stage.encrypt(data) {
                None => true,
                Some(out) => match node.next {
                    Some(next) => self.send_data_to_next_node(next, out),
                    None => false,
                },
            },
            Stage::Edge(stage) => stage.send(&data),
        }
    }

    /// A node may only start once both of its neighbor links are in
    /// place; anything else is a wiring bug in the builder.
    fn check_wiring(&self) -> Result<(), NodeError> {
        let last = self.nodes.len().saturating_sub(1);
        for (idx, node) in self.nodes.iter().enumerate() {
            let prev_ok = if idx == 0 {
                node.prev.is_none()
            } else {
                node.prev == Some(idx - 1)
            };
            let next_ok = if idx == last {
                node.next.is_none()
            } else {
                node.next == Some(idx + 1)
            };
            if !prev_ok || !next_ok {
                return Err(NodeError::NotWired(node.node_type));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::rtcp::RtcpPacket;
    use crate::rtp::RtpPacket;
    use crate::session::stats::IngestStats;
    use crate::track::MediaType;

    struct NullObserver {
        frames: AtomicUsize,
    }

    impl super::super::RtpRtcpObserver for NullObserver {
        fn on_rtp_frame_received(&self, _packets: Vec<RtpPacket>) {
            self.frames.fetch_add(1, Ordering::SeqCst);
        }

        fn on_rtcp_received(&self, _packet: RtcpPacket) {}
    }

    struct FakeTransport {
        sent: Mutex<Vec<Vec<u8>>>,
        disconnected: AtomicBool,
    }

    impl FakeTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                disconnected: AtomicBool::new(false),
            })
        }
    }

    impl TransportSession for FakeTransport {
        fn send(&self, data: &[u8]) -> bool {
            self.sent.lock().unwrap().push(data.to_vec());
            true
        }

        fn disconnect(&self) {
            self.disconnected.store(true, Ordering::SeqCst);
        }
    }

    /// Transform that tags buffers so direction of travel is observable.
    struct TaggingTransform(u8);

    impl SecurityTransform for TaggingTransform {
        fn start(&self) -> bool {
            true
        }

        fn stop(&self) {}

        fn decrypt(&self, mut data: Vec<u8>) -> Option<Vec<u8>> {
            data.retain(|b| *b != self.0);
            Some(data)
        }

        fn encrypt(&self, mut data: Vec<u8>) -> Option<Vec<u8>> {
            data.push(self.0);
            Some(data)
        }
    }

    fn build_chain(observer: Arc<NullObserver>, transport: Arc<FakeTransport>) -> NodeChain {
        let stats = Arc::new(IngestStats::new());
        let framing = FramingStage::new(observer, stats);
        framing.add_rtp_receiver(5, MediaType::Audio);
        NodeChain::new(
            framing,
            Box::new(TaggingTransform(0xEE)),
            Box::new(TaggingTransform(0xDD)),
            transport,
        )
    }

    fn observer() -> Arc<NullObserver> {
        Arc::new(NullObserver {
            frames: AtomicUsize::new(0),
        })
    }

    #[test]
    fn data_is_rejected_until_started() {
        let obs = observer();
        let chain = build_chain(obs.clone(), FakeTransport::new());
        let pkt = RtpPacket::simple(96, true, 1, 0, 5, vec![1]).encode();

        assert!(!chain.receive_from_transport(pkt.clone()));
        assert_eq!(obs.frames.load(Ordering::SeqCst), 0);

        chain.start().unwrap();
        assert!(chain.receive_from_transport(pkt.clone()));
        assert_eq!(obs.frames.load(Ordering::SeqCst), 1);

        chain.stop();
        assert!(!chain.receive_from_transport(pkt));
        assert_eq!(obs.frames.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn second_start_is_rejected_without_teardown() {
        let obs = observer();
        let chain = build_chain(obs.clone(), FakeTransport::new());
        chain.start().unwrap();
        assert!(matches!(chain.start(), Err(NodeError::AlreadyStarted(_))));

        // chain must still be operational after the rejected start
        let pkt = RtpPacket::simple(96, true, 1, 0, 5, vec![1]).encode();
        assert!(chain.receive_from_transport(pkt));
        assert_eq!(obs.frames.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let chain = build_chain(observer(), FakeTransport::new());
        chain.stop(); // never started
        chain.start().unwrap();
        chain.stop();
        chain.stop(); // second stop: no effect, no panic
    }

    #[test]
    fn restart_after_stop_is_allowed() {
        let obs = observer();
        let chain = build_chain(obs.clone(), FakeTransport::new());
        chain.start().unwrap();
        chain.stop();
        chain.start().unwrap();

        let pkt = RtpPacket::simple(96, true, 1, 0, 5, vec![1]).encode();
        assert!(chain.receive_from_transport(pkt));
        assert_eq!(obs.frames.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn outbound_walks_every_security_hop_to_the_edge() {
        let transport = FakeTransport::new();
        let chain = build_chain(observer(), transport.clone());
        chain.start().unwrap();

        assert!(chain.send_toward_transport(vec![0x01, 0x02]));
        let sent = transport.sent.lock().unwrap();
        // SRTP tag first (0xEE), then DTLS tag (0xDD)
        assert_eq!(sent.as_slice(), &[vec![0x01, 0x02, 0xEE, 0xDD]]);
    }

    #[test]
    fn inbound_is_decrypted_in_edge_to_framing_order() {
        let obs = observer();
        let chain = build_chain(obs.clone(), FakeTransport::new());
        chain.start().unwrap();

        // A valid RTP packet with both transform tags appended; each hop
        // strips its own tag on the way up.
        let mut pkt = RtpPacket::simple(96, true, 1, 0, 5, vec![1]).encode();
        pkt.push(0xEE);
        pkt.push(0xDD);
        assert!(chain.receive_from_transport(pkt));
        assert_eq!(obs.frames.load(Ordering::SeqCst), 1);
    }
}
