//! rtc-ingest turns a live WebRTC push session into normalized elementary
//! media frames.
//!
//! The pipeline consumes encrypted transport datagrams from an already
//! connected session handle, runs them through a bidirectional node chain
//! (RTP/RTCP framing <-> SRTP <-> DTLS <-> transport edge), reassembles
//! codec access units per SSRC and stamps each frame with a presentation
//! timestamp derived from RTCP Sender Reports.
//!
//! The crate is structured into several modules, each responsible for a
//! specific layer of the ingest path.

/// Protocol-wide constants (versions, cooldowns, measurement windows).
pub mod constants;
/// Per-codec access-unit reassembly from RTP payload sequences.
pub mod depacketizer;
/// The ordered transform-node chain and its boundary traits.
pub mod node;
/// RTCP packet parsing and building.
pub mod rtcp;
/// RTP packet parsing and building.
pub mod rtp;
/// Session orchestration: negotiation, track ownership, frame emission.
pub mod session;
/// RTP-to-wallclock timestamp synchronization from Sender Reports.
pub mod sync;
/// Media track model: codec identity, timing, validity and quality state.
pub mod track;
