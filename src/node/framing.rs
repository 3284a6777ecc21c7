//! RTP/RTCP framing stage: the innermost node. Demuxes decrypted
//! datagrams, parses them, groups RTP packets into per-SSRC access-unit
//! batches and hands results to the observer. Malformed traffic is
//! dropped and counted, never fatal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;

use super::RtpRtcpObserver;
use crate::constants::MAX_PACKETS_PER_ACCESS_UNIT;
use crate::rtcp::RtcpPacket;
use crate::rtp::RtpPacket;
use crate::session::stats::IngestStats;
use crate::track::MediaType;

struct FrameAssembler {
    /// Video frames span packets up to the marker bit; audio frames are
    /// one packet each.
    collect_until_marker: bool,
    pending: Vec<RtpPacket>,
}

pub struct FramingStage {
    observer: Arc<dyn RtpRtcpObserver>,
    assemblers: Mutex<HashMap<u32, FrameAssembler>>,
    transport_cc_ext_id: Mutex<Option<u8>>,
    stats: Arc<IngestStats>,
}

impl FramingStage {
    pub fn new(observer: Arc<dyn RtpRtcpObserver>, stats: Arc<IngestStats>) -> Self {
        Self {
            observer,
            assemblers: Mutex::new(HashMap::new()),
            transport_cc_ext_id: Mutex::new(None),
            stats,
        }
    }

    /// Bind an SSRC to this stage. Only registered streams are grouped;
    /// anything else is a lookup miss.
    pub fn add_rtp_receiver(&self, ssrc: u32, media_type: MediaType) {
        if let Ok(mut assemblers) = self.assemblers.lock() {
            assemblers.insert(
                ssrc,
                FrameAssembler {
                    collect_until_marker: media_type == MediaType::Video,
                    pending: Vec::new(),
                },
            );
        }
    }

    /// Remember the negotiated transport-wide-cc extension id. First call
    /// wins; feedback is enabled at most once per session.
    pub fn enable_transport_cc_feedback(&self, extension_id: u8) {
        if let Ok(mut slot) = self.transport_cc_ext_id.lock() {
            match *slot {
                Some(active) => {
                    debug!(
                        "[RtpRtcp] transport-cc feedback already active (ext id {active}), \
                         ignoring ext id {extension_id}"
                    );
                }
                None => {
                    debug!("[RtpRtcp] transport-cc feedback enabled, ext id {extension_id}");
                    *slot = Some(extension_id);
                }
            }
        }
    }

    pub fn is_transport_cc_feedback_enabled(&self) -> bool {
        self.transport_cc_ext_id
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn transport_cc_extension_id(&self) -> Option<u8> {
        self.transport_cc_ext_id.lock().ok().and_then(|slot| *slot)
    }

    /// Entry point for decrypted datagrams coming up the chain.
    pub(crate) fn receive(&self, data: Vec<u8>) {
        if is_rtcp(&data) {
            match RtcpPacket::decode_compound(&data) {
                Ok(packets) => {
                    for packet in packets {
                        self.observer.on_rtcp_received(packet);
                    }
                }
                Err(e) => {
                    self.stats.inc_parse_drops();
                    debug!("[RtpRtcp] rtcp decode failed: {e}");
                }
            }
            return;
        }

        match RtpPacket::decode(&data) {
            Ok(packet) => self.group_rtp(packet),
            Err(e) => {
                self.stats.inc_parse_drops();
                debug!("[RtpRtcp] rtp decode failed: {e}");
            }
        }
    }

    /// Accumulate one packet; emit a batch to the observer when a frame
    /// boundary is reached. Arrival order is preserved, duplicates are
    /// not filtered (that is the depacketizer's call).
    fn group_rtp(&self, packet: RtpPacket) {
        let ssrc = packet.ssrc();
        let batch = {
            let Ok(mut assemblers) = self.assemblers.lock() else {
                return;
            };
            let Some(assembler) = assemblers.get_mut(&ssrc) else {
                self.stats.inc_unknown_ssrc_drops();
                debug!("[RtpRtcp] packet for unknown ssrc({ssrc:#010x}) dropped");
                return;
            };

            if !assembler.collect_until_marker {
                Some(vec![packet])
            } else {
                if let Some(first) = assembler.pending.first() {
                    if first.timestamp() != packet.timestamp() {
                        // The previous frame never saw its marker; its
                        // packets cannot become a complete access unit.
                        self.stats.inc_partial_frame_drops();
                        debug!(
                            "[RtpRtcp] discarding partial frame ssrc({ssrc:#010x}) ts({})",
                            first.timestamp()
                        );
                        assembler.pending.clear();
                    }
                }

                let marker = packet.marker();
                assembler.pending.push(packet);

                if marker {
                    Some(std::mem::take(&mut assembler.pending))
                } else if assembler.pending.len() > MAX_PACKETS_PER_ACCESS_UNIT {
                    self.stats.inc_partial_frame_drops();
                    debug!("[RtpRtcp] runaway frame ssrc({ssrc:#010x}) dropped");
                    assembler.pending.clear();
                    None
                } else {
                    None
                }
            }
        };

        // Observer work happens outside the assembler lock.
        if let Some(batch) = batch {
            self.observer.on_rtp_frame_received(batch);
        }
    }
}

/// RTP/RTCP demux on the first two bytes (RFC 5761 §4).
#[inline]
fn is_rtcp(pkt: &[u8]) -> bool {
    if pkt.len() < 4 {
        return false;
    }
    if pkt[0] >> 6 != 2 {
        return false;
    }
    matches!(pkt[1], 200..=206)
}
