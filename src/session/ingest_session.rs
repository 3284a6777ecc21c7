//! The ingest orchestrator. Negotiates tracks from a pair of parsed
//! session descriptions, wires the node chain, and owns everything the
//! receive path consults per frame: the track set, the depacketizer
//! registry and the clock synchronizer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, OnceLock, RwLock, Weak};
use std::time::Instant;

use bytes::Bytes;
use log::{debug, error, info, warn};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

use crate::constants::KEYFRAME_REQUEST_COOLDOWN;
use crate::depacketizer::Depacketizer;
use crate::node::{FramingStage, NodeChain, RtpRtcpObserver, SecurityTransform, TransportSession};
use crate::rtcp::RtcpPacket;
use crate::rtcp::full_intra_request::FullIntraRequest;
use crate::rtcp::packet_type::RtcpPacketType;
use crate::rtp::RtpPacket;
use crate::sync::RtpClockSynchronizer;
use crate::track::{
    AudioChannelLayout, BitstreamFormat, MediaCodecId, MediaTrack, MediaType, PacketStructure,
    SharedClock,
};

use super::ingest_error::IngestError;
use super::media_description::{MediaLineDescription, PayloadDescription, SessionDescription};
use super::media_frame::MediaFrame;
use super::stats::{IngestStats, IngestStatsSnapshot};

/// Shared state between the session facade and the framing-stage
/// callbacks. The chain reference is weak: the chain already holds this
/// object through its observer edge.
struct IngestCore {
    session_key: String,
    tracks: Mutex<HashMap<u32, MediaTrack>>,
    depacketizers: Mutex<HashMap<u32, Depacketizer>>,
    synchronizer: RtpClockSynchronizer,
    stats: Arc<IngestStats>,
    sink: Sender<MediaFrame>,
    clock: SharedClock,
    chain: OnceLock<Weak<NodeChain>>,
    local_feedback_ssrc: u32,
    fir_seq: AtomicU8,
    last_fir_at: Mutex<Option<Instant>>,
    h264_extradata: Mutex<Option<Vec<u8>>>,
}

/// One live ingest session over an already-connected transport.
pub struct IngestSession {
    session_key: String,
    /// Guards start/stop against the data plane: writers transition the
    /// chain, readers move data. No frame is processed mid-transition.
    lifecycle: RwLock<()>,
    chain: Arc<NodeChain>,
    core: Arc<IngestCore>,
    transport: Arc<dyn TransportSession>,
    transport_released: AtomicBool,
}

impl IngestSession {
    /// Negotiate tracks and build the wired (but not yet started) chain.
    /// Any negotiation failure aborts construction; no partial pipeline
    /// is left behind.
    pub fn new(
        local_description: &SessionDescription,
        peer_description: &SessionDescription,
        transport: Arc<dyn TransportSession>,
        srtp_transform: Box<dyn SecurityTransform>,
        dtls_transform: Box<dyn SecurityTransform>,
        frame_sink: Sender<MediaFrame>,
        clock: SharedClock,
    ) -> Result<Self, IngestError> {
        let session_key: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();

        // RFC 3264: each local m= line must have a peer counterpart.
        if local_description.media.len() != peer_description.media.len() {
            error!(
                "[Ingest:{session_key}] m= line of peer does not correspond with local"
            );
            return Err(IngestError::MediaLineCountMismatch {
                local: local_description.media.len(),
                peer: peer_description.media.len(),
            });
        }

        let stats = Arc::new(IngestStats::new());
        let core = Arc::new(IngestCore {
            session_key: session_key.clone(),
            tracks: Mutex::new(HashMap::new()),
            depacketizers: Mutex::new(HashMap::new()),
            synchronizer: RtpClockSynchronizer::new(),
            stats: stats.clone(),
            sink: frame_sink,
            clock: clock.clone(),
            chain: OnceLock::new(),
            local_feedback_ssrc: OsRng.next_u32(),
            fir_seq: AtomicU8::new(0),
            last_fir_at: Mutex::new(None),
            h264_extradata: Mutex::new(None),
        });

        let observer: Arc<dyn RtpRtcpObserver> = core.clone();
        let framing = FramingStage::new(observer, stats);

        for (index, peer_media) in peer_description.media.iter().enumerate() {
            if !peer_media.direction.peer_sends() {
                debug!(
                    "[Ingest:{session_key}] media ({}) is inactive",
                    peer_media.kind
                );
                continue;
            }
            if peer_media.kind == MediaType::Data {
                // data channels ride SCTP, not this pipeline
                debug!("[Ingest:{session_key}] skipping data media line {index}");
                continue;
            }

            let first_payload = match peer_media.first_payload() {
                Some(payload) => payload,
                None => {
                    error!(
                        "[Ingest:{session_key}] failed to get the first payload type \
                         of media line {index}"
                    );
                    return Err(IngestError::MissingPayload { line: index });
                }
            };

            let track = match peer_media.kind {
                MediaType::Audio => {
                    negotiate_audio_track(peer_media, first_payload, &session_key, clock.clone())?
                }
                MediaType::Video => {
                    let (track, extradata) =
                        negotiate_video_track(peer_media, first_payload, &session_key, clock.clone())?;
                    if extradata.is_some() {
                        let mut slot = core
                            .h264_extradata
                            .lock()
                            .map_err(|_| IngestError::LockPoisoned)?;
                        *slot = extradata;
                    }
                    track
                }
                MediaType::Data => unreachable!("data lines skipped above"),
            };

            let ssrc = track.id();
            let depacketizer = Depacketizer::for_codec(track.codec_id()).ok_or_else(|| {
                error!(
                    "[Ingest:{session_key}] could not create depacketizer: codec({})",
                    track.codec_id()
                );
                IngestError::DepacketizerUnavailable {
                    codec: track.codec_id().to_string(),
                }
            })?;

            core.depacketizers
                .lock()
                .map_err(|_| IngestError::LockPoisoned)?
                .insert(ssrc, depacketizer);
            framing.add_rtp_receiver(ssrc, track.media_type());
            core.synchronizer.register_clock(ssrc, first_payload.clock_rate);

            if !framing.is_transport_cc_feedback_enabled()
                && first_payload.has_feedback("transport-cc")
            {
                if let Some(entry) = peer_media.find_extmap("transport-wide-cc-extensions") {
                    framing.enable_transport_cc_feedback(entry.id);
                }
            }

            info!("[Ingest:{session_key}] {}", track.info_string());
            core.tracks
                .lock()
                .map_err(|_| IngestError::LockPoisoned)?
                .insert(ssrc, track);
        }

        let chain = Arc::new(NodeChain::new(
            framing,
            srtp_transform,
            dtls_transform,
            transport.clone(),
        ));
        let _ = core.chain.set(Arc::downgrade(&chain));

        Ok(Self {
            session_key,
            lifecycle: RwLock::new(()),
            chain,
            core,
            transport,
            transport_released: AtomicBool::new(false),
        })
    }

    /// Start every node. Data is accepted only once this returns. A
    /// second start without an intervening stop is rejected and leaves
    /// the running chain untouched.
    pub fn start(&self) -> Result<(), IngestError> {
        let _guard = self.lifecycle.write().map_err(|_| IngestError::LockPoisoned)?;
        self.chain.start()?;
        if let Ok(mut last) = self.core.last_fir_at.lock() {
            *last = Some(self.core.clock.now());
        }
        info!("[Ingest:{}] session started", self.session_key);
        Ok(())
    }

    /// Stop the chain and release the transport handle. Idempotent, and
    /// safe to call on a session that never started; the handle is
    /// released exactly once across all calls.
    pub fn stop(&self) {
        let _guard = match self.lifecycle.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.chain.stop();
        if !self.transport_released.swap(true, Ordering::SeqCst) {
            self.transport.disconnect();
            debug!("[Ingest:{}] transport session released", self.session_key);
        }
    }

    /// Entry point for datagrams from the transport. Runs on whichever
    /// thread the transport delivers on; concurrent calls are fine.
    pub fn on_transport_data(&self, data: &[u8]) -> bool {
        // Must not overlap a start/stop transition.
        let Ok(_guard) = self.lifecycle.read() else {
            return false;
        };
        self.chain.receive_from_transport(data.to_vec())
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn stats(&self) -> IngestStatsSnapshot {
        self.core.stats.snapshot()
    }

    /// Snapshot of a negotiated track's current state.
    pub fn track(&self, ssrc: u32) -> Option<MediaTrack> {
        self.core.tracks.lock().ok()?.get(&ssrc).cloned()
    }

    pub fn is_transport_cc_feedback_enabled(&self) -> bool {
        self.chain
            .framing()
            .is_some_and(FramingStage::is_transport_cc_feedback_enabled)
    }
}

impl Drop for IngestSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl IngestCore {
    fn emit(&self, track: &mut MediaTrack, frame: MediaFrame) {
        track.on_frame_added(frame.payload.len(), frame.key_frame);
        self.stats.add_frame_emitted(frame.payload.len());
        if self.sink.send(frame).is_err() {
            debug!("[Ingest:{}] frame sink is gone, frame dropped", self.session_key);
        }
    }

    /// Shared per-session cooldown; a due check also arms the next window.
    fn keyframe_request_due(&self) -> bool {
        let Ok(mut last) = self.last_fir_at.lock() else {
            return false;
        };
        let now = self.clock.now();
        match *last {
            Some(at) if now.duration_since(at) < KEYFRAME_REQUEST_COOLDOWN => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Push a FIR for `media_ssrc` down the chain.
    fn send_keyframe_request(&self, media_ssrc: u32) {
        let seq_no = self.fir_seq.fetch_add(1, Ordering::Relaxed);
        let fir = FullIntraRequest::single(self.local_feedback_ssrc, media_ssrc, seq_no);
        let mut buf = Vec::new();
        if fir.encode_into(&mut buf).is_err() {
            return;
        }
        let Some(chain) = self.chain.get().and_then(Weak::upgrade) else {
            return;
        };
        if chain.send_toward_transport(buf) {
            debug!(
                "[Ingest:{}] tx sent FIR media_ssrc({media_ssrc:#010x})",
                self.session_key
            );
        }
    }
}

impl RtpRtcpObserver for IngestCore {
    fn on_rtp_frame_received(&self, packets: Vec<RtpPacket>) {
        let Some(first) = packets.first() else {
            return;
        };
        let ssrc = first.ssrc();
        let rtp_timestamp = first.timestamp();

        let Ok(mut tracks) = self.tracks.lock() else {
            return;
        };
        let Some(track) = tracks.get_mut(&ssrc) else {
            self.stats.inc_unknown_ssrc_drops();
            debug!(
                "[Ingest:{}] could not find track: ssrc({ssrc:#010x})",
                self.session_key
            );
            return;
        };
        let Ok(mut depacketizers) = self.depacketizers.lock() else {
            return;
        };
        let Some(depacketizer) = depacketizers.get_mut(&ssrc) else {
            self.stats.inc_unknown_ssrc_drops();
            debug!(
                "[Ingest:{}] could not find depacketizer: ssrc({ssrc:#010x})",
                self.session_key
            );
            return;
        };

        let payloads: Vec<&[u8]> = packets.iter().map(|p| p.payload.as_slice()).collect();
        let assembled = match depacketizer.assemble(&payloads) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.inc_depacketize_failures();
                debug!(
                    "[Ingest:{}] could not depacketize frame: ssrc({ssrc:#010x}): {e}",
                    self.session_key
                );
                return;
            }
        };

        let (bitstream_format, packet_structure) = match track.codec_id() {
            // the H264 depacketizer always renders Annex-B
            MediaCodecId::H264 => (BitstreamFormat::H264AnnexB, PacketStructure::Nalu),
            MediaCodecId::Opus | MediaCodecId::Multiopus => {
                (BitstreamFormat::Opus, PacketStructure::Raw)
            }
            MediaCodecId::Vp8 => (BitstreamFormat::Vp8, PacketStructure::Raw),
            MediaCodecId::Aac => (BitstreamFormat::AacRaw, PacketStructure::Raw),
            // negotiation never admits the rest
            _ => return,
        };

        self.stats.add_frame_received(assembled.payload.len());

        let Some(pts) = self.synchronizer.adjust_timestamp(ssrc, rtp_timestamp) else {
            // Withheld, but the byte accounting stays live so the stream
            // is not mistaken for idle while the first SR is pending.
            self.stats.inc_frames_awaiting_sync();
            debug!(
                "[Ingest:{}] not yet received sr packet: ssrc({ssrc:#010x})",
                self.session_key
            );
            return;
        };

        // Parameter sets stashed at negotiation go out once, ahead of the
        // first synchronized video frame. Most browsers also repeat them
        // in-band, so duplicates downstream are expected and harmless.
        if track.codec_id() == MediaCodecId::H264 {
            if let Ok(mut extradata) = self.h264_extradata.lock() {
                if let Some(nalu) = extradata.take() {
                    let config_frame = MediaFrame {
                        track_id: track.id(),
                        media_type: track.media_type(),
                        pts,
                        dts: pts,
                        bitstream_format,
                        packet_structure,
                        key_frame: false,
                        payload: Bytes::from(nalu),
                    };
                    self.emit(track, config_frame);
                }
            }
        }

        debug!(
            "[Ingest:{}] send frame: track({}) codec({}) format({bitstream_format}) \
             structure({packet_structure}) bytes({}) pts({pts})",
            self.session_key,
            track.id(),
            track.codec_id(),
            assembled.payload.len(),
        );
        let frame = MediaFrame {
            track_id: track.id(),
            media_type: track.media_type(),
            pts,
            dts: pts,
            bitstream_format,
            packet_structure,
            key_frame: assembled.key_frame,
            payload: Bytes::from(assembled.payload),
        };
        let is_video = track.media_type() == MediaType::Video;
        self.emit(track, frame);

        // Keep the keyframe interval short for downstream packagers.
        if is_video && self.keyframe_request_due() {
            self.send_keyframe_request(ssrc);
        }
    }

    fn on_rtcp_received(&self, packet: RtcpPacket) {
        match packet {
            RtcpPacket::Sr(sr) => {
                self.synchronizer.update_sender_report(
                    sr.ssrc,
                    sr.info.ntp_msw,
                    sr.info.ntp_lsw,
                    sr.info.rtp_ts,
                );
            }
            RtcpPacket::Bye(bye) => {
                debug!(
                    "[Ingest:{}] rx BYE for {} source(s)",
                    self.session_key,
                    bye.sources.len()
                );
            }
            RtcpPacket::Rr(_) | RtcpPacket::Sdes(_) | RtcpPacket::Fir(_) => {}
        }
    }
}

fn negotiate_audio_track(
    media: &MediaLineDescription,
    payload: &PayloadDescription,
    session_key: &str,
    clock: SharedClock,
) -> Result<MediaTrack, IngestError> {
    let mut track = MediaTrack::new(MediaType::Audio, clock);
    track.set_id(media.ssrc);

    // a=rtpmap:111 opus/48000/2
    match payload.codec.to_ascii_lowercase().as_str() {
        "opus" => {
            track.set_codec_id(MediaCodecId::Opus);
            track.set_origin_bitstream(BitstreamFormat::OpusRtpRfc7587);
        }
        "multiopus" => {
            track.set_codec_id(MediaCodecId::Multiopus);
            track.set_origin_bitstream(BitstreamFormat::OpusRtpRfc7587);
        }
        "mpeg4-generic" => {
            track.set_codec_id(MediaCodecId::Aac);
            track.set_origin_bitstream(BitstreamFormat::AacMpeg4Generic);
        }
        _ => {
            error!(
                "[Ingest:{session_key}] unsupported audio codec: {}",
                payload.codec
            );
            return Err(IngestError::UnsupportedCodec {
                codec: payload.codec.clone(),
            });
        }
    }

    track.set_time_base(1, payload.clock_rate as i32);
    track.set_sample_rate(payload.clock_rate as i32);

    let channels = payload.channels.unwrap_or(0);
    match channels {
        1 => track.set_channel_layout(AudioChannelLayout::Mono),
        2 => track.set_channel_layout(AudioChannelLayout::Stereo),
        other => {
            warn!(
                "[Ingest:{session_key}] unsupported number of channels {other}, \
                 setting audio track as stereo"
            );
            track.set_channel_layout(AudioChannelLayout::Stereo);
        }
    }

    Ok(track)
}

fn negotiate_video_track(
    media: &MediaLineDescription,
    payload: &PayloadDescription,
    session_key: &str,
    clock: SharedClock,
) -> Result<(MediaTrack, Option<Vec<u8>>), IngestError> {
    let mut track = MediaTrack::new(MediaType::Video, clock);
    track.set_id(media.ssrc);
    let mut extradata = None;

    // a=rtpmap:100 H264/90000
    match payload.codec.to_ascii_lowercase().as_str() {
        "h264" => {
            track.set_codec_id(MediaCodecId::H264);
            track.set_origin_bitstream(BitstreamFormat::H264RtpRfc6184);
            extradata = payload.h264_extradata.clone();
        }
        "vp8" => {
            track.set_codec_id(MediaCodecId::Vp8);
            track.set_origin_bitstream(BitstreamFormat::Vp8RtpRfc7741);
        }
        _ => {
            error!(
                "[Ingest:{session_key}] unsupported video codec: {}",
                payload.codec
            );
            return Err(IngestError::UnsupportedCodec {
                codec: payload.codec.clone(),
            });
        }
    }

    track.set_time_base(1, payload.clock_rate as i32);

    Ok((track, extradata))
}
