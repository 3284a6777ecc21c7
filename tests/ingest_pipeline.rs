//! End-to-end pipeline scenarios: negotiation -> node chain -> framing ->
//! depacketization -> clock synchronization -> frame emission, driven
//! through the public session surface with a controllable clock.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, channel};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rtc_ingest::node::{PassthroughTransform, TransportSession};
use rtc_ingest::rtcp::RtcpPacket;
use rtc_ingest::rtcp::sender_info::SenderInfo;
use rtc_ingest::rtcp::sender_report::SenderReport;
use rtc_ingest::rtp::RtpPacket;
use rtc_ingest::session::{
    IngestSession, MediaDirection, MediaFrame, MediaLineDescription, PayloadDescription,
    SessionDescription,
};
use rtc_ingest::track::{
    BitstreamFormat, ManualClock, MediaType, PacketStructure, SharedClock,
};

const AUDIO_SSRC: u32 = 0x1111;
const VIDEO_SSRC: u32 = 0x2222;

// ---------- harness ----------

struct RecordingTransport {
    sent: Mutex<Vec<Vec<u8>>>,
    disconnects: AtomicUsize,
}

impl RecordingTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            disconnects: AtomicUsize::new(0),
        })
    }

    fn sent_fir_count(&self) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|pkt| pkt.len() >= 2 && pkt[0] & 0x1F == 4 && pkt[1] == 206)
            .count()
    }
}

impl TransportSession for RecordingTransport {
    fn send(&self, data: &[u8]) -> bool {
        self.sent.lock().unwrap().push(data.to_vec());
        true
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

fn audio_line() -> MediaLineDescription {
    MediaLineDescription {
        kind: MediaType::Audio,
        direction: MediaDirection::SendOnly,
        ssrc: AUDIO_SSRC,
        payloads: vec![PayloadDescription::new(111, "opus", 48_000).with_channels(2)],
        extmaps: Vec::new(),
    }
}

fn video_line(extradata: Option<Vec<u8>>) -> MediaLineDescription {
    let mut payload = PayloadDescription::new(100, "H264", 90_000);
    if let Some(extradata) = extradata {
        payload = payload.with_h264_extradata(extradata);
    }
    MediaLineDescription {
        kind: MediaType::Video,
        direction: MediaDirection::SendOnly,
        ssrc: VIDEO_SSRC,
        payloads: vec![payload],
        extmaps: Vec::new(),
    }
}

struct Harness {
    session: IngestSession,
    frames: Receiver<MediaFrame>,
    transport: Arc<RecordingTransport>,
    clock: Arc<ManualClock>,
}

fn start_session(video_extradata: Option<Vec<u8>>) -> Harness {
    let description = SessionDescription::new(vec![audio_line(), video_line(video_extradata)]);
    let (tx, rx) = channel();
    let transport = RecordingTransport::new();
    let clock = Arc::new(ManualClock::new());
    let shared: SharedClock = clock.clone();

    let session = IngestSession::new(
        &description,
        &description,
        transport.clone(),
        Box::new(PassthroughTransform),
        Box::new(PassthroughTransform),
        tx,
        shared,
    )
    .unwrap();
    session.start().unwrap();

    Harness {
        session,
        frames: rx,
        transport,
        clock,
    }
}

fn deliver_sender_report(session: &IngestSession, ssrc: u32, ntp_seconds: u32, rtp_ts: u32) {
    let sr = SenderReport::new(
        ssrc,
        SenderInfo {
            ntp_msw: ntp_seconds,
            ntp_lsw: 0,
            rtp_ts,
            packet_count: 0,
            octet_count: 0,
        },
        Vec::new(),
    );
    let wire = RtcpPacket::encode_compound(&[RtcpPacket::Sr(sr)]).unwrap();
    assert!(session.on_transport_data(&wire));
}

fn deliver_rtp(session: &IngestSession, pt: u8, ssrc: u32, seq: u16, ts: u32, marker: bool, payload: Vec<u8>) {
    let wire = RtpPacket::simple(pt, marker, seq, ts, ssrc, payload).encode();
    session.on_transport_data(&wire);
}

fn opus_payload(tag: u8) -> Vec<u8> {
    vec![0x78, tag, tag, tag]
}

fn h264_nalu(ntype: u8, len: usize) -> Vec<u8> {
    let mut v = vec![0x60 | ntype];
    v.extend(std::iter::repeat_n(0xAB, len));
    v
}

fn deliver_video_access_unit(session: &IngestSession, seq_start: u16, ts: u32, idr: bool) {
    let slice_type = if idr { 5 } else { 1 };
    deliver_rtp(session, 100, VIDEO_SSRC, seq_start, ts, false, h264_nalu(7, 6));
    deliver_rtp(session, 100, VIDEO_SSRC, seq_start + 1, ts, false, h264_nalu(8, 4));
    deliver_rtp(
        session,
        100,
        VIDEO_SSRC,
        seq_start + 2,
        ts,
        true,
        h264_nalu(slice_type, 40),
    );
}

// ---------- scenarios ----------

#[test]
fn audio_and_video_emit_one_frame_per_access_unit() {
    let h = start_session(None);

    deliver_sender_report(&h.session, AUDIO_SSRC, 100, 10_000);
    deliver_sender_report(&h.session, VIDEO_SSRC, 100, 90_000);

    // two audio access units, two video access units
    deliver_rtp(&h.session, 111, AUDIO_SSRC, 1, 10_000, false, opus_payload(1));
    deliver_rtp(&h.session, 111, AUDIO_SSRC, 2, 10_960, false, opus_payload(2));
    deliver_video_access_unit(&h.session, 1, 90_000, true);
    deliver_video_access_unit(&h.session, 4, 93_000, false);

    let frames: Vec<MediaFrame> = h.frames.try_iter().collect();
    let audio: Vec<&MediaFrame> = frames.iter().filter(|f| f.track_id == AUDIO_SSRC).collect();
    let video: Vec<&MediaFrame> = frames.iter().filter(|f| f.track_id == VIDEO_SSRC).collect();

    assert_eq!(audio.len(), 2);
    assert_eq!(video.len(), 2);

    for frame in &audio {
        assert_eq!(frame.media_type, MediaType::Audio);
        assert_eq!(frame.bitstream_format, BitstreamFormat::Opus);
        assert_eq!(frame.packet_structure, PacketStructure::Raw);
        assert_eq!(frame.pts, frame.dts);
    }
    for frame in &video {
        assert_eq!(frame.media_type, MediaType::Video);
        assert_eq!(frame.bitstream_format, BitstreamFormat::H264AnnexB);
        assert_eq!(frame.packet_structure, PacketStructure::Nalu);
        // Annex-B start code out front
        assert_eq!(&frame.payload[..4], &[0, 0, 0, 1]);
    }
    assert!(video[0].key_frame);
    assert!(!video[1].key_frame);

    // adjusted timestamps: NTP seconds * clock rate + delta from SR snapshot
    assert_eq!(audio[0].pts, 100 * 48_000);
    assert_eq!(audio[1].pts, 100 * 48_000 + 960);
    assert_eq!(video[0].pts, 100 * 90_000);
    assert_eq!(video[1].pts, 100 * 90_000 + 3_000);

    // per-track pts sequences are monotonically non-decreasing
    assert!(audio.windows(2).all(|w| w[0].pts <= w[1].pts));
    assert!(video.windows(2).all(|w| w[0].pts <= w[1].pts));

    let stats = h.session.stats();
    assert_eq!(stats.frames_emitted, 4);
    assert_eq!(stats.frames_awaiting_sync, 0);
}

#[test]
fn frames_before_sender_report_are_withheld_but_counted() {
    let h = start_session(None);

    deliver_rtp(&h.session, 111, AUDIO_SSRC, 1, 500, false, opus_payload(9));
    assert!(h.frames.try_iter().next().is_none());

    let stats = h.session.stats();
    assert_eq!(stats.frames_awaiting_sync, 1);
    assert_eq!(stats.frames_received, 1);
    assert_eq!(stats.bytes_received, 4);
    assert_eq!(stats.frames_emitted, 0);

    // the stream recovers on its own once the report arrives
    deliver_sender_report(&h.session, AUDIO_SSRC, 50, 500);
    deliver_rtp(&h.session, 111, AUDIO_SSRC, 2, 1460, false, opus_payload(9));
    let frame = h.frames.try_iter().next().unwrap();
    assert_eq!(frame.pts, 50 * 48_000 + 960);
}

#[test]
fn keyframe_requests_respect_the_shared_cooldown() {
    let h = start_session(None);
    deliver_sender_report(&h.session, VIDEO_SSRC, 10, 0);

    // a burst of frames right after start: cooldown still arming
    let mut seq = 0u16;
    let mut ts = 0u32;
    for _ in 0..5 {
        deliver_video_access_unit(&h.session, seq, ts, false);
        seq += 3;
        ts += 3_000;
    }
    assert_eq!(h.transport.sent_fir_count(), 0);

    // past the cooldown: exactly one request, no matter how many frames
    h.clock.advance(Duration::from_millis(3_100));
    for _ in 0..5 {
        deliver_video_access_unit(&h.session, seq, ts, false);
        seq += 3;
        ts += 3_000;
    }
    assert_eq!(h.transport.sent_fir_count(), 1);

    // and once more for the next window
    h.clock.advance(Duration::from_millis(3_100));
    deliver_video_access_unit(&h.session, seq, ts, false);
    assert_eq!(h.transport.sent_fir_count(), 2);
}

#[test]
fn h264_extradata_is_emitted_once_before_the_first_frame() {
    let extradata = vec![0, 0, 0, 1, 0x67, 0x42, 0, 0, 0, 1, 0x68, 0xCE];
    let h = start_session(Some(extradata.clone()));
    deliver_sender_report(&h.session, VIDEO_SSRC, 20, 0);

    deliver_video_access_unit(&h.session, 0, 0, true);
    deliver_video_access_unit(&h.session, 3, 3_000, false);

    let frames: Vec<MediaFrame> = h.frames.try_iter().collect();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].payload.as_ref(), extradata.as_slice());
    assert_eq!(frames[0].pts, frames[1].pts);
    assert_ne!(frames[1].payload.as_ref(), extradata.as_slice());
    assert_ne!(frames[2].payload.as_ref(), extradata.as_slice());
}

#[test]
fn malformed_and_unknown_traffic_is_absorbed() {
    let h = start_session(None);
    deliver_sender_report(&h.session, AUDIO_SSRC, 1, 0);

    // garbage datagram
    h.session.on_transport_data(&[0xDE, 0xAD, 0xBE, 0xEF]);
    // RTP for an SSRC nobody negotiated
    deliver_rtp(&h.session, 96, 0x9999, 1, 0, true, vec![1, 2, 3]);
    // a video frame that is only an FU-A continuation (no start)
    deliver_rtp(&h.session, 100, VIDEO_SSRC, 1, 0, true, vec![0x7C, 0x40]);
    // the session keeps emitting for known streams
    deliver_rtp(&h.session, 111, AUDIO_SSRC, 1, 0, false, opus_payload(1));

    assert_eq!(h.frames.try_iter().count(), 1);
    let stats = h.session.stats();
    assert_eq!(stats.parse_drops, 1);
    assert_eq!(stats.unknown_ssrc_drops, 1);
    assert_eq!(stats.depacketize_failures, 1);
}

#[test]
fn lifecycle_is_idempotent_and_releases_transport_once() {
    let h = start_session(None);
    deliver_sender_report(&h.session, AUDIO_SSRC, 1, 0);

    // a second start is rejected but does not tear the session down
    assert!(h.session.start().is_err());
    deliver_rtp(&h.session, 111, AUDIO_SSRC, 1, 0, false, opus_payload(1));
    assert_eq!(h.frames.try_iter().count(), 1);

    h.session.stop();
    // stopped: data is rejected without side effects
    deliver_rtp(&h.session, 111, AUDIO_SSRC, 2, 960, false, opus_payload(1));
    assert!(h.frames.try_iter().next().is_none());

    h.session.stop();
    assert_eq!(h.transport.disconnects.load(Ordering::SeqCst), 1);
}

#[test]
fn measurement_reaches_the_track_through_the_pipeline() {
    let h = start_session(None);
    deliver_sender_report(&h.session, AUDIO_SSRC, 1, 0);

    let mut ts = 0u32;
    for seq in 0..10u16 {
        deliver_rtp(&h.session, 111, AUDIO_SSRC, seq, ts, false, opus_payload(seq as u8));
        ts += 960;
        h.clock.advance(Duration::from_millis(200));
    }

    let mut track = h.session.track(AUDIO_SSRC).unwrap();
    assert_eq!(track.total_frame_count(), 10);
    assert_eq!(track.total_frame_bytes(), 40);
    assert!(track.bitrate_by_measured() > 0);
    assert!(track.has_quality_measured());
    assert!(track.is_valid());
}
