//! One negotiated elementary stream: codec identity, timing, measured
//! quality and the validity latch the rest of the pipeline keys off.

use std::time::{Duration, Instant};

use bytes::Bytes;

use super::channel_layout::AudioChannelLayout;
use super::clock::SharedClock;
use super::codec::{BitstreamFormat, MediaCodecId, MediaType};
use super::timebase::Timebase;
use crate::constants::QUALITY_MEASUREMENT_WINDOW;

/// Sample rate every (multi)Opus track must carry (RFC 7587 §4.1).
const OPUS_MANDATED_SAMPLE_RATE: i32 = 48_000;

/// Track descriptor, one per accepted media line.
///
/// Configured values always win over measured ones: every getter with a
/// `*_by_config` sibling prefers the configured field when it is set.
/// `Clone` yields an independent snapshot; the copy keeps the counter
/// values but never shares measurement state with the original.
#[derive(Clone)]
pub struct MediaTrack {
    id: u32,
    media_type: MediaType,
    codec_id: MediaCodecId,
    origin_bitstream_format: BitstreamFormat,
    time_base: Timebase,

    bitrate: i32,
    bitrate_conf: i32,
    bypass: bool,

    // Video
    framerate: f64,
    framerate_conf: f64,
    width: i32,
    width_conf: i32,
    height: i32,
    height_conf: i32,
    key_frame_interval: i32,
    key_frame_interval_count: i64,

    // Audio
    channel_layout: AudioChannelLayout,
    sample_rate: i32,

    decoder_configuration_record: Option<Bytes>,

    // One-way latches; see `is_valid` / `has_quality_measured`.
    is_valid: bool,
    has_quality_measured: bool,

    total_frame_count: i64,
    total_frame_bytes: i64,
    clock: SharedClock,
    measurement_window: Duration,
    first_frame_at: Option<Instant>,
}

impl MediaTrack {
    pub fn new(media_type: MediaType, clock: SharedClock) -> Self {
        Self {
            id: 0,
            media_type,
            codec_id: MediaCodecId::None,
            origin_bitstream_format: BitstreamFormat::Unknown,
            time_base: Timebase::default(),
            bitrate: 0,
            bitrate_conf: 0,
            bypass: false,
            framerate: 0.0,
            framerate_conf: 0.0,
            width: 0,
            width_conf: 0,
            height: 0,
            height_conf: 0,
            key_frame_interval: 0,
            key_frame_interval_count: 0,
            channel_layout: AudioChannelLayout::Unknown,
            sample_rate: 0,
            decoder_configuration_record: None,
            is_valid: false,
            has_quality_measured: false,
            total_frame_count: 0,
            total_frame_bytes: 0,
            clock,
            measurement_window: QUALITY_MEASUREMENT_WINDOW,
            first_frame_at: None,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn codec_id(&self) -> MediaCodecId {
        self.codec_id
    }

    pub fn set_codec_id(&mut self, id: MediaCodecId) {
        self.codec_id = id;
    }

    pub fn origin_bitstream(&self) -> BitstreamFormat {
        self.origin_bitstream_format
    }

    pub fn set_origin_bitstream(&mut self, format: BitstreamFormat) {
        self.origin_bitstream_format = format;
    }

    pub fn time_base(&self) -> Timebase {
        self.time_base
    }

    pub fn set_time_base(&mut self, num: i32, den: i32) {
        self.time_base = Timebase::new(num, den);
    }

    pub fn is_bypass(&self) -> bool {
        self.bypass
    }

    pub fn set_bypass(&mut self, flag: bool) {
        self.bypass = flag;
    }

    /// Override the default quality-measurement window.
    pub fn set_measurement_window(&mut self, window: Duration) {
        self.measurement_window = window;
    }

    // --- configured-over-measured getters ---

    pub fn bitrate(&self) -> i32 {
        if self.bitrate_conf > 0 {
            return self.bitrate_conf;
        }
        self.bitrate
    }

    pub fn bitrate_by_measured(&self) -> i32 {
        self.bitrate
    }

    pub fn set_bitrate_by_measured(&mut self, bitrate: i32) {
        self.bitrate = bitrate;
    }

    pub fn bitrate_by_config(&self) -> i32 {
        self.bitrate_conf
    }

    pub fn set_bitrate_by_config(&mut self, bitrate: i32) {
        self.bitrate_conf = bitrate;
    }

    pub fn framerate(&self) -> f64 {
        if self.framerate_conf > 0.0 {
            return self.framerate_conf;
        }
        self.framerate
    }

    pub fn framerate_by_measured(&self) -> f64 {
        self.framerate
    }

    pub fn set_framerate_by_measured(&mut self, framerate: f64) {
        self.framerate = framerate;
    }

    pub fn set_framerate_by_config(&mut self, framerate: f64) {
        self.framerate_conf = framerate;
    }

    pub fn width(&self) -> i32 {
        if self.width_conf > 0 {
            return self.width_conf;
        }
        self.width
    }

    pub fn set_width_by_measured(&mut self, width: i32) {
        self.width = width;
    }

    pub fn set_width_by_config(&mut self, width: i32) {
        self.width_conf = width;
    }

    pub fn height(&self) -> i32 {
        if self.height_conf > 0 {
            return self.height_conf;
        }
        self.height
    }

    pub fn set_height_by_measured(&mut self, height: i32) {
        self.height = height;
    }

    pub fn set_height_by_config(&mut self, height: i32) {
        self.height_conf = height;
    }

    /// Frames between the two most recent key frames (measured).
    pub fn key_frame_interval(&self) -> i32 {
        self.key_frame_interval
    }

    pub fn channel_layout(&self) -> AudioChannelLayout {
        self.channel_layout
    }

    pub fn set_channel_layout(&mut self, layout: AudioChannelLayout) {
        self.channel_layout = layout;
    }

    pub fn sample_rate(&self) -> i32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, rate: i32) {
        self.sample_rate = rate;
    }

    pub fn decoder_configuration_record(&self) -> Option<&Bytes> {
        self.decoder_configuration_record.as_ref()
    }

    pub fn set_decoder_configuration_record(&mut self, dcr: Bytes) {
        self.decoder_configuration_record = Some(dcr);
    }

    pub fn total_frame_count(&self) -> i64 {
        self.total_frame_count
    }

    pub fn total_frame_bytes(&self) -> i64 {
        self.total_frame_bytes
    }

    /// Whether the track carries everything a decoder needs. One-way:
    /// once a track has been complete, later field churn cannot make it
    /// incomplete again.
    pub fn is_valid(&mut self) -> bool {
        if self.is_valid {
            return true;
        }

        // data tracks carry no decodable payload, nothing to wait for
        if self.media_type == MediaType::Data {
            self.is_valid = true;
            return true;
        }

        let complete = match self.codec_id {
            MediaCodecId::H264 | MediaCodecId::H265 => {
                self.width() > 0
                    && self.height() > 0
                    && self.time_base.is_positive()
                    && self.decoder_configuration_record.is_some()
            }
            MediaCodecId::Vp8
            | MediaCodecId::Vp9
            | MediaCodecId::Jpeg
            | MediaCodecId::Png => {
                self.width() > 0 && self.height() > 0 && self.time_base.is_positive()
            }
            MediaCodecId::Aac => {
                self.time_base.is_positive()
                    && self.channel_layout.count() > 0
                    && self.channel_layout.is_known()
                    && self.decoder_configuration_record.is_some()
            }
            MediaCodecId::Opus | MediaCodecId::Multiopus => {
                self.time_base.is_positive()
                    && self.channel_layout.count() > 0
                    && self.channel_layout.is_known()
                    && self.sample_rate == OPUS_MANDATED_SAMPLE_RATE
            }
            MediaCodecId::Mp3 => {
                self.time_base.is_positive()
                    && self.channel_layout.count() > 0
                    && self.channel_layout.is_known()
            }
            MediaCodecId::None => false,
        };

        if complete {
            self.is_valid = true;
        }
        self.is_valid
    }

    /// Whether enough traffic has been observed to trust the measured
    /// quality numbers. One-way latch, independent of `is_valid`.
    pub fn has_quality_measured(&mut self) -> bool {
        if self.has_quality_measured {
            return true;
        }

        match self.media_type {
            MediaType::Video => {
                if self.bitrate > 0 && self.framerate > 0.0 {
                    self.has_quality_measured = true;
                }
            }
            MediaType::Audio => {
                if self.bitrate > 0 {
                    self.has_quality_measured = true;
                }
            }
            MediaType::Data => {
                self.has_quality_measured = true;
            }
        }

        self.has_quality_measured
    }

    /// Measurement feed, called once per accepted frame in arrival order.
    pub fn on_frame_added(&mut self, payload_bytes: usize, key_frame: bool) {
        let now = self.clock.now();
        let started_at = *self.first_frame_at.get_or_insert(now);

        self.total_frame_count += 1;
        self.total_frame_bytes += payload_bytes as i64;

        let elapsed = now.duration_since(started_at);
        if elapsed >= self.measurement_window {
            let seconds = elapsed.as_secs_f64();
            let bits = self.total_frame_bytes as f64 * 8.0;
            self.set_bitrate_by_measured((bits / seconds) as i32);
            self.set_framerate_by_measured(self.total_frame_count as f64 / seconds);
        }

        if self.media_type == MediaType::Video {
            if key_frame {
                self.key_frame_interval = self.key_frame_interval_count as i32;
                self.key_frame_interval_count = 1;
            } else if self.key_frame_interval_count > 0 {
                self.key_frame_interval_count += 1;
            }
        }
    }

    /// One-line human description, used by session start logging.
    pub fn info_string(&self) -> String {
        match self.media_type {
            MediaType::Video => format!(
                "Video Track #{}: Codec({}{}) BSF({}) Resolution({}x{}) Framerate({:.2}fps) \
                 Bitrate({}bps) KeyInterval({}) timebase({})",
                self.id,
                self.codec_id,
                if self.bypass { ",Passthrough" } else { "" },
                self.origin_bitstream_format,
                self.width(),
                self.height(),
                self.framerate(),
                self.bitrate(),
                self.key_frame_interval,
                self.time_base,
            ),
            MediaType::Audio => format!(
                "Audio Track #{}: Codec({}{}) BSF({}) Samplerate({}) Channel({}, {}) \
                 Bitrate({}bps) timebase({})",
                self.id,
                self.codec_id,
                if self.bypass { ",Passthrough" } else { "" },
                self.origin_bitstream_format,
                self.sample_rate,
                self.channel_layout,
                self.channel_layout.count(),
                self.bitrate(),
                self.time_base,
            ),
            MediaType::Data => format!(
                "Data  Track #{}: Codec({}) BSF({}) timebase({})",
                self.id, self.codec_id, self.origin_bitstream_format, self.time_base,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::track::clock::ManualClock;

    fn manual_clock() -> (Arc<ManualClock>, SharedClock) {
        let clock = Arc::new(ManualClock::new());
        let shared: SharedClock = clock.clone();
        (clock, shared)
    }

    fn h264_track(clock: SharedClock) -> MediaTrack {
        let mut t = MediaTrack::new(MediaType::Video, clock);
        t.set_codec_id(MediaCodecId::H264);
        t.set_time_base(1, 90_000);
        t.set_width_by_measured(1280);
        t.set_height_by_measured(720);
        t.set_decoder_configuration_record(Bytes::from_static(&[0x01, 0x64]));
        t
    }

    fn opus_track(clock: SharedClock) -> MediaTrack {
        let mut t = MediaTrack::new(MediaType::Audio, clock);
        t.set_codec_id(MediaCodecId::Opus);
        t.set_time_base(1, 48_000);
        t.set_sample_rate(48_000);
        t.set_channel_layout(AudioChannelLayout::Stereo);
        t
    }

    #[test]
    fn h264_requires_configuration_record() {
        let (_, clock) = manual_clock();
        let mut t = h264_track(clock.clone());
        assert!(t.is_valid());

        let mut missing_dcr = MediaTrack::new(MediaType::Video, clock);
        missing_dcr.set_codec_id(MediaCodecId::H264);
        missing_dcr.set_time_base(1, 90_000);
        missing_dcr.set_width_by_measured(1280);
        missing_dcr.set_height_by_measured(720);
        assert!(!missing_dcr.is_valid());
    }

    #[test]
    fn h265_follows_the_h264_rules() {
        let (_, clock) = manual_clock();
        let mut t = MediaTrack::new(MediaType::Video, clock);
        t.set_codec_id(MediaCodecId::H265);
        t.set_time_base(1, 90_000);
        t.set_width_by_measured(1920);
        t.set_height_by_measured(1080);
        assert!(!t.is_valid());
        t.set_decoder_configuration_record(Bytes::from_static(&[0x01]));
        assert!(t.is_valid());
    }

    #[test]
    fn vp9_and_still_images_need_only_dimensions() {
        let (_, clock) = manual_clock();
        for codec in [MediaCodecId::Vp9, MediaCodecId::Jpeg, MediaCodecId::Png] {
            let mut t = MediaTrack::new(MediaType::Video, clock.clone());
            t.set_codec_id(codec);
            t.set_time_base(1, 90_000);
            t.set_width_by_measured(320);
            t.set_height_by_measured(240);
            assert!(t.is_valid(), "codec {codec} should be valid");
        }
    }

    #[test]
    fn vp8_is_valid_without_configuration_record() {
        let (_, clock) = manual_clock();
        let mut t = MediaTrack::new(MediaType::Video, clock);
        t.set_codec_id(MediaCodecId::Vp8);
        t.set_time_base(1, 90_000);
        assert!(!t.is_valid()); // no resolution yet
        t.set_width_by_measured(640);
        t.set_height_by_measured(480);
        assert!(t.is_valid());
    }

    #[test]
    fn aac_requires_layout_and_configuration_record() {
        let (_, clock) = manual_clock();
        let mut t = MediaTrack::new(MediaType::Audio, clock);
        t.set_codec_id(MediaCodecId::Aac);
        t.set_time_base(1, 44_100);
        t.set_channel_layout(AudioChannelLayout::FivePointOne);
        assert!(!t.is_valid());
        t.set_decoder_configuration_record(Bytes::from_static(&[0x12, 0x10]));
        assert!(t.is_valid());
    }

    #[test]
    fn opus_sample_rate_must_be_48k() {
        let (_, clock) = manual_clock();
        let mut t = opus_track(clock.clone());
        assert!(t.is_valid());

        let mut wrong_rate = opus_track(clock);
        wrong_rate.set_sample_rate(44_100);
        assert!(!wrong_rate.is_valid());
    }

    #[test]
    fn mp3_needs_only_layout_and_time_base() {
        let (_, clock) = manual_clock();
        let mut t = MediaTrack::new(MediaType::Audio, clock);
        t.set_codec_id(MediaCodecId::Mp3);
        t.set_time_base(1, 44_100);
        assert!(!t.is_valid());
        t.set_channel_layout(AudioChannelLayout::Mono);
        assert!(t.is_valid());
    }

    #[test]
    fn data_tracks_are_always_valid() {
        let (_, clock) = manual_clock();
        let mut t = MediaTrack::new(MediaType::Data, clock);
        assert!(t.is_valid());
        assert!(t.has_quality_measured());
    }

    #[test]
    fn validity_is_a_one_way_latch() {
        let (_, clock) = manual_clock();
        let mut t = h264_track(clock);
        assert!(t.is_valid());
        // Clearing a required field afterwards must not drop the latch.
        t.set_width_by_measured(0);
        t.set_time_base(0, 0);
        assert!(t.is_valid());
    }

    #[test]
    fn configured_bitrate_wins_regardless_of_order() {
        let (_, clock) = manual_clock();
        let mut t = opus_track(clock);

        t.set_bitrate_by_measured(64_000);
        t.set_bitrate_by_config(128_000);
        assert_eq!(t.bitrate(), 128_000);

        // reverse order on a fresh field
        t.set_bitrate_by_config(96_000);
        t.set_bitrate_by_measured(30_000);
        assert_eq!(t.bitrate(), 96_000);
        assert_eq!(t.bitrate_by_measured(), 30_000);
    }

    #[test]
    fn configured_framerate_and_resolution_win() {
        let (_, clock) = manual_clock();
        let mut t = h264_track(clock);
        t.set_framerate_by_measured(24.0);
        t.set_framerate_by_config(30.0);
        assert_eq!(t.framerate(), 30.0);

        t.set_width_by_config(1920);
        t.set_height_by_config(1080);
        assert_eq!(t.width(), 1920);
        assert_eq!(t.height(), 1080);
    }

    #[test]
    fn quality_measured_needs_framerate_for_video() {
        let (_, clock) = manual_clock();
        let mut t = h264_track(clock);
        assert!(!t.has_quality_measured());
        t.set_bitrate_by_measured(500_000);
        assert!(!t.has_quality_measured());
        t.set_framerate_by_measured(25.0);
        assert!(t.has_quality_measured());
    }

    #[test]
    fn measurement_derives_bitrate_and_framerate() {
        let (manual, clock) = manual_clock();
        let mut t = h264_track(clock);
        t.set_measurement_window(Duration::from_millis(1000));

        // 10 frames of 1000 bytes over exactly 2 seconds.
        for _ in 0..9 {
            t.on_frame_added(1000, false);
            manual.advance(Duration::from_millis(222));
        }
        manual.advance(Duration::from_millis(2));
        t.on_frame_added(1000, false);

        assert_eq!(t.total_frame_count(), 10);
        assert_eq!(t.total_frame_bytes(), 10_000);
        assert_eq!(t.bitrate_by_measured(), 40_000); // 10_000 * 8 / 2s
        assert_eq!(t.framerate_by_measured(), 5.0); // 10 / 2s
    }

    #[test]
    fn no_measurement_before_window_elapses() {
        let (manual, clock) = manual_clock();
        let mut t = opus_track(clock);
        t.on_frame_added(500, false);
        manual.advance(Duration::from_millis(200));
        t.on_frame_added(500, false);
        assert_eq!(t.bitrate_by_measured(), 0);
        assert!(!t.has_quality_measured());
    }

    #[test]
    fn key_frame_interval_counts_frames_between_keys() {
        let (_, clock) = manual_clock();
        let mut t = h264_track(clock);
        t.on_frame_added(100, true);
        t.on_frame_added(100, false);
        t.on_frame_added(100, false);
        t.on_frame_added(100, true);
        assert_eq!(t.key_frame_interval(), 3);
    }

    #[test]
    fn clone_is_an_independent_snapshot() {
        let (_, clock) = manual_clock();
        let mut t = opus_track(clock);
        t.on_frame_added(100, false);
        let snapshot = t.clone();
        t.on_frame_added(100, false);
        t.on_frame_added(100, false);

        assert_eq!(snapshot.total_frame_count(), 1);
        assert_eq!(t.total_frame_count(), 3);
    }
}
