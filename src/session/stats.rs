//! Relaxed counters for the soft failure paths of the receive pipeline.
//! Dropped traffic is observable here instead of being logged as errors.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct IngestStats {
    parse_drops: AtomicU64,
    unknown_ssrc_drops: AtomicU64,
    depacketize_failures: AtomicU64,
    partial_frame_drops: AtomicU64,
    frames_awaiting_sync: AtomicU64,
    frames_received: AtomicU64,
    bytes_received: AtomicU64,
    frames_emitted: AtomicU64,
    bytes_emitted: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestStatsSnapshot {
    pub parse_drops: u64,
    pub unknown_ssrc_drops: u64,
    pub depacketize_failures: u64,
    pub partial_frame_drops: u64,
    pub frames_awaiting_sync: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
    pub frames_emitted: u64,
    pub bytes_emitted: u64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_parse_drops(&self) {
        self.parse_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unknown_ssrc_drops(&self) {
        self.unknown_ssrc_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_depacketize_failures(&self) {
        self.depacketize_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_partial_frame_drops(&self) {
        self.partial_frame_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_frames_awaiting_sync(&self) {
        self.frames_awaiting_sync.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_frame_received(&self, bytes: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn add_frame_emitted(&self, bytes: usize) {
        self.frames_emitted.fetch_add(1, Ordering::Relaxed);
        self.bytes_emitted.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            parse_drops: self.parse_drops.load(Ordering::Relaxed),
            unknown_ssrc_drops: self.unknown_ssrc_drops.load(Ordering::Relaxed),
            depacketize_failures: self.depacketize_failures.load(Ordering::Relaxed),
            partial_frame_drops: self.partial_frame_drops.load(Ordering::Relaxed),
            frames_awaiting_sync: self.frames_awaiting_sync.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_emitted: self.frames_emitted.load(Ordering::Relaxed),
            bytes_emitted: self.bytes_emitted.load(Ordering::Relaxed),
        }
    }
}
