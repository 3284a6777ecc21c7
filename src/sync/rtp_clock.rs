//! Correlates per-SSRC RTP timestamps with the sender's NTP wall clock.
//!
//! RTP timestamps are monotonic counters with a random epoch, in
//! codec-specific clock units; on their own they are neither comparable
//! across streams nor usable as presentation times. Each RTCP Sender
//! Report pins one (NTP, RTP timestamp) pair per stream; from then on a
//! frame timestamp is the reference's wall-clock ordinal plus the
//! wrap-aware distance from the reference RTP timestamp.
//!
//! Adjusted values stay in the track's own time-base units; consumers
//! divide by the time base to reach seconds.

use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;

/// The most recent Sender Report correlation point for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderClockReference {
    pub ntp_msw: u32,
    pub ntp_lsw: u32,
    pub rtp_timestamp: u32,
}

#[derive(Debug)]
struct RtpClock {
    clock_rate: u32,
    reference: Option<SenderClockReference>,
}

/// Per-SSRC clock table. Streams are registered at negotiation time and
/// read concurrently by the receive path afterwards.
#[derive(Debug, Default)]
pub struct RtpClockSynchronizer {
    clocks: Mutex<HashMap<u32, RtpClock>>,
}

impl RtpClockSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_clock(&self, ssrc: u32, clock_rate: u32) {
        if let Ok(mut clocks) = self.clocks.lock() {
            clocks.insert(
                ssrc,
                RtpClock {
                    clock_rate,
                    reference: None,
                },
            );
        }
    }

    /// Install a Sender Report as the stream's reference point.
    ///
    /// The newest report always wins, even when its RTP timestamp is
    /// older than the current reference: reordered reports are accepted
    /// as-is rather than filtered, trading drift rejection for
    /// simplicity.
    pub fn update_sender_report(&self, ssrc: u32, ntp_msw: u32, ntp_lsw: u32, rtp_timestamp: u32) {
        if let Ok(mut clocks) = self.clocks.lock() {
            match clocks.get_mut(&ssrc) {
                Some(clock) => {
                    clock.reference = Some(SenderClockReference {
                        ntp_msw,
                        ntp_lsw,
                        rtp_timestamp,
                    });
                }
                None => {
                    debug!("[Sync] sender report for unregistered ssrc({ssrc:#010x})");
                }
            }
        }
    }

    /// Presentation timestamp of a frame, in the stream's time-base
    /// units, or `None` while no Sender Report has been seen yet.
    pub fn adjust_timestamp(&self, ssrc: u32, rtp_timestamp: u32) -> Option<i64> {
        let clocks = self.clocks.lock().ok()?;
        let clock = clocks.get(&ssrc)?;
        let reference = clock.reference?;

        // Signed distance in modulo-2^32 space keeps wraparound continuous.
        let delta = rtp_timestamp.wrapping_sub(reference.rtp_timestamp) as i32;
        Some(ntp_to_units(reference.ntp_msw, reference.ntp_lsw, clock.clock_rate) + i64::from(delta))
    }
}

/// NTP time expressed as whole clock-rate units.
#[inline]
fn ntp_to_units(ntp_msw: u32, ntp_lsw: u32, clock_rate: u32) -> i64 {
    let seconds = i64::from(ntp_msw) * i64::from(clock_rate);
    let fraction = ((u64::from(ntp_lsw) * u64::from(clock_rate)) >> 32) as i64;
    seconds + fraction
}
