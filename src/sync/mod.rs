pub mod rtp_clock;

pub use rtp_clock::RtpClockSynchronizer;
