/*!
    Audio/video latency compensation.
*/

use std::sync::OnceLock;
use std::time::Duration;

use media_types::duration_to_micros;

/**
    Delay applied to video so it lines up with audio the listener hears.

    Audio sits in output buffers for a while before it becomes audible. The
    first audio sink opened in a session calibrates this offset from its
    buffer depth; later sinks do not change it. Video timestamps are pushed
    back by the offset before they are queued.
*/
#[derive(Debug, Default)]
pub struct LatencyCompensator {
    offset: OnceLock<i64>,
}

impl LatencyCompensator {
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Set the offset from an audio sink's buffered latency.

        Returns false if the offset was already calibrated.
    */
    pub fn calibrate(&self, latency: Duration) -> bool {
        self.offset.set(duration_to_micros(latency)).is_ok()
    }

    /**
        Latency of `buffered_frames` sample frames at `sample_rate`.
    */
    pub fn latency_of(buffered_frames: usize, sample_rate: u32) -> Duration {
        if sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(buffered_frames as u64 * 1_000_000 / sample_rate as u64)
    }

    pub fn is_calibrated(&self) -> bool {
        self.offset.get().is_some()
    }

    /**
        Current offset in µs, zero until calibrated.
    */
    pub fn offset_micros(&self) -> i64 {
        self.offset.get().copied().unwrap_or(0)
    }

    /**
        Shift a video timestamp (µs) by the offset.
    */
    pub fn apply(&self, timestamp: i64) -> i64 {
        timestamp.saturating_add(self.offset_micros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncalibrated_is_identity() {
        let latency = LatencyCompensator::new();
        assert!(!latency.is_calibrated());
        assert_eq!(latency.apply(40_000), 40_000);
    }

    #[test]
    fn first_calibration_wins() {
        let latency = LatencyCompensator::new();
        assert!(latency.calibrate(Duration::from_millis(250)));
        assert!(!latency.calibrate(Duration::from_millis(10)));
        assert_eq!(latency.offset_micros(), 250_000);
        assert_eq!(latency.apply(1_000_000), 1_250_000);
    }

    #[test]
    fn latency_from_buffer_depth() {
        assert_eq!(
            LatencyCompensator::latency_of(4_410, 44_100),
            Duration::from_millis(100)
        );
        assert_eq!(LatencyCompensator::latency_of(1_024, 0), Duration::ZERO);
    }
}
