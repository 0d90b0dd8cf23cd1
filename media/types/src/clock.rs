/*!
    Session clock anchoring.
*/

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::timestamp::duration_to_micros;

/**
    The mapping between one wall-clock instant and one stream timestamp.

    Every later stream timestamp is translated into an expected wall-clock
    moment relative to this pair.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Origin {
    /// Wall-clock time at which the first item was processed.
    pub wall: Instant,
    /// Timestamp (µs) of that first item.
    pub stream: i64,
}

impl Origin {
    /**
        How far ahead (positive) or behind (negative) of the wall clock a
        stream timestamp is, in microseconds, as seen at `now`.
    */
    pub fn delta(&self, timestamp: i64, now: Instant) -> i64 {
        let stream_elapsed = timestamp.saturating_sub(self.stream);
        stream_elapsed.saturating_sub(signed_micros_between(self.wall, now))
    }

    /**
        Wall-clock moment at which `timestamp` is due.

        Timestamps before the stream origin map to the wall origin.
    */
    pub fn due_at(&self, timestamp: i64) -> Instant {
        let offset = timestamp.saturating_sub(self.stream).max(0) as u64;
        self.wall + Duration::from_micros(offset)
    }
}

/**
    Shared, set-once clock anchor for one playback session.

    All presentation queues of a session hold the same anchor. The first
    queue to process an item pins "stream time zero" to "wall time zero";
    every other queue then schedules against that same origin. Once set the
    origin never changes; a new session gets a new anchor.
*/
#[derive(Debug, Default)]
pub struct ClockAnchor {
    origin: OnceLock<Origin>,
}

impl ClockAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Try to establish the origin. Only the very first caller succeeds;
        every caller gets back the origin that is in effect.
    */
    pub fn try_set_origin(&self, wall: Instant, stream: i64) -> Origin {
        *self.origin.get_or_init(|| Origin { wall, stream })
    }

    /**
        The established origin, if any queue has processed an item yet.
    */
    pub fn origin(&self) -> Option<Origin> {
        self.origin.get().copied()
    }

    pub fn is_set(&self) -> bool {
        self.origin.get().is_some()
    }
}

static_assertions::assert_impl_all!(ClockAnchor: Send, Sync);

fn signed_micros_between(from: Instant, to: Instant) -> i64 {
    match to.checked_duration_since(from) {
        Some(elapsed) => duration_to_micros(elapsed),
        None => -duration_to_micros(from.duration_since(to)),
    }
}
