/*!
    Per-stream presentation counters.
*/

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

const NO_TIMESTAMP: i64 = i64::MIN;

/**
    Live counters for one stream, shared between its producer and worker.

    Every offered item ends up in exactly one of `dispatched`, `dropped`
    or `abandoned` once the queue has gone quiet.
*/
#[derive(Debug)]
pub struct StreamStats {
    offered: AtomicU64,
    dispatched: AtomicU64,
    dropped: AtomicU64,
    abandoned: AtomicU64,
    last_dispatched: AtomicI64,
    failed: AtomicBool,
}

impl Default for StreamStats {
    fn default() -> Self {
        Self {
            offered: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
            last_dispatched: AtomicI64::new(NO_TIMESTAMP),
            failed: AtomicBool::new(false),
        }
    }
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_offered(&self) {
        self.offered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self, timestamp: i64) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.last_dispatched.store(timestamp, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abandoned(&self, count: u64) {
        if count > 0 {
            self.abandoned.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn mark_failed(&self) {
        self.failed.store(true, Ordering::Release);
    }

    pub fn offered(&self) -> u64 {
        self.offered.load(Ordering::Relaxed)
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }

    /**
        Timestamp (µs) of the most recently dispatched item.
    */
    pub fn last_dispatched(&self) -> Option<i64> {
        match self.last_dispatched.load(Ordering::Relaxed) {
            NO_TIMESTAMP => None,
            ts => Some(ts),
        }
    }

    /**
        True once the stream's sink has failed.
    */
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }
}

/**
    Point-in-time view of a stream's counters and buffer.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub offered: u64,
    pub dispatched: u64,
    pub dropped: u64,
    pub abandoned: u64,
    pub last_dispatched: Option<i64>,
    /// Items waiting in the queue.
    pub queued: usize,
    /// Span (µs) between the oldest and newest queued timestamps.
    pub buffered_micros: i64,
    pub failed: bool,
}

impl StatsSnapshot {
    pub(crate) fn from_counters(stats: &StreamStats, queued: usize, buffered_micros: i64) -> Self {
        Self {
            offered: stats.offered(),
            dispatched: stats.dispatched(),
            dropped: stats.dropped(),
            abandoned: stats.abandoned(),
            last_dispatched: stats.last_dispatched(),
            queued,
            buffered_micros,
            failed: stats.has_failed(),
        }
    }

    /**
        Items that have left the queue one way or another.
    */
    pub fn settled(&self) -> u64 {
        self.dispatched + self.dropped + self.abandoned
    }
}

static_assertions::assert_impl_all!(StreamStats: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_empty() {
        let stats = StreamStats::new();
        assert_eq!(stats.offered(), 0);
        assert_eq!(stats.last_dispatched(), None);
        assert!(!stats.has_failed());
    }

    #[test]
    fn snapshot_settles_all_outcomes() {
        let stats = StreamStats::new();
        for _ in 0..5 {
            stats.record_offered();
        }
        stats.record_dispatched(1_000);
        stats.record_dispatched(2_000);
        stats.record_dropped();
        stats.record_abandoned(2);
        stats.record_abandoned(0);

        let snapshot = StatsSnapshot::from_counters(&stats, 0, 0);
        assert_eq!(snapshot.offered, 5);
        assert_eq!(snapshot.settled(), 5);
        assert_eq!(snapshot.last_dispatched, Some(2_000));
    }

    #[test]
    fn failure_is_sticky() {
        let stats = StreamStats::new();
        stats.mark_failed();
        assert!(stats.has_failed());
        assert!(StatsSnapshot::from_counters(&stats, 0, 0).failed);
    }
}
