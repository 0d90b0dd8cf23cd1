/*!
    Self-servicing presentation queue.

    A [`PresentationQueue`] buffers timestamped items and runs a dedicated
    worker thread that releases each item to its sink at the right
    wall-clock moment. The moment is derived from a [`ClockAnchor`] shared by
    every queue of a session, so independently running queues stay in step.

    Memory is bounded by buffered *duration*: a producer offering an item
    more than `capacity` ahead of the oldest queued item blocks until the
    worker catches up. Nothing is ever discarded on the producer side.

    For each item the worker decides:

    - **early** (`delta >= early_window`): wait out `delta - early_window`,
      then judge the same item again;
    - **late** (`delta < -late_window`): drop it;
    - **on time**: hand it to the sink.

    where `delta` is how far the item's stream time runs ahead of the
    elapsed wall time since the anchor was set.

    Queues fed with latency-compensated timestamps (video held back behind
    an audio output) anchor the session in uncompensated stream time, so
    whichever stream is scheduled first sets the same origin.
*/

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use media_types::{ClockAnchor, TimeUnit, duration_to_micros, micros_to_duration};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use crate::config::QueueConfig;
use crate::error::{PresentError, Result, SinkError};
use crate::item::TimestampedItem;
use crate::latency::LatencyCompensator;
use crate::sink::PresentationSink;
use crate::stats::{StatsSnapshot, StreamStats};

/// Shortest early-window wait, so an item right at the edge does not spin.
const MIN_EARLY_WAIT: Duration = Duration::from_millis(1);

/**
    Scheduling decision for one item at one instant.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Too early; wait this long and judge again.
    Early { wait: Duration },
    /// Too late; drop it.
    Late,
    /// Within the window; present it now.
    OnTime,
}

/**
    Judge an item whose stream time is `delta` µs ahead of the wall clock.
*/
pub fn judge(delta: i64, early_window: i64, late_window: i64) -> Verdict {
    if delta >= early_window {
        let wait = micros_to_duration(delta.saturating_sub(early_window));
        Verdict::Early {
            wait: wait.max(MIN_EARLY_WAIT),
        }
    } else if delta < late_window.saturating_neg() {
        Verdict::Late
    } else {
        Verdict::OnTime
    }
}

/**
    Lifecycle of the item a worker currently holds.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ItemState {
    Pending,
    Sleeping(Duration),
    Ready,
    Dropped,
    Abandoned,
}

struct State<T> {
    items: VecDeque<TimestampedItem<T>>,
    newest: Option<i64>,
    closed: bool,
    in_flight: bool,
    ready: bool,
}

struct Shared<T> {
    name: String,
    capacity: i64,
    early_window: i64,
    late_window: i64,
    anchor: Arc<ClockAnchor>,
    latency: Option<Arc<LatencyCompensator>>,
    stats: StreamStats,
    state: Mutex<State<T>>,
    cond: Condvar,
}

/**
    A capacity-bounded, time-ordered queue with its own presenting worker.
*/
pub struct PresentationQueue<T> {
    shared: Arc<Shared<T>>,
    worker: Option<JoinHandle<Result<(), SinkError>>>,
}

impl<T: Send + 'static> PresentationQueue<T> {
    /**
        Create a queue and start its worker.

        Returns once the worker is running and ready to take items.
    */
    pub fn new<S>(config: QueueConfig, anchor: Arc<ClockAnchor>, sink: S) -> Result<Self>
    where
        S: PresentationSink<T>,
    {
        Self::spawn(config, anchor, None, sink)
    }

    /**
        Create a queue whose items carry timestamps already shifted by
        `latency`.

        The shift is taken back out when anchoring the session clock, so
        this queue and unshifted queues agree on the stream origin.
    */
    pub fn with_latency<S>(
        config: QueueConfig,
        anchor: Arc<ClockAnchor>,
        latency: Arc<LatencyCompensator>,
        sink: S,
    ) -> Result<Self>
    where
        S: PresentationSink<T>,
    {
        Self::spawn(config, anchor, Some(latency), sink)
    }

    fn spawn<S>(
        config: QueueConfig,
        anchor: Arc<ClockAnchor>,
        latency: Option<Arc<LatencyCompensator>>,
        sink: S,
    ) -> Result<Self>
    where
        S: PresentationSink<T>,
    {
        let shared = Arc::new(Shared {
            name: config.name.clone(),
            capacity: duration_to_micros(config.capacity),
            early_window: duration_to_micros(config.early_window),
            late_window: duration_to_micros(config.late_window),
            anchor,
            latency,
            stats: StreamStats::new(),
            state: Mutex::new(State {
                items: VecDeque::new(),
                newest: None,
                closed: false,
                in_flight: false,
                ready: false,
            }),
            cond: Condvar::new(),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(format!("present {}", config.name))
                .spawn(move || shared.run(sink))
                .map_err(|source| PresentError::Spawn {
                    name: config.name.clone(),
                    source,
                })?
        };

        shared.wait_ready();
        debug!(
            queue = %config.name,
            priority = ?config.priority,
            capacity_ms = config.capacity.as_millis() as u64,
            "worker started and ready"
        );

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /**
        Offer a payload whose timestamp is expressed in `unit`.

        Blocks while accepting it would buffer more than the queue's
        capacity. Returns false if the queue is closed, in which case the
        payload is dropped.
    */
    pub fn offer(&self, payload: T, timestamp: i64, unit: TimeUnit) -> bool {
        self.offer_item(TimestampedItem::with_unit(payload, timestamp, unit))
    }

    /**
        Offer an item already stamped in microseconds.
    */
    pub fn offer_item(&self, item: TimestampedItem<T>) -> bool {
        self.enqueue(item, None).is_ok()
    }

    /**
        Like [`offer`](Self::offer), but stop waiting for room after `timeout`.

        Hands the payload back if it could not be queued.
    */
    pub fn offer_timeout(
        &self,
        payload: T,
        timestamp: i64,
        unit: TimeUnit,
        timeout: Duration,
    ) -> Result<(), T> {
        let item = TimestampedItem::with_unit(payload, timestamp, unit);
        self.enqueue(item, Some(Instant::now() + timeout))
            .map_err(|item| item.into_parts().0)
    }

    fn enqueue(
        &self,
        item: TimestampedItem<T>,
        deadline: Option<Instant>,
    ) -> Result<(), TimestampedItem<T>> {
        let shared = &self.shared;
        let timestamp = item.timestamp();
        let mut state = shared.state.lock();

        while !state.closed && shared.over_capacity(&state, timestamp) {
            match deadline {
                None => shared.cond.wait(&mut state),
                Some(deadline) => {
                    if shared.cond.wait_until(&mut state, deadline).timed_out()
                        && !state.closed
                        && shared.over_capacity(&state, timestamp)
                    {
                        trace!(queue = %shared.name, timestamp, "offer timed out");
                        return Err(item);
                    }
                }
            }
        }

        if state.closed {
            trace!(queue = %shared.name, timestamp, "offer to closed queue dropped");
            return Err(item);
        }

        let newest = state.newest;
        match newest {
            Some(newest) if timestamp < newest => {
                warn!(queue = %shared.name, timestamp, newest, "offered timestamp went backwards");
            }
            _ => state.newest = Some(timestamp),
        }

        state.items.push_back(item);
        shared.stats.record_offered();
        shared.cond.notify_all();
        Ok(())
    }
}

impl<T> PresentationQueue<T> {
    /**
        Block until every queued item has been presented or dropped, or the
        queue is closed.
    */
    pub fn flush(&self) {
        let shared = &self.shared;
        let mut state = shared.state.lock();
        while !state.closed && (!state.items.is_empty() || state.in_flight) {
            shared.cond.wait(&mut state);
        }
    }

    /**
        Close the queue and wake everyone waiting on it.

        Pending offers return without queuing, `flush` returns, and the
        worker stops without presenting anything else. Items still queued,
        and one the worker may be waiting on, are abandoned.
    */
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if !state.closed {
            state.closed = true;
            debug!(queue = %self.shared.name, queued = state.items.len(), "closing");
        }
        self.shared.cond.notify_all();
    }

    /**
        Close the queue and wait for its worker to exit.

        Reports the sink failure that stopped the worker, if any.
    */
    pub fn shutdown(&mut self) -> Result<()> {
        self.close();
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        match worker.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(PresentError::Sink {
                name: self.shared.name.clone(),
                source,
            }),
            Err(_) => Err(PresentError::WorkerPanicked {
                name: self.shared.name.clone(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /**
        Number of items waiting (not counting one the worker holds).
    */
    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /**
        Presentation time spanned by the queued items.
    */
    pub fn buffered(&self) -> Duration {
        micros_to_duration(self.shared.state.lock().buffered_micros())
    }

    pub fn stats(&self) -> StatsSnapshot {
        let state = self.shared.state.lock();
        StatsSnapshot::from_counters(
            &self.shared.stats,
            state.items.len(),
            state.buffered_micros(),
        )
    }
}

impl<T> Drop for PresentationQueue<T> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            debug!(queue = %self.shared.name, error = %e, "worker ended with error");
        }
    }
}

impl<T> State<T> {
    fn buffered_micros(&self) -> i64 {
        match (self.items.front(), self.items.back()) {
            (Some(front), Some(back)) => back.timestamp().saturating_sub(front.timestamp()),
            _ => 0,
        }
    }
}

impl<T> Shared<T> {
    fn over_capacity(&self, state: &State<T>, timestamp: i64) -> bool {
        state
            .items
            .front()
            .is_some_and(|front| timestamp.saturating_sub(front.timestamp()) > self.capacity)
    }

    /**
        Stream time of `timestamp` before any latency shift.
    */
    fn uncompensated(&self, timestamp: i64) -> i64 {
        match &self.latency {
            Some(latency) => timestamp.saturating_sub(latency.offset_micros()),
            None => timestamp,
        }
    }

    fn wait_ready(&self) {
        let mut state = self.state.lock();
        while !state.ready {
            self.cond.wait(&mut state);
        }
    }

    fn mark_ready(&self) {
        self.state.lock().ready = true;
        self.cond.notify_all();
    }

    /**
        Take the next item, or None once the queue is closed.
    */
    fn next_item(&self) -> Option<TimestampedItem<T>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(item) = state.items.pop_front() {
                state.in_flight = true;
                self.cond.notify_all();
                return Some(item);
            }
            self.cond.wait(&mut state);
        }
    }

    /**
        The held item has been presented or dropped.
    */
    fn settle(&self) {
        self.state.lock().in_flight = false;
        self.cond.notify_all();
    }

    /**
        Wait for `wait` without holding the lock. Returns false if the
        queue was closed meanwhile.
    */
    fn sleep(&self, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        let mut state = self.state.lock();
        while !state.closed && !self.cond.wait_until(&mut state, deadline).timed_out() {}
        !state.closed
    }

    /**
        Drive one item's timing until it is ready, dropped or abandoned.
    */
    fn schedule(&self, timestamp: i64, last_dispatched: Option<i64>) -> ItemState {
        if last_dispatched.is_some_and(|last| timestamp < last) {
            warn!(queue = %self.name, timestamp, "item older than last presented, dropping");
            return ItemState::Dropped;
        }

        let mut state = ItemState::Pending;
        loop {
            state = match state {
                ItemState::Pending => {
                    let now = Instant::now();
                    let origin = self.anchor.try_set_origin(now, self.uncompensated(timestamp));
                    let delta = origin.delta(timestamp, now);
                    match judge(delta, self.early_window, self.late_window) {
                        Verdict::Early { wait } => ItemState::Sleeping(wait),
                        Verdict::Late => {
                            debug!(
                                queue = %self.name,
                                timestamp_ms = timestamp / 1000,
                                delta_ms = delta / 1000,
                                "dropping late item"
                            );
                            ItemState::Dropped
                        }
                        Verdict::OnTime => ItemState::Ready,
                    }
                }
                ItemState::Sleeping(wait) => {
                    if self.sleep(wait) {
                        ItemState::Pending
                    } else {
                        ItemState::Abandoned
                    }
                }
                done => return done,
            };
        }
    }

    fn serve<S: PresentationSink<T>>(&self, sink: &mut S) -> Result<(), SinkError> {
        while let Some(item) = self.next_item() {
            let (payload, timestamp) = item.into_parts();
            match self.schedule(timestamp, self.stats.last_dispatched()) {
                ItemState::Ready => {
                    if let Err(e) = sink.dispatch(payload, timestamp) {
                        self.stats.record_abandoned(1);
                        return Err(e);
                    }
                    self.stats.record_dispatched(timestamp);
                }
                ItemState::Dropped => self.stats.record_dropped(),
                _ => {
                    debug!(queue = %self.name, timestamp, "closed while waiting, abandoning item");
                    self.stats.record_abandoned(1);
                    return Ok(());
                }
            }
            self.settle();
        }
        Ok(())
    }

    fn run<S: PresentationSink<T>>(self: Arc<Self>, mut sink: S) -> Result<(), SinkError> {
        let guard = ShutdownGuard(&*self);
        self.mark_ready();

        let result = self.serve(&mut sink);
        if let Err(e) = &result {
            error!(queue = %self.name, error = %e, "sink failed, stopping queue");
            self.stats.mark_failed();
        }

        drop(guard);
        sink.close();
        debug!(queue = %self.name, "worker stopped");
        result
    }

    /**
        Close for good and account for anything left behind.
    */
    fn shut_down(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.in_flight = false;
        state.ready = true;

        let left = state.items.len();
        if left > 0 {
            debug!(queue = %self.name, abandoned = left, "discarding queued items");
            state.items.clear();
            self.stats.record_abandoned(left as u64);
        }
        self.cond.notify_all();
    }
}

/**
    Shuts the queue down when the worker exits, including by panic, so
    producers and flushers are never left waiting on a dead worker.
*/
struct ShutdownGuard<'a, T>(&'a Shared<T>);

impl<T> Drop for ShutdownGuard<'_, T> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(queue = %self.0.name, "worker panicked");
            self.0.stats.mark_failed();
        }
        self.0.shut_down();
    }
}

static_assertions::assert_impl_all!(PresentationQueue<Vec<u8>>: Send, Sync);
