/*!
    Presentation sessions.

    A [`SessionController`] sits between a decode pipeline and its outputs.
    It opens a sink and a presentation queue for every stream it hears
    about, routes decoded media into the right queue, and shuts everything
    down in order when the session closes.
*/

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use media_types::{AudioFrame, ClockAnchor, DecodedMedia, MediaEvent, StreamKind, VideoFrame};

use crate::config::{PresenterConfig, QueueConfig, QueueTiming};
use crate::error::Result;
use crate::item::TimestampedItem;
use crate::latency::LatencyCompensator;
use crate::queue::PresentationQueue;
use crate::sink::{BoxedAudioSink, BoxedVideoSink, PresentationSink, SinkFactory};
use crate::stats::{StatsSnapshot, StreamStats};

/**
    Lifecycle of a session. There is no way back from `Closed`.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Open,
    Closed,
}

/**
    Per-stream statistics, as reported by [`SessionController::stats`].
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StreamReport {
    pub index: usize,
    pub kind: StreamKind,
    pub paced: bool,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

/**
    A sink called straight from the producer thread, without pacing.
*/
struct DirectSink<S> {
    name: String,
    sink: Option<S>,
    stats: StreamStats,
}

impl<S> DirectSink<S> {
    fn new(name: String, sink: S) -> Self {
        Self {
            name,
            sink: Some(sink),
            stats: StreamStats::new(),
        }
    }

    fn present<T>(&mut self, payload: T, timestamp: i64) -> bool
    where
        S: PresentationSink<T>,
    {
        let Some(sink) = self.sink.as_mut() else {
            return false;
        };
        self.stats.record_offered();
        match sink.dispatch(payload, timestamp) {
            Ok(()) => {
                self.stats.record_dispatched(timestamp);
                true
            }
            Err(e) => {
                error!(stream = %self.name, error = %e, "sink failed, stopping stream");
                self.stats.record_abandoned(1);
                self.stats.mark_failed();
                self.release::<T>();
                false
            }
        }
    }

    fn release<T>(&mut self)
    where
        S: PresentationSink<T>,
    {
        if let Some(mut sink) = self.sink.take() {
            sink.close();
        }
    }
}

enum Presenter<T, S> {
    Paced(PresentationQueue<T>),
    Direct(DirectSink<S>),
}

impl<T, S> Presenter<T, S>
where
    T: Send + 'static,
    S: PresentationSink<T>,
{
    fn present(&mut self, payload: T, timestamp: i64) -> bool {
        match self {
            Self::Paced(queue) => queue.offer_item(TimestampedItem::new(payload, timestamp)),
            Self::Direct(direct) => direct.present(payload, timestamp),
        }
    }

    fn flush(&self) {
        if let Self::Paced(queue) = self {
            queue.flush();
        }
    }

    fn close(&self) {
        if let Self::Paced(queue) = self {
            queue.close();
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        match self {
            Self::Paced(queue) => queue.shutdown(),
            Self::Direct(direct) => {
                direct.release::<T>();
                Ok(())
            }
        }
    }

    fn is_paced(&self) -> bool {
        matches!(self, Self::Paced(_))
    }

    fn stats(&self) -> StatsSnapshot {
        match self {
            Self::Paced(queue) => queue.stats(),
            Self::Direct(direct) => StatsSnapshot::from_counters(&direct.stats, 0, 0),
        }
    }
}

enum StreamEntry {
    Video(Presenter<VideoFrame, BoxedVideoSink>),
    Audio(Presenter<AudioFrame, BoxedAudioSink>),
}

impl StreamEntry {
    fn kind(&self) -> StreamKind {
        match self {
            Self::Video(_) => StreamKind::Video,
            Self::Audio(_) => StreamKind::Audio,
        }
    }

    fn flush(&self) {
        match self {
            Self::Video(p) => p.flush(),
            Self::Audio(p) => p.flush(),
        }
    }

    fn close(&self) {
        match self {
            Self::Video(p) => p.close(),
            Self::Audio(p) => p.close(),
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        match self {
            Self::Video(p) => p.shutdown(),
            Self::Audio(p) => p.shutdown(),
        }
    }

    fn is_paced(&self) -> bool {
        match self {
            Self::Video(p) => p.is_paced(),
            Self::Audio(p) => p.is_paced(),
        }
    }

    fn stats(&self) -> StatsSnapshot {
        match self {
            Self::Video(p) => p.stats(),
            Self::Audio(p) => p.stats(),
        }
    }
}

/**
    Routes decoded media from a decode pipeline to paced outputs.

    Every stream gets its own sink from the [`SinkFactory`] and, when the
    configuration asks for real-time pacing, its own [`PresentationQueue`].
    All queues of a session share one [`ClockAnchor`], and video is held
    back by the first audio output's latency so the two stay in sync.

    All methods are meant to be called from the decode pipeline's thread.
*/
pub struct SessionController<F> {
    config: PresenterConfig,
    factory: F,
    anchor: Arc<ClockAnchor>,
    latency: Arc<LatencyCompensator>,
    streams: BTreeMap<usize, StreamEntry>,
    ignored: BTreeSet<usize>,
    state: SessionState,
}

impl<F: SinkFactory> SessionController<F> {
    pub fn new(config: PresenterConfig, factory: F) -> Self {
        info!(mode = ?config.mode, paced = config.is_paced(), "presentation session opened");
        Self {
            config,
            factory,
            anchor: Arc::new(ClockAnchor::new()),
            latency: Arc::new(LatencyCompensator::new()),
            streams: BTreeMap::new(),
            ignored: BTreeSet::new(),
            state: SessionState::Open,
        }
    }

    /**
        Feed one event from the decode pipeline.
    */
    pub fn handle(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::StreamAdded { index, kind } => self.on_stream_added(index, kind),
            MediaEvent::Decoded {
                index,
                media,
                timestamp,
                unit,
            } => {
                let timestamp = unit.to_micros(timestamp);
                match media {
                    DecodedMedia::Video(frame) => {
                        self.on_video_frame(index, frame, timestamp);
                    }
                    DecodedMedia::Audio(block) => {
                        self.on_audio_block(index, block, timestamp);
                    }
                }
            }
            MediaEvent::Close => self.on_close(),
        }
    }

    /**
        Open outputs for a newly discovered stream.
    */
    pub fn on_stream_added(&mut self, index: usize, kind: StreamKind) {
        if self.state == SessionState::Closed {
            debug!(stream = index, %kind, "session closed, ignoring new stream");
            return;
        }
        if self.streams.contains_key(&index) || self.ignored.contains(&index) {
            debug!(stream = index, %kind, "stream already known");
            return;
        }
        self.stream(index, kind);
    }

    /**
        Present a decoded video frame. `timestamp` is in µs.

        Returns true if the frame was accepted.
    */
    pub fn on_video_frame(&mut self, index: usize, frame: VideoFrame, timestamp: i64) -> bool {
        let timestamp = self.latency.apply(timestamp);
        match self.stream(index, StreamKind::Video) {
            Some(StreamEntry::Video(presenter)) => presenter.present(frame, timestamp),
            _ => false,
        }
    }

    /**
        Present a decoded audio block. `timestamp` is in µs.

        Returns true if the block was accepted.
    */
    pub fn on_audio_block(&mut self, index: usize, block: AudioFrame, timestamp: i64) -> bool {
        match self.stream(index, StreamKind::Audio) {
            Some(StreamEntry::Audio(presenter)) => presenter.present(block, timestamp),
            _ => false,
        }
    }

    /**
        Present everything still buffered, then release all outputs.

        Sink failures are logged here; query [`failed_streams`](Self::failed_streams)
        to act on them.
    */
    pub fn on_close(&mut self) {
        if self.state == SessionState::Closed {
            debug!("session already closed");
            return;
        }
        self.state = SessionState::Closed;

        for entry in self.streams.values() {
            entry.flush();
        }
        for entry in self.streams.values() {
            entry.close();
        }
        for (index, entry) in &mut self.streams {
            if let Err(e) = entry.shutdown() {
                error!(stream = *index, error = %e, "stream ended with an error");
            }
        }

        let failed = self.failed_streams();
        info!(
            streams = self.streams.len(),
            failed = failed.len(),
            "presentation session closed"
        );
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn config(&self) -> &PresenterConfig {
        &self.config
    }

    /**
        The clock anchor shared by this session's queues.
    */
    pub fn anchor(&self) -> Arc<ClockAnchor> {
        Arc::clone(&self.anchor)
    }

    pub fn latency(&self) -> &LatencyCompensator {
        &self.latency
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /**
        Indices of streams with an open output, in order.
    */
    pub fn streams(&self) -> Vec<(usize, StreamKind)> {
        self.streams
            .iter()
            .map(|(index, entry)| (*index, entry.kind()))
            .collect()
    }

    pub fn stats(&self) -> Vec<StreamReport> {
        self.streams
            .iter()
            .map(|(index, entry)| StreamReport {
                index: *index,
                kind: entry.kind(),
                paced: entry.is_paced(),
                stats: entry.stats(),
            })
            .collect()
    }

    /**
        Streams whose sink failed. Other streams keep playing.
    */
    pub fn failed_streams(&self) -> Vec<usize> {
        self.streams
            .iter()
            .filter(|(_, entry)| entry.stats().failed)
            .map(|(index, _)| *index)
            .collect()
    }

    fn wants(&self, kind: StreamKind) -> bool {
        match kind {
            StreamKind::Video => self.config.mode.shows_video(),
            StreamKind::Audio => self.config.mode.plays_audio(),
        }
    }

    /**
        Look up a stream, opening it on first sight.
    */
    fn stream(&mut self, index: usize, kind: StreamKind) -> Option<&mut StreamEntry> {
        if self.state == SessionState::Closed || self.ignored.contains(&index) {
            return None;
        }
        if !self.streams.contains_key(&index) {
            match self.open_stream(index, kind) {
                Some(entry) => {
                    self.streams.insert(index, entry);
                }
                None => {
                    self.ignored.insert(index);
                    return None;
                }
            }
        }

        let entry = self.streams.get_mut(&index)?;
        if entry.kind() != kind {
            warn!(stream = index, expected = %entry.kind(), got = %kind, "media kind does not match stream");
            return None;
        }
        Some(entry)
    }

    fn open_stream(&mut self, index: usize, kind: StreamKind) -> Option<StreamEntry> {
        if !self.wants(kind) {
            debug!(stream = index, %kind, mode = ?self.config.mode, "stream not presented in this mode");
            return None;
        }
        let name = format!("{kind} {index}");

        match kind {
            StreamKind::Video => {
                let sink = match self.factory.video_sink(index) {
                    Ok(sink) => sink,
                    Err(e) => {
                        warn!(stream = index, error = %e, "no display surface, skipping video stream");
                        return None;
                    }
                };
                let latency = Arc::clone(&self.latency);
                self.presenter(name, sink, &self.config.video, Some(latency))
                    .map(StreamEntry::Video)
            }
            StreamKind::Audio => {
                let sink = match self.factory.audio_sink(index) {
                    Ok(sink) => sink,
                    Err(e) => {
                        warn!(stream = index, error = %e, "no audio line out available, skipping audio stream");
                        return None;
                    }
                };
                let latency = sink.buffered_latency();
                if self.latency.calibrate(latency) {
                    info!(
                        stream = index,
                        latency_ms = latency.as_millis() as u64,
                        "delaying video by audio output latency"
                    );
                }
                self.presenter(name, sink, &self.config.audio, None)
                    .map(StreamEntry::Audio)
            }
        }
    }

    /**
        Pace `sink` with a queue, or call it directly when pacing is off.

        `latency` is given for streams whose timestamps are shifted by it.
    */
    fn presenter<T, S>(
        &self,
        name: String,
        sink: S,
        timing: &QueueTiming,
        latency: Option<Arc<LatencyCompensator>>,
    ) -> Option<Presenter<T, S>>
    where
        T: Send + 'static,
        S: PresentationSink<T>,
    {
        if !self.config.is_paced() {
            debug!(stream = %name, "presenting without pacing");
            return Some(Presenter::Direct(DirectSink::new(name, sink)));
        }

        let config = QueueConfig::from_timing(name, timing).with_priority(self.config.priority);
        let anchor = Arc::clone(&self.anchor);
        let queue = match latency {
            Some(latency) => PresentationQueue::with_latency(config, anchor, latency, sink),
            None => PresentationQueue::new(config, anchor, sink),
        };
        match queue {
            Ok(queue) => Some(Presenter::Paced(queue)),
            Err(e) => {
                error!(error = %e, "could not start presentation queue");
                None
            }
        }
    }
}

impl<F> Drop for SessionController<F> {
    fn drop(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        for entry in self.streams.values() {
            entry.flush();
        }
        for entry in self.streams.values_mut() {
            if let Err(e) = entry.shutdown() {
                debug!(error = %e, "stream ended with an error");
            }
        }
    }
}
