/*!
    Real-time presentation of decoded audio and video.

    Decoded frames arrive from a decode pipeline with presentation
    timestamps. This crate releases them to their outputs at the right
    wall-clock moment, keeping several independently running streams in
    step and audio and video in sync.

    # Scheduling

    - [`PresentationQueue`] - Duration-bounded queue with its own worker thread
    - [`TimestampedItem`] - A payload and its timestamp in µs
    - [`judge`] and [`Verdict`] - The early / late / on-time decision
    - [`LatencyCompensator`] - Delays video by the audio output's latency

    # Sessions

    - [`SessionController`] - Opens outputs per stream and routes media to them
    - [`SinkFactory`] - Where the session gets its outputs from

    # Outputs

    - [`PresentationSink`] and [`AudioSink`] - Output traits
    - [`FrameSurface`] - Latest-frame display surface
    - [`audio::RingAudioSink`] - Ring buffer audio output
    - `audio::AudioOutput` - System audio device (feature `cpal`)

    # Configuration and Diagnostics

    - [`PresenterConfig`], [`QueueConfig`], [`PlaybackMode`]
    - [`StreamStats`] and [`StatsSnapshot`]
*/

pub mod audio;

mod config;
mod error;
mod item;
mod latency;
mod queue;
mod session;
mod sink;
mod stats;
mod surface;

pub use config::{
    DEFAULT_CAPACITY, DEFAULT_EARLY_WINDOW, DEFAULT_LATE_WINDOW, PlaybackMode, PresenterConfig,
    QueueConfig, QueueTiming, WorkerPriority,
};
pub use error::{PresentError, Result, SinkError};
pub use item::TimestampedItem;
pub use latency::LatencyCompensator;
pub use queue::{PresentationQueue, Verdict, judge};
pub use session::{SessionController, SessionState, StreamReport};
pub use sink::{AudioSink, BoxedAudioSink, BoxedVideoSink, PresentationSink, SinkFactory};
pub use stats::{StatsSnapshot, StreamStats};
pub use surface::{FrameSurface, ShownFrame, SurfaceSink};
