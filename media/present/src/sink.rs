/*!
    Sink traits.

    A sink is the final destination of presented media: a display surface
    for video, an audio output for audio. Each sink is owned by exactly one
    queue worker and is only ever called from that worker's thread.
*/

use std::time::Duration;

use media_types::{AudioFrame, VideoFrame};

use crate::error::SinkError;

/**
    Destination for timed media of type `T`.
*/
pub trait PresentationSink<T>: Send + 'static {
    /**
        Present one payload. `timestamp` is its presentation time in µs.

        May block, e.g. when an audio device buffer is full. An error is
        fatal to the calling worker.
    */
    fn dispatch(&mut self, payload: T, timestamp: i64) -> Result<(), SinkError>;

    /**
        Release the sink. Called once, after the last dispatch.
    */
    fn close(&mut self) {}
}

impl<T, S> PresentationSink<T> for Box<S>
where
    S: PresentationSink<T> + ?Sized,
{
    fn dispatch(&mut self, payload: T, timestamp: i64) -> Result<(), SinkError> {
        (**self).dispatch(payload, timestamp)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/**
    An audio output with internal buffering.
*/
pub trait AudioSink: PresentationSink<AudioFrame> {
    /**
        How long audio sits in the output's buffers before it is heard.
    */
    fn buffered_latency(&self) -> Duration;

    /**
        Block until buffered audio has been played out.
    */
    fn drain(&mut self) {}
}

pub type BoxedVideoSink = Box<dyn PresentationSink<VideoFrame>>;
pub type BoxedAudioSink = Box<dyn AudioSink>;

/**
    Opens sinks for streams as a session discovers them.
*/
pub trait SinkFactory {
    /**
        Open a display surface for video stream `index`.
    */
    fn video_sink(&mut self, index: usize) -> Result<BoxedVideoSink, SinkError>;

    /**
        Open an audio output for audio stream `index`.

        Returning an error means no output is available; the session then
        skips that stream.
    */
    fn audio_sink(&mut self, index: usize) -> Result<BoxedAudioSink, SinkError>;
}

static_assertions::assert_impl_all!(BoxedVideoSink: Send, PresentationSink<VideoFrame>);
static_assertions::assert_impl_all!(BoxedAudioSink: Send, PresentationSink<AudioFrame>);
