mod sink;
mod stream;

#[cfg(feature = "cpal")]
mod output;

pub use sink::{RingAudioSink, decode_samples};
pub use stream::{
    AtomicF32, AudioStreamConsumer, AudioStreamProducer, DEFAULT_RING_SAMPLES, create_audio_stream,
};

#[cfg(feature = "cpal")]
pub use output::AudioOutput;
