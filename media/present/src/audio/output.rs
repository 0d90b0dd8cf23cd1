use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat as DeviceSampleFormat, Stream, StreamConfig};
use tracing::{error, info};

use media_types::{AudioFormat, ChannelLayout, Error as MediaError, SampleFormat};

use super::sink::RingAudioSink;
use super::stream::{AudioStreamConsumer, create_audio_stream};
use crate::error::SinkError;

/**
    Playback on the system's default output device.

    Pulls samples from an [`AudioStreamConsumer`] inside the device
    callback. The stream stops when this is dropped.
*/
pub struct AudioOutput {
    stream: Stream,
    format: AudioFormat,
    consumer: Arc<AudioStreamConsumer>,
    error_flag: Arc<AtomicBool>,
}

impl AudioOutput {
    /**
        Open the default device and a sink feeding it.

        `buffer` is the ring size in sample frames; it sets the sink's
        buffered latency.
    */
    pub fn open_default(buffer: usize) -> Result<(Self, RingAudioSink), SinkError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SinkError::Unavailable("no audio output device".into()))?;

        let supported = device
            .default_output_config()
            .map_err(|e| SinkError::Unavailable(format!("no default output config: {e}")))?;
        if supported.sample_format() != DeviceSampleFormat::F32 {
            return Err(SinkError::Unavailable(format!(
                "device sample format {:?} is not f32",
                supported.sample_format()
            )));
        }

        let mut config: StreamConfig = supported.config();
        let channels = ChannelLayout::from_count(config.channels);
        config.channels = channels.channels();
        let format = AudioFormat::new(config.sample_rate.0, channels, SampleFormat::F32);

        let (producer, consumer) = create_audio_stream(buffer * channels.channels() as usize);
        let consumer = Arc::new(consumer);
        let error_flag = Arc::new(AtomicBool::new(false));

        let stream = {
            let consumer = Arc::clone(&consumer);
            let error_flag = Arc::clone(&error_flag);
            device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        consumer.fill_buffer(data);
                    },
                    move |err| {
                        error!("audio stream error: {err}");
                        error_flag.store(true, Ordering::SeqCst);
                    },
                    None,
                )
                .map_err(|e| device_error("failed to build stream", e))?
        };
        stream
            .play()
            .map_err(|e| device_error("failed to start stream", e))?;

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = format.sample_rate,
            channels = format.channels.channels(),
            "audio output started"
        );

        let output = Self {
            stream,
            format,
            consumer,
            error_flag,
        };
        Ok((output, RingAudioSink::new(format, producer)))
    }

    /**
        The format sinks for this output must be fed.
    */
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /**
        The consumer the device callback reads from.
    */
    pub fn consumer(&self) -> Arc<AudioStreamConsumer> {
        Arc::clone(&self.consumer)
    }

    pub fn set_volume(&self, volume: f32) {
        self.consumer.set_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.consumer.volume()
    }

    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    pub fn pause(&self) -> Result<(), SinkError> {
        self.stream
            .pause()
            .map_err(|e| device_error("failed to pause stream", e))
    }
}

fn device_error(what: &str, e: impl std::fmt::Display) -> SinkError {
    MediaError::device(format!("{what}: {e}")).into()
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.consumer.detach();
    }
}
