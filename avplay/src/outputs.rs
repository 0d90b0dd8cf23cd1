/*!
    Output devices for the player.

    Video goes to in-memory display surfaces watched by a monitor thread.
    Audio goes to the system device when built with the `cpal` feature,
    otherwise to a simulated device that consumes samples in real time.
*/

use std::sync::Arc;
#[cfg(not(feature = "cpal"))]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(not(feature = "cpal"))]
use std::thread::{self, JoinHandle};
#[cfg(not(feature = "cpal"))]
use std::time::Duration;

use tracing::{debug, info};

use media_present::audio::AudioStreamConsumer;
#[cfg(not(feature = "cpal"))]
use media_present::audio::{RingAudioSink, create_audio_stream};
use media_present::{BoxedAudioSink, BoxedVideoSink, FrameSurface, SinkError, SinkFactory};
#[cfg(not(feature = "cpal"))]
use media_types::{ChannelLayout, Error as MediaError, SampleFormat};
use media_types::AudioFormat;

use crate::settings::AudioSettings;

#[cfg(not(feature = "cpal"))]
const SIMULATED_FORMAT: AudioFormat =
    AudioFormat::new(48_000, ChannelLayout::Stereo, SampleFormat::F32);

/// Device callback period of the simulated output
#[cfg(not(feature = "cpal"))]
const SIMULATED_PERIOD: Duration = Duration::from_millis(10);

/**
    Hands out display surfaces and the audio output to a session.
*/
pub struct Outputs {
    surfaces: Vec<(usize, FrameSurface)>,
    audio: AudioDevice,
    volume: f32,
}

impl Outputs {
    pub fn open(settings: &AudioSettings) -> anyhow::Result<Self> {
        let audio = AudioDevice::open(settings)?;
        info!(format = ?audio.format(), buffer_ms = settings.buffer_ms, "audio output ready");
        Ok(Self {
            surfaces: Vec::new(),
            audio,
            volume: settings.volume,
        })
    }

    /**
        Format audio must be delivered in.
    */
    pub fn audio_format(&self) -> AudioFormat {
        self.audio.format()
    }

    pub fn surfaces(&self) -> Vec<(usize, FrameSurface)> {
        self.surfaces.clone()
    }
}

impl SinkFactory for Outputs {
    fn video_sink(&mut self, index: usize) -> Result<BoxedVideoSink, SinkError> {
        let surface = FrameSurface::new();
        let sink = surface.sink();
        self.surfaces.push((index, surface));
        debug!(stream = index, "display surface opened");
        Ok(Box::new(sink))
    }

    fn audio_sink(&mut self, index: usize) -> Result<BoxedAudioSink, SinkError> {
        let (sink, consumer) = self.audio.take_sink()?;
        consumer.set_volume(self.volume);
        debug!(stream = index, "audio output opened");
        Ok(sink)
    }
}

#[cfg(feature = "cpal")]
struct AudioDevice {
    output: media_present::audio::AudioOutput,
    sink: Option<media_present::audio::RingAudioSink>,
    consumer: Arc<AudioStreamConsumer>,
}

#[cfg(feature = "cpal")]
impl AudioDevice {
    fn open(settings: &AudioSettings) -> anyhow::Result<Self> {
        let probe_rate = 48_000;
        let frames = (probe_rate * settings.buffer_ms / 1_000) as usize;
        let (output, sink) = media_present::audio::AudioOutput::open_default(frames)?;
        let consumer = output.consumer();
        Ok(Self {
            output,
            sink: Some(sink),
            consumer,
        })
    }

    fn format(&self) -> AudioFormat {
        self.output.format()
    }

    fn take_sink(&mut self) -> Result<(BoxedAudioSink, Arc<AudioStreamConsumer>), SinkError> {
        let sink = self
            .sink
            .take()
            .ok_or_else(|| SinkError::Unavailable("audio output already in use".into()))?;
        Ok((Box::new(sink), Arc::clone(&self.consumer)))
    }
}

/**
    Stands in for a sound card: pulls one period of samples from the ring
    every few milliseconds, like a device callback would.
*/
#[cfg(not(feature = "cpal"))]
struct AudioDevice {
    ring_frames: usize,
    in_use: bool,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

#[cfg(not(feature = "cpal"))]
impl AudioDevice {
    fn open(settings: &AudioSettings) -> anyhow::Result<Self> {
        let rate = SIMULATED_FORMAT.sample_rate as u64;
        Ok(Self {
            ring_frames: (rate * settings.buffer_ms / 1_000).max(1) as usize,
            in_use: false,
            stop: Arc::new(AtomicBool::new(false)),
            thread: None,
        })
    }

    fn format(&self) -> AudioFormat {
        SIMULATED_FORMAT
    }

    fn take_sink(&mut self) -> Result<(BoxedAudioSink, Arc<AudioStreamConsumer>), SinkError> {
        if self.in_use {
            return Err(SinkError::Unavailable("audio output already in use".into()));
        }
        self.in_use = true;

        let channels = SIMULATED_FORMAT.channels.channels() as usize;
        let (producer, consumer) = create_audio_stream(self.ring_frames * channels);
        let consumer = Arc::new(consumer);

        let period_samples = SIMULATED_FORMAT.sample_rate as usize * channels
            * SIMULATED_PERIOD.as_millis() as usize
            / 1_000;
        let stop = Arc::clone(&self.stop);
        let device = Arc::clone(&consumer);
        let thread = thread::Builder::new()
            .name("simulated audio device".into())
            .spawn(move || {
                let mut period = vec![0.0f32; period_samples];
                while !stop.load(Ordering::Relaxed) && !device.is_ended() {
                    device.fill_buffer(&mut period);
                    thread::sleep(SIMULATED_PERIOD);
                }
                device.detach();
            })
            .map_err(|e| {
                SinkError::from(MediaError::device(format!("cannot start audio device: {e}")))
            })?;
        self.thread = Some(thread);

        let sink = RingAudioSink::new(SIMULATED_FORMAT, producer);
        Ok((Box::new(sink), consumer))
    }
}

#[cfg(not(feature = "cpal"))]
impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
