use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use media_types::{AudioFormat, AudioFrame, Error as MediaError, SampleFormat};

use super::stream::AudioStreamProducer;
use crate::error::SinkError;
use crate::latency::LatencyCompensator;
use crate::sink::{AudioSink, PresentationSink};

/// Wait between attempts to push into a full ring
const FULL_BACKOFF: Duration = Duration::from_millis(1);

/// Poll interval while draining
const DRAIN_POLL: Duration = Duration::from_millis(5);

/// Longest `close` waits for buffered audio to play out
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/**
    Audio sink that feeds a ring buffer read by an output callback.

    Blocks in `dispatch` while the ring is full, the way writing to a
    hardware line blocks, so presentation never runs far ahead of playback.
*/
pub struct RingAudioSink {
    format: AudioFormat,
    producer: AudioStreamProducer,
    scratch: Vec<f32>,
    drain_timeout: Duration,
}

impl RingAudioSink {
    pub fn new(format: AudioFormat, producer: AudioStreamProducer) -> Self {
        Self {
            format,
            producer,
            scratch: Vec::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    fn write_all(&mut self) -> Result<(), SinkError> {
        let mut written = 0;
        while written < self.scratch.len() {
            if self.producer.is_detached() {
                return Err(SinkError::Closed);
            }
            let pushed = self.producer.push(&self.scratch[written..]);
            if pushed == 0 {
                thread::sleep(FULL_BACKOFF);
            }
            written += pushed;
        }
        Ok(())
    }
}

impl PresentationSink<AudioFrame> for RingAudioSink {
    fn dispatch(&mut self, block: AudioFrame, timestamp: i64) -> Result<(), SinkError> {
        let actual = block.audio_format();
        if actual != self.format {
            return Err(SinkError::FormatMismatch {
                expected: self.format,
                actual,
            });
        }
        if block.data.len() != block.expected_data_len() {
            warn!(
                timestamp,
                len = block.data.len(),
                expected = block.expected_data_len(),
                "audio block size does not match its sample count"
            );
        }

        self.scratch.clear();
        decode_samples(&block.data, block.format, &mut self.scratch)?;
        self.write_all()
    }

    fn close(&mut self) {
        self.drain();
        self.producer.close();
    }
}

impl AudioSink for RingAudioSink {
    fn buffered_latency(&self) -> Duration {
        let channels = self.format.channels.channels().max(1) as usize;
        LatencyCompensator::latency_of(self.producer.capacity() / channels, self.format.sample_rate)
    }

    fn drain(&mut self) {
        let deadline = Instant::now() + self.drain_timeout;
        while self.producer.buffered() > 0 && !self.producer.is_detached() {
            if Instant::now() >= deadline {
                debug!(left = self.producer.buffered(), "gave up draining audio");
                return;
            }
            thread::sleep(DRAIN_POLL);
        }
    }
}

/**
    Convert interleaved sample bytes to `f32` samples in [-1.0, 1.0].

    A trailing partial sample is ignored.
*/
pub fn decode_samples(
    data: &[u8],
    format: SampleFormat,
    out: &mut Vec<f32>,
) -> Result<(), SinkError> {
    let width = format.bytes_per_sample();
    let data = &data[..data.len() - data.len() % width];

    match format {
        SampleFormat::F32 => match bytemuck::try_cast_slice::<u8, f32>(data) {
            Ok(samples) => out.extend_from_slice(samples),
            Err(_) => out.extend(
                data.chunks_exact(4)
                    .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]])),
            ),
        },
        SampleFormat::S16 => out.extend(
            data.chunks_exact(2)
                .map(|b| i16::from_ne_bytes([b[0], b[1]]) as f32 / 32768.0),
        ),
        SampleFormat::U8 => out.extend(data.iter().map(|&b| (b as f32 - 128.0) / 128.0)),
        other => {
            return Err(MediaError::unsupported_format(format!("{other:?} samples")).into());
        }
    }
    Ok(())
}
