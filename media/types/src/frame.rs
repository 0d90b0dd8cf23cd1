/*!
    Decoded frame types.

    These are the payloads the presentation scheduler moves around. Timing
    travels next to them (see `MediaEvent`), not inside them, since the
    decode pipeline reports timestamps already rescaled to its own unit.
*/

use std::time::Duration;

use crate::{ChannelLayout, PixelFormat, SampleFormat};

/**
    A decoded video frame, ready to be shown.
*/
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format of the data.
    pub format: PixelFormat,
}

impl VideoFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
        }
    }

    /**
        Returns true if the buffer holds exactly one packed image.
    */
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.format.frame_size(self.width, self.height)
    }
}

/**
    Shape of the audio a stream produces.

    Sinks are opened from this before the first block is played.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: ChannelLayout,
    pub format: SampleFormat,
}

impl AudioFormat {
    pub const fn new(sample_rate: u32, channels: ChannelLayout, format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            format,
        }
    }

    /**
        Bytes occupied by one interleaved sample frame (all channels).
    */
    pub const fn bytes_per_frame(&self) -> usize {
        self.channels.channels() as usize * self.format.bytes_per_sample()
    }
}

/**
    A decoded block of audio.

    Samples are interleaved for multi-channel audio:
    for stereo F32 the bytes are `[L0, R0, L1, R1, ...]`.
*/
#[derive(Clone, Debug)]
pub struct AudioFrame {
    /// Raw sample data as bytes.
    pub data: Vec<u8>,
    /// Number of samples per channel.
    pub samples: usize,
    pub sample_rate: u32,
    pub channels: ChannelLayout,
    pub format: SampleFormat,
}

impl AudioFrame {
    pub fn new(
        data: Vec<u8>,
        samples: usize,
        sample_rate: u32,
        channels: ChannelLayout,
        format: SampleFormat,
    ) -> Self {
        Self {
            data,
            samples,
            sample_rate,
            channels,
            format,
        }
    }

    /**
        The stream-level format this block belongs to.
    */
    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate, self.channels, self.format)
    }

    /**
        Returns the playback duration of this block.
    */
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples as f64 / self.sample_rate as f64)
    }

    /**
        Returns the total number of samples (samples per channel * channels).
    */
    pub fn total_samples(&self) -> usize {
        self.samples * self.channels.channels() as usize
    }

    /**
        Returns the expected data length in bytes.
    */
    pub fn expected_data_len(&self) -> usize {
        self.total_samples() * self.format.bytes_per_sample()
    }
}

static_assertions::assert_impl_all!(VideoFrame: Send, Sync);
static_assertions::assert_impl_all!(AudioFrame: Send, Sync);
