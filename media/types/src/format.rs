/*!
    Pixel and sample format types.
*/

use serde::{Deserialize, Serialize};

/**
    Video pixel formats a display surface can be handed.

    Frames reach the scheduler already converted for display, so only
    packed formats are represented.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Packed BGRA, 32bpp
    Bgra,
    /// Packed RGBA, 32bpp
    Rgba,
    /// Packed RGB, 24bpp
    Rgb24,
    /// Packed BGR, 24bpp
    Bgr24,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra | Self::Rgba => 4,
            Self::Rgb24 | Self::Bgr24 => 3,
        }
    }

    /**
        Size in bytes of a tightly packed image in this format.
    */
    pub const fn frame_size(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }
}

/**
    Audio sample formats.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SampleFormat {
    /// 32-bit floating point, range [-1.0, 1.0]
    F32,
    /// Signed 16-bit integer
    S16,
    /// Unsigned 8-bit integer
    U8,
}

impl SampleFormat {
    /**
        Returns the number of bytes per sample.
    */
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::F32 => 4,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32)
    }
}

/**
    Audio channel layout.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ChannelLayout {
    /// Single channel
    Mono,
    /// Left and right channels
    Stereo,
}

impl ChannelLayout {
    /**
        Returns the number of channels.
    */
    pub const fn channels(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }

    /**
        Pick a layout for a raw channel count, folding anything wider
        than two channels down to stereo.
    */
    pub const fn from_count(count: u16) -> Self {
        match count {
            1 => Self::Mono,
            _ => Self::Stereo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_format_frame_size() {
        assert_eq!(PixelFormat::Bgra.frame_size(100, 50), 100 * 50 * 4);
        assert_eq!(PixelFormat::Rgb24.frame_size(2, 2), 12);
    }

    #[test]
    fn sample_format_bytes_per_sample() {
        assert_eq!(SampleFormat::U8.bytes_per_sample(), 1);
        assert_eq!(SampleFormat::S16.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::F32.bytes_per_sample(), 4);
        assert!(SampleFormat::F32.is_float());
        assert!(!SampleFormat::S16.is_float());
    }

    #[test]
    fn channel_layout_from_count() {
        assert_eq!(ChannelLayout::from_count(1), ChannelLayout::Mono);
        assert_eq!(ChannelLayout::from_count(2), ChannelLayout::Stereo);
        assert_eq!(ChannelLayout::from_count(6), ChannelLayout::Stereo);
        assert_eq!(ChannelLayout::Stereo.channels(), 2);
    }
}
