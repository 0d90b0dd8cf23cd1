/*!
    Shared types for the media presentation crates.

    This crate defines the vocabulary that crosses crate boundaries: what a
    decode pipeline hands over, and how time is expressed. It has no
    dependency on any codec library or audio backend.

    # Core Types

    - [`Rational`], [`Pts`] and [`TimeUnit`] - Timestamps and their units
    - [`VideoFrame`] and [`AudioFrame`] - Decoded frame data
    - [`PixelFormat`], [`SampleFormat`], [`ChannelLayout`] - Formats

    # Events

    - [`MediaEvent`] - What a decode pipeline reports, in order
    - [`DecodedMedia`] and [`StreamKind`] - Tagged decoded payloads

    # Clock Anchoring

    - [`ClockAnchor`] - Set-once wall/stream origin shared by a session
    - [`Origin`] - The anchored pair and delta arithmetic

    # Error Handling

    - [`Error`] - Common error type
*/

mod clock;
mod error;
mod event;
mod format;
mod frame;
mod rational;
mod timestamp;

pub use clock::{ClockAnchor, Origin};
pub use error::Error;
pub use event::{DecodedMedia, MediaEvent, StreamKind};
pub use format::{ChannelLayout, PixelFormat, SampleFormat};
pub use frame::{AudioFormat, AudioFrame, VideoFrame};
pub use rational::Rational;
pub use timestamp::{Pts, TimeUnit, duration_to_micros, micros_to_duration};
