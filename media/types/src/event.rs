/*!
    Events flowing from a decode pipeline into a presentation session.
*/

use serde::{Deserialize, Serialize};

use crate::{AudioFrame, TimeUnit, VideoFrame};

/**
    Type of media stream.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/**
    A decoded unit of media, tagged by kind.
*/
#[derive(Clone, Debug)]
pub enum DecodedMedia {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl DecodedMedia {
    pub fn kind(&self) -> StreamKind {
        match self {
            Self::Video(_) => StreamKind::Video,
            Self::Audio(_) => StreamKind::Audio,
        }
    }
}

/**
    Notifications a decode pipeline delivers, in order, on its own thread.
*/
#[derive(Clone, Debug)]
pub enum MediaEvent {
    /**
        A new stream was discovered in the source.
    */
    StreamAdded { index: usize, kind: StreamKind },
    /**
        A frame or audio block finished decoding.

        `timestamp` is the presentation time expressed in `unit`.
    */
    Decoded {
        index: usize,
        media: DecodedMedia,
        timestamp: i64,
        unit: TimeUnit,
    },
    /**
        The source is exhausted or playback was stopped.

        Recipients should present any remaining buffered media and release
        their outputs.
    */
    Close,
}

impl MediaEvent {
    /**
        Convenience constructor for a decoded event with a microsecond timestamp.
    */
    pub fn decoded(index: usize, media: DecodedMedia, timestamp_micros: i64) -> Self {
        Self::Decoded {
            index,
            media,
            timestamp: timestamp_micros,
            unit: TimeUnit::Microseconds,
        }
    }

    /**
        Stream index the event refers to, if any.
    */
    pub fn stream_index(&self) -> Option<usize> {
        match self {
            Self::StreamAdded { index, .. } | Self::Decoded { index, .. } => Some(*index),
            Self::Close => None,
        }
    }
}

static_assertions::assert_impl_all!(MediaEvent: Send);
