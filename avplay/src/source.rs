/*!
    Synthetic decode pipeline.

    Produces the events a real demuxer/decoder would: stream announcements,
    decoded frames and audio blocks in presentation order, then a close.
    Video is a scrolling test pattern per stream, audio a sine tone.
*/

use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::time::Duration;

use media_types::{
    AudioFormat, AudioFrame, DecodedMedia, MediaEvent, PixelFormat, Pts, Rational, SampleFormat,
    StreamKind, VideoFrame, duration_to_micros,
};

const TONE_HZ: f32 = 440.0;
const TONE_AMPLITUDE: f32 = 0.2;

/// Audio block length, as a fraction of a second
const BLOCKS_PER_SECOND: u32 = 50;

#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub video_streams: usize,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub duration: Duration,
    /// Audio format to generate, or None for no audio stream
    pub audio: Option<AudioFormat>,
}

pub struct SyntheticSource {
    spec: SourceSpec,
    end: i64,
    pending: VecDeque<MediaEvent>,
    next_frame: i64,
    next_sample: i64,
    phase: f32,
    closed: bool,
}

impl SyntheticSource {
    pub fn new(spec: SourceSpec) -> Self {
        let mut pending = VecDeque::new();
        for index in 0..spec.video_streams {
            pending.push_back(MediaEvent::StreamAdded {
                index,
                kind: StreamKind::Video,
            });
        }
        if spec.audio.is_some() {
            pending.push_back(MediaEvent::StreamAdded {
                index: spec.video_streams,
                kind: StreamKind::Audio,
            });
        }

        Self {
            end: duration_to_micros(spec.duration),
            spec,
            pending,
            next_frame: 0,
            next_sample: 0,
            phase: 0.0,
            closed: false,
        }
    }

    pub fn audio_index(&self) -> Option<usize> {
        self.spec.audio.map(|_| self.spec.video_streams)
    }

    fn next_video_due(&self) -> Option<i64> {
        if self.spec.video_streams == 0 || self.spec.fps == 0 {
            return None;
        }
        let ts = Pts(self.next_frame).to_micros(Rational::new(1, self.spec.fps as i32));
        (ts < self.end).then_some(ts)
    }

    fn next_audio_due(&self) -> Option<i64> {
        let format = self.spec.audio?;
        if format.sample_rate == 0 {
            return None;
        }
        let ts = Pts(self.next_sample).to_micros(Rational::new(1, format.sample_rate as i32));
        (ts < self.end).then_some(ts)
    }

    fn emit_video(&mut self, timestamp: i64) -> Option<MediaEvent> {
        let frame = self.next_frame;
        self.next_frame += 1;
        for index in 0..self.spec.video_streams {
            let image = test_pattern(self.spec.width, self.spec.height, index, frame);
            self.pending
                .push_back(MediaEvent::decoded(index, DecodedMedia::Video(image), timestamp));
        }
        self.pending.pop_front()
    }

    fn emit_audio(&mut self, format: AudioFormat, timestamp: i64) -> Option<MediaEvent> {
        let samples = (format.sample_rate / BLOCKS_PER_SECOND).max(1) as usize;
        self.next_sample += samples as i64;

        let step = TAU * TONE_HZ / format.sample_rate as f32;
        let channels = format.channels.channels() as usize;
        let mut data = Vec::with_capacity(samples * format.bytes_per_frame());
        for _ in 0..samples {
            let value = self.phase.sin() * TONE_AMPLITUDE;
            self.phase = (self.phase + step) % TAU;
            for _ in 0..channels {
                push_sample(&mut data, format.format, value);
            }
        }

        let block = AudioFrame::new(
            data,
            samples,
            format.sample_rate,
            format.channels,
            format.format,
        );
        let index = self.spec.video_streams;
        Some(MediaEvent::decoded(index, DecodedMedia::Audio(block), timestamp))
    }
}

impl Iterator for SyntheticSource {
    type Item = MediaEvent;

    fn next(&mut self) -> Option<MediaEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        match (self.next_video_due(), self.next_audio_due(), self.spec.audio) {
            (Some(video), audio, _) if audio.is_none_or(|audio| video <= audio) => {
                self.emit_video(video)
            }
            (_, Some(audio), Some(format)) => self.emit_audio(format, audio),
            _ if !self.closed => {
                self.closed = true;
                Some(MediaEvent::Close)
            }
            _ => None,
        }
    }
}

fn push_sample(data: &mut Vec<u8>, format: SampleFormat, value: f32) {
    match format {
        SampleFormat::F32 => data.extend_from_slice(&value.to_ne_bytes()),
        SampleFormat::S16 => data.extend_from_slice(&((value * 32767.0) as i16).to_ne_bytes()),
        SampleFormat::U8 => data.push((value * 127.0 + 128.0) as u8),
        other => data.extend(std::iter::repeat_n(0, other.bytes_per_sample())),
    }
}

/**
    BGRA frame: a per-stream background with a white bar that moves one
    column per frame.
*/
fn test_pattern(width: u32, height: u32, stream: usize, frame: i64) -> VideoFrame {
    let background = [
        (40 + stream * 60 % 200) as u8,
        (80 + stream * 30 % 150) as u8,
        (120 + stream * 90 % 120) as u8,
        255,
    ];
    let bar = if width == 0 {
        0
    } else {
        (frame as u64 % width as u64) as u32
    };

    let mut data = Vec::with_capacity(PixelFormat::Bgra.frame_size(width, height));
    for _ in 0..height {
        for x in 0..width {
            if x == bar {
                data.extend_from_slice(&[255, 255, 255, 255]);
            } else {
                data.extend_from_slice(&background);
            }
        }
    }
    VideoFrame::new(data, width, height, PixelFormat::Bgra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_types::ChannelLayout;

    fn spec(video_streams: usize, audio: bool) -> SourceSpec {
        SourceSpec {
            video_streams,
            fps: 25,
            width: 8,
            height: 4,
            duration: Duration::from_millis(200),
            audio: audio.then(|| AudioFormat::new(1_000, ChannelLayout::Stereo, SampleFormat::F32)),
        }
    }

    fn timestamp(event: &MediaEvent) -> Option<i64> {
        match event {
            MediaEvent::Decoded { timestamp, .. } => Some(*timestamp),
            _ => None,
        }
    }

    #[test]
    fn announces_streams_then_closes() {
        let events: Vec<MediaEvent> = SyntheticSource::new(spec(2, true)).collect();

        assert!(matches!(
            events[0],
            MediaEvent::StreamAdded {
                index: 0,
                kind: StreamKind::Video
            }
        ));
        assert!(matches!(
            events[2],
            MediaEvent::StreamAdded {
                index: 2,
                kind: StreamKind::Audio
            }
        ));
        assert!(matches!(events.last(), Some(MediaEvent::Close)));
    }

    #[test]
    fn events_come_in_presentation_order() {
        let events: Vec<i64> = SyntheticSource::new(spec(1, true))
            .filter_map(|e| timestamp(&e))
            .collect();
        assert!(events.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn frame_and_block_counts() {
        let mut video = 0;
        let mut audio = 0;
        for event in SyntheticSource::new(spec(2, true)) {
            if let MediaEvent::Decoded { media, .. } = event {
                match media {
                    DecodedMedia::Video(frame) => {
                        assert!(frame.is_complete());
                        video += 1;
                    }
                    DecodedMedia::Audio(block) => {
                        assert_eq!(block.data.len(), block.expected_data_len());
                        audio += 1;
                    }
                }
            }
        }
        // 200 ms at 25 fps for two streams, and 20 ms blocks.
        assert_eq!(video, 10);
        assert_eq!(audio, 10);
    }

    #[test]
    fn no_audio_stream_without_format() {
        let source = SyntheticSource::new(spec(1, false));
        assert_eq!(source.audio_index(), None);
        assert!(
            source
                .filter(|e| matches!(e, MediaEvent::StreamAdded { .. }))
                .all(|e| matches!(e, MediaEvent::StreamAdded { kind: StreamKind::Video, .. }))
        );
    }
}
