/*!
    Presentation configuration types.
*/

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default duration of media a queue may buffer.
pub const DEFAULT_CAPACITY: Duration = Duration::from_millis(1000);

/// Default slack before a presentation moment during which items are held back.
pub const DEFAULT_EARLY_WINDOW: Duration = Duration::from_millis(50);

/// Default slack after a presentation moment beyond which items are dropped.
pub const DEFAULT_LATE_WINDOW: Duration = Duration::from_millis(50);

/**
    Which streams a session presents, and whether it paces them.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Play audio and video streams in real time.
    #[default]
    AudioVideo,
    /// Play only audio streams, in real time.
    AudioOnly,
    /// Play only video streams, in real time.
    VideoOnly,
    /// Show only video, as fast as frames arrive.
    FastVideoOnly,
    /// Present nothing.
    Disabled,
}

impl PlaybackMode {
    pub const fn plays_audio(self) -> bool {
        matches!(self, Self::AudioVideo | Self::AudioOnly)
    }

    pub const fn shows_video(self) -> bool {
        matches!(self, Self::AudioVideo | Self::VideoOnly | Self::FastVideoOnly)
    }

    pub const fn is_realtime(self) -> bool {
        matches!(self, Self::AudioVideo | Self::AudioOnly | Self::VideoOnly)
    }
}

/**
    Scheduling hint for a queue worker.

    Only reported in the worker's startup log; the standard library has no
    portable way to change OS thread priority.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerPriority {
    #[default]
    Low,
    Normal,
    High,
}

/**
    Buffering and pacing windows for one kind of stream.

    Durations are stored in milliseconds so configuration files stay readable.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueTiming {
    pub capacity_ms: u64,
    pub early_window_ms: u64,
    pub late_window_ms: u64,
}

impl Default for QueueTiming {
    fn default() -> Self {
        Self {
            capacity_ms: DEFAULT_CAPACITY.as_millis() as u64,
            early_window_ms: DEFAULT_EARLY_WINDOW.as_millis() as u64,
            late_window_ms: DEFAULT_LATE_WINDOW.as_millis() as u64,
        }
    }
}

impl QueueTiming {
    pub fn capacity(&self) -> Duration {
        Duration::from_millis(self.capacity_ms)
    }

    pub fn early_window(&self) -> Duration {
        Duration::from_millis(self.early_window_ms)
    }

    pub fn late_window(&self) -> Duration {
        Duration::from_millis(self.late_window_ms)
    }
}

/**
    Configuration for a presentation session.
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    pub mode: PlaybackMode,
    /**
        Pace media against the wall clock. When false, sinks are called
        directly as frames arrive, whatever the mode says.
    */
    pub realtime: bool,
    pub video: QueueTiming,
    pub audio: QueueTiming,
    pub priority: WorkerPriority,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            mode: PlaybackMode::default(),
            realtime: true,
            video: QueueTiming::default(),
            audio: QueueTiming::default(),
            priority: WorkerPriority::default(),
        }
    }
}

impl PresenterConfig {
    pub fn new(mode: PlaybackMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /**
        Whether items go through presentation queues at all.
    */
    pub fn is_paced(&self) -> bool {
        self.realtime && self.mode.is_realtime()
    }
}

/**
    Construction parameters for a single presentation queue.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// Diagnostic name, also used for the worker thread.
    pub name: String,
    pub capacity: Duration,
    pub early_window: Duration,
    pub late_window: Duration,
    pub priority: WorkerPriority,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: DEFAULT_CAPACITY,
            early_window: DEFAULT_EARLY_WINDOW,
            late_window: DEFAULT_LATE_WINDOW,
            priority: WorkerPriority::default(),
        }
    }

    /**
        Build a queue config from a stream kind's timing section.
    */
    pub fn from_timing(name: impl Into<String>, timing: &QueueTiming) -> Self {
        Self::new(name)
            .with_capacity(timing.capacity())
            .with_early_window(timing.early_window())
            .with_late_window(timing.late_window())
    }

    pub fn with_capacity(mut self, capacity: Duration) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_early_window(mut self, window: Duration) -> Self {
        self.early_window = window;
        self
    }

    pub fn with_late_window(mut self, window: Duration) -> Self {
        self.late_window = window;
        self
    }

    pub fn with_priority(mut self, priority: WorkerPriority) -> Self {
        self.priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_flags() {
        assert!(PlaybackMode::AudioVideo.plays_audio());
        assert!(PlaybackMode::AudioVideo.shows_video());
        assert!(!PlaybackMode::AudioOnly.shows_video());
        assert!(!PlaybackMode::VideoOnly.plays_audio());
        assert!(PlaybackMode::FastVideoOnly.shows_video());
        assert!(!PlaybackMode::FastVideoOnly.is_realtime());
        assert!(!PlaybackMode::Disabled.plays_audio());
        assert!(!PlaybackMode::Disabled.shows_video());
    }

    #[test]
    fn default_config_is_paced() {
        let config = PresenterConfig::default();
        assert!(config.realtime);
        assert!(config.is_paced());
        assert_eq!(config.video.early_window(), Duration::from_millis(50));
        assert_eq!(config.audio.capacity(), Duration::from_secs(1));
    }

    #[test]
    fn realtime_off_disables_pacing() {
        let config = PresenterConfig {
            realtime: false,
            ..PresenterConfig::default()
        };
        assert!(!config.is_paced());
        assert!(!PresenterConfig::new(PlaybackMode::FastVideoOnly).is_paced());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PresenterConfig =
            serde_json::from_str(r#"{ "mode": "video_only", "video": { "capacity_ms": 3000 } }"#)
                .unwrap();
        assert_eq!(config.mode, PlaybackMode::VideoOnly);
        assert!(config.realtime);
        assert_eq!(config.video.capacity_ms, 3000);
        assert_eq!(config.video.late_window_ms, 50);
        assert_eq!(config.audio, QueueTiming::default());
    }

    #[test]
    fn queue_config_from_timing() {
        let timing = QueueTiming {
            capacity_ms: 3000,
            early_window_ms: 20,
            late_window_ms: 80,
        };
        let config = QueueConfig::from_timing("video 0", &timing).with_priority(WorkerPriority::High);
        assert_eq!(config.name, "video 0");
        assert_eq!(config.capacity, Duration::from_secs(3));
        assert_eq!(config.early_window, Duration::from_millis(20));
        assert_eq!(config.late_window, Duration::from_millis(80));
        assert_eq!(config.priority, WorkerPriority::High);
    }
}
