/*!
    Error types for presentation scheduling.
*/

use media_types::AudioFormat;
use thiserror::Error;

/**
    Failure reported by a sink while presenting an item.

    Any sink error is fatal to the queue worker that owns the sink.
*/
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),
    #[error("audio format mismatch: sink expects {expected:?}, got {actual:?}")]
    FormatMismatch {
        expected: AudioFormat,
        actual: AudioFormat,
    },
    #[error("sink closed")]
    Closed,
    #[error(transparent)]
    Media(#[from] media_types::Error),
}

/**
    Errors surfaced by queues and sessions.
*/
#[derive(Debug, Error)]
pub enum PresentError {
    #[error("failed to spawn worker for {name}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("worker for {name} panicked")]
    WorkerPanicked { name: String },
    #[error("sink for {name} failed")]
    Sink {
        name: String,
        #[source]
        source: SinkError,
    },
}

pub type Result<T, E = PresentError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn device_failures_pass_through() {
        let e = SinkError::from(media_types::Error::device("failed to start stream: busy"));
        assert!(matches!(e, SinkError::Media(media_types::Error::Device { .. })));
        assert_eq!(e.to_string(), "device error: failed to start stream: busy");
    }

    #[test]
    fn sink_failure_names_the_queue() {
        let e = PresentError::Sink {
            name: "video 0".into(),
            source: SinkError::Closed,
        };
        assert_eq!(e.to_string(), "sink for video 0 failed");
        assert_eq!(e.source().map(|s| s.to_string()).as_deref(), Some("sink closed"));
    }
}
