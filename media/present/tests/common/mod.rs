#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use media_present::{PresentationQueue, PresentationSink, SinkError};

/// One presented item: its timestamp and when the sink saw it.
pub type Entry = (i64, Instant);

/**
    Sink that records what it was handed and when.
*/
#[derive(Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Entry>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.log.lock().clone()
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.log.lock().iter().map(|(ts, _)| *ts).collect()
    }

    pub fn presented_at(&self, timestamp: i64) -> Option<Instant> {
        self.log
            .lock()
            .iter()
            .find(|(ts, _)| *ts == timestamp)
            .map(|(_, at)| *at)
    }
}

impl<T: Send + 'static> PresentationSink<T> for Recorder {
    fn dispatch(&mut self, _payload: T, timestamp: i64) -> Result<(), SinkError> {
        self.log.lock().push((timestamp, Instant::now()));
        Ok(())
    }
}

/**
    Sink that fails every dispatch.
*/
pub struct Broken;

impl<T: Send + 'static> PresentationSink<T> for Broken {
    fn dispatch(&mut self, _payload: T, _timestamp: i64) -> Result<(), SinkError> {
        Err(SinkError::Unavailable("display lost".into()))
    }
}

/**
    Wait until the worker has taken every queued item.
*/
pub fn wait_until_taken<T>(queue: &PresentationQueue<T>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !queue.is_empty() {
        assert!(Instant::now() < deadline, "worker never took the queued items");
        thread::sleep(Duration::from_millis(1));
    }
}

pub const MS: i64 = 1_000;
