/*!
    Timestamped payloads.
*/

use media_types::TimeUnit;

/**
    A payload paired with its presentation timestamp in microseconds.

    Created by the producer, consumed exactly once by a queue worker.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimestampedItem<T> {
    payload: T,
    timestamp: i64,
}

impl<T> TimestampedItem<T> {
    pub fn new(payload: T, timestamp_micros: i64) -> Self {
        Self {
            payload,
            timestamp: timestamp_micros,
        }
    }

    /**
        Create an item from a timestamp expressed in `unit`.
    */
    pub fn with_unit(payload: T, timestamp: i64, unit: TimeUnit) -> Self {
        Self::new(payload, unit.to_micros(timestamp))
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_parts(self) -> (T, i64) {
        (self.payload, self.timestamp)
    }
}
