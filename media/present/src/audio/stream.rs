use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;
use ringbuf::{
    HeapRb,
    traits::{Consumer, Observer, Producer, Split},
};

/// Atomic f32 wrapper for thread-safe volume control
pub struct AtomicF32 {
    inner: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            inner: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn load(&self, ordering: Ordering) -> f32 {
        f32::from_bits(self.inner.load(ordering))
    }

    pub fn store(&self, value: f32, ordering: Ordering) {
        self.inner.store(value.to_bits(), ordering);
    }
}

/// Default ring size in samples (~1 second of stereo audio at 48kHz)
pub const DEFAULT_RING_SAMPLES: usize = 48_000 * 2;

#[derive(Default)]
struct StreamFlags {
    /// Producer has written its last sample.
    ended: AtomicBool,
    /// Nothing will read from the consumer any more.
    detached: AtomicBool,
}

/// Producer half of an audio stream, owned by an audio sink.
pub struct AudioStreamProducer {
    producer: ringbuf::HeapProd<f32>,
    flags: Arc<StreamFlags>,
}

impl AudioStreamProducer {
    /// Push samples without blocking. Returns number of samples written.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }

    /// Free space in samples
    pub fn vacant(&self) -> usize {
        self.producer.vacant_len()
    }

    /// Samples waiting to be played
    pub fn buffered(&self) -> usize {
        self.producer.occupied_len()
    }

    /// Ring size in samples
    pub fn capacity(&self) -> usize {
        self.producer.capacity().get()
    }

    /// Signal end of stream
    pub fn close(&self) {
        self.flags.ended.store(true, Ordering::Release);
    }

    /// True once the consumer side has been dropped or detached
    pub fn is_detached(&self) -> bool {
        self.flags.detached.load(Ordering::Acquire)
    }
}

/**
    Consumer half of an audio stream, pulled by an output callback.

    The lock is only contended if diagnostics read the fill level while the
    callback runs; the callback itself uses `try_lock` and never blocks.
*/
pub struct AudioStreamConsumer {
    consumer: Mutex<ringbuf::HeapCons<f32>>,
    volume: AtomicF32,
    flags: Arc<StreamFlags>,
}

impl AudioStreamConsumer {
    /// Get current volume (0.0 to 1.0)
    pub fn volume(&self) -> f32 {
        self.volume.load(Ordering::Relaxed)
    }

    /// Set volume (0.0 to 1.0)
    pub fn set_volume(&self, volume: f32) {
        self.volume.store(volume.clamp(0.0, 1.0), Ordering::Relaxed);
    }

    /// Check if the stream has ended and been played out
    pub fn is_ended(&self) -> bool {
        self.flags.ended.load(Ordering::Acquire) && self.available() == 0
    }

    /// Stop reading; a blocked producer gives up instead of waiting forever
    pub fn detach(&self) {
        self.flags.detached.store(true, Ordering::Release);
    }

    /// Check how many samples are available
    pub fn available(&self) -> usize {
        self.consumer.lock().occupied_len()
    }

    /// Fill the output buffer with samples, applying volume.
    /// Anything not covered by buffered samples is silence.
    ///
    /// Returns: Number of samples actually read
    pub fn fill_buffer(&self, output: &mut [f32]) -> usize {
        let Some(mut consumer) = self.consumer.try_lock() else {
            output.fill(0.0);
            return 0;
        };

        let read = consumer.pop_slice(output);
        let volume = self.volume();
        for sample in &mut output[..read] {
            *sample *= volume;
        }
        output[read..].fill(0.0);
        read
    }
}

impl Drop for AudioStreamConsumer {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Create a new audio stream pair (producer for a sink, consumer for playback)
pub fn create_audio_stream(capacity_samples: usize) -> (AudioStreamProducer, AudioStreamConsumer) {
    let rb = HeapRb::<f32>::new(capacity_samples.max(1));
    let (producer, consumer) = rb.split();
    let flags = Arc::new(StreamFlags::default());

    (
        AudioStreamProducer {
            producer,
            flags: Arc::clone(&flags),
        },
        AudioStreamConsumer {
            consumer: Mutex::new(consumer),
            volume: AtomicF32::new(1.0),
            flags,
        },
    )
}

static_assertions::assert_impl_all!(AudioStreamProducer: Send);
static_assertions::assert_impl_all!(AudioStreamConsumer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_applies_volume_and_pads_silence() {
        let (mut producer, consumer) = create_audio_stream(8);
        assert_eq!(producer.push(&[1.0, -1.0, 0.5]), 3);
        consumer.set_volume(0.5);

        let mut out = [9.0f32; 5];
        assert_eq!(consumer.fill_buffer(&mut out), 3);
        assert_eq!(out, [0.5, -0.5, 0.25, 0.0, 0.0]);
    }

    #[test]
    fn push_stops_when_full() {
        let (mut producer, consumer) = create_audio_stream(4);
        assert_eq!(producer.push(&[0.0; 6]), 4);
        assert_eq!(producer.vacant(), 0);
        assert_eq!(consumer.available(), 4);
    }

    #[test]
    fn ended_after_close_and_drain() {
        let (mut producer, consumer) = create_audio_stream(4);
        producer.push(&[0.1, 0.2]);
        producer.close();
        assert!(!consumer.is_ended());

        let mut out = [0.0f32; 2];
        consumer.fill_buffer(&mut out);
        assert!(consumer.is_ended());
    }

    #[test]
    fn dropping_consumer_detaches() {
        let (producer, consumer) = create_audio_stream(4);
        assert!(!producer.is_detached());
        drop(consumer);
        assert!(producer.is_detached());
    }

    #[test]
    fn volume_is_clamped() {
        let (_producer, consumer) = create_audio_stream(4);
        consumer.set_volume(3.0);
        assert_eq!(consumer.volume(), 1.0);
    }
}
