mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use media_present::{PresentationQueue, QueueConfig};
use media_types::{ClockAnchor, TimeUnit};

use common::{MS, Recorder, wait_until_taken};

const TOLERANCE: Duration = Duration::from_millis(1);

fn windows(name: &str, early_ms: u64, late_ms: u64) -> QueueConfig {
    QueueConfig::new(name)
        .with_early_window(Duration::from_millis(early_ms))
        .with_late_window(Duration::from_millis(late_ms))
}

#[test]
fn scenario_three_second_capacity() {
    let anchor = Arc::new(ClockAnchor::new());
    let recorder = Recorder::new();
    let config = windows("scenario", 50, 50).with_capacity(Duration::from_secs(3));
    let queue = PresentationQueue::new(config, Arc::clone(&anchor), recorder.clone()).unwrap();

    for ts in [0, 1_000, 2_000] {
        assert!(queue.offer(0u8, ts, TimeUnit::Milliseconds));
    }
    // 3100 - 0 > 3000, so this only fits once the 0 ms item has left the queue.
    assert!(queue.offer(0u8, 3_100, TimeUnit::Milliseconds));
    let stats = queue.stats();
    assert!(stats.queued <= 3);
    assert!(stats.buffered_micros <= 2_100 * MS, "0 ms item still queued");

    queue.flush();

    assert_eq!(
        recorder.timestamps(),
        vec![0, 1_000 * MS, 2_000 * MS, 3_100 * MS]
    );
    let origin = anchor.origin().unwrap();
    for (ts, at) in recorder.entries() {
        let earliest = origin.due_at(ts) - Duration::from_millis(50);
        assert!(at + TOLERANCE >= earliest, "{ts} presented too early");
    }
}

#[test]
fn item_200ms_late_is_dropped() {
    let anchor = Arc::new(ClockAnchor::new());
    anchor.try_set_origin(Instant::now() - Duration::from_millis(200), 0);
    let recorder = Recorder::new();
    let queue =
        PresentationQueue::new(windows("late", 50, 50), anchor, recorder.clone()).unwrap();

    assert!(queue.offer(0u8, 0, TimeUnit::Milliseconds));
    assert!(queue.offer(0u8, 400, TimeUnit::Milliseconds));
    queue.flush();

    assert_eq!(recorder.timestamps(), vec![400 * MS]);
    let stats = queue.stats();
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.dispatched, 1);
}

#[test]
fn early_item_waits_for_its_window() {
    let anchor = Arc::new(ClockAnchor::new());
    let recorder = Recorder::new();
    let queue = PresentationQueue::new(
        windows("early", 50, 50),
        Arc::clone(&anchor),
        recorder.clone(),
    )
    .unwrap();

    assert!(queue.offer(0u8, 0, TimeUnit::Milliseconds));
    assert!(queue.offer(0u8, 300, TimeUnit::Milliseconds));
    queue.flush();

    let origin = anchor.origin().unwrap();
    let at = recorder.presented_at(300 * MS).unwrap();
    assert!(at + TOLERANCE >= origin.wall + Duration::from_millis(250));
}

#[test]
fn offer_blocks_while_over_capacity() {
    let anchor = Arc::new(ClockAnchor::new());
    let started = Instant::now();
    anchor.try_set_origin(started, 0);
    let recorder = Recorder::new();
    let config = windows("capacity", 10, 50).with_capacity(Duration::from_millis(100));
    let queue = PresentationQueue::new(config, anchor, recorder.clone()).unwrap();

    // The worker holds this one until ~490 ms.
    assert!(queue.offer(0u8, 500, TimeUnit::Milliseconds));
    wait_until_taken(&queue);
    assert!(queue.offer(0u8, 600, TimeUnit::Milliseconds));

    // 750 - 600 > 100: blocks until the worker moves on to the 600 ms item.
    assert!(queue.offer(0u8, 750, TimeUnit::Milliseconds));
    assert!(started.elapsed() >= Duration::from_millis(400));
    assert_eq!(recorder.timestamps().first(), Some(&(500 * MS)));
    assert!(queue.stats().buffered_micros <= 100 * MS);

    queue.flush();
    assert_eq!(recorder.timestamps(), vec![500 * MS, 600 * MS, 750 * MS]);
}

#[test]
fn queues_share_one_origin() {
    let anchor = Arc::new(ClockAnchor::new());
    let first = Recorder::new();
    let second = Recorder::new();
    let a = PresentationQueue::new(windows("a", 50, 50), Arc::clone(&anchor), first.clone())
        .unwrap();
    let b = PresentationQueue::new(windows("b", 50, 50), Arc::clone(&anchor), second.clone())
        .unwrap();

    assert!(a.offer(0u8, 1_000, TimeUnit::Milliseconds));
    a.flush();
    let origin = anchor.origin().unwrap();
    assert_eq!(origin.stream, 1_000 * MS);

    // Scheduled against a's origin, so this waits ~150 ms instead of
    // becoming an origin of its own.
    assert!(b.offer(0u8, 1_200, TimeUnit::Milliseconds));
    b.flush();

    let at = second.presented_at(1_200 * MS).unwrap();
    assert!(at + TOLERANCE >= origin.wall + Duration::from_millis(150));
    assert_eq!(anchor.origin(), Some(origin));
}

#[test]
fn dispatch_order_is_monotonic() {
    let anchor = Arc::new(ClockAnchor::new());
    let recorder = Recorder::new();
    let queue =
        PresentationQueue::new(windows("order", 50, 10_000), anchor, recorder.clone()).unwrap();

    let mut timestamps: Vec<i64> = (0..20).map(|i| i * 5).collect();
    timestamps.swap(4, 5);
    timestamps.swap(11, 12);
    for ts in timestamps {
        assert!(queue.offer(0u8, ts, TimeUnit::Milliseconds));
    }
    queue.flush();

    let seen = recorder.timestamps();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    let stats = queue.stats();
    assert_eq!(stats.dispatched as usize, seen.len());
    assert_eq!(stats.dispatched + stats.dropped, 20);
}

#[test]
fn flush_accounts_for_every_offer() {
    let anchor = Arc::new(ClockAnchor::new());
    let recorder = Recorder::new();
    let queue =
        PresentationQueue::new(QueueConfig::new("flush"), anchor, recorder.clone()).unwrap();

    for i in 0..10 {
        assert!(queue.offer(i, i as i64 * 5, TimeUnit::Milliseconds));
    }
    queue.flush();

    let stats = queue.stats();
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.offered, 10);
    assert_eq!(stats.dispatched + stats.dropped, 10);
    assert_eq!(stats.abandoned, 0);
    assert_eq!(recorder.timestamps().len() as u64, stats.dispatched);
}

#[test]
fn close_wakes_blocked_producer() {
    let anchor = Arc::new(ClockAnchor::new());
    anchor.try_set_origin(Instant::now(), 0);
    let config = QueueConfig::new("wake").with_capacity(Duration::from_millis(10));
    let queue = Arc::new(PresentationQueue::new(config, anchor, Recorder::new()).unwrap());

    assert!(queue.offer(0u8, 30, TimeUnit::Seconds));
    wait_until_taken(&queue);
    assert!(queue.offer(0u8, 31, TimeUnit::Seconds));

    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.offer(0u8, 32, TimeUnit::Seconds))
    };
    thread::sleep(Duration::from_millis(30));
    queue.close();

    assert!(!producer.join().unwrap());
    let stats = queue.stats();
    assert_eq!(stats.dispatched, 0);
    assert_eq!(stats.offered, 2);
}
