//! Element lifetime accounting.
//!
//! Every element is a [`Tracked`] value that bumps shared counters when it is
//! created and when it is dropped. The queue must never drop a slot it did not
//! fill, never drop a slot twice, and drop whatever is still queued when it
//! goes away.
#![cfg(not(loom))]

use basalt_spsc::SpscQueue;
use crossbeam_utils::Backoff;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[derive(Default)]
struct Counters {
    created: AtomicUsize,
    dropped: AtomicUsize,
}

impl Counters {
    fn live(&self) -> usize {
        self.created.load(Ordering::SeqCst) - self.dropped.load(Ordering::SeqCst)
    }

    fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

struct Tracked {
    id: u32,
    counters: Arc<Counters>,
}

impl Tracked {
    fn new(id: u32, counters: &Arc<Counters>) -> Self {
        counters.created.fetch_add(1, Ordering::SeqCst);
        Self {
            id,
            counters: Arc::clone(counters),
        }
    }

    /// Fails for odd ids; nothing is counted on failure.
    fn try_new(id: u32, counters: &Arc<Counters>) -> Result<Self, String> {
        if id % 2 == 1 {
            return Err(format!("odd id {id}"));
        }
        Ok(Self::new(id, counters))
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn live_count_matches_pushes_minus_pops() {
    let counters = Arc::new(Counters::default());
    let mut queue = SpscQueue::<Tracked>::with_capacity(5).unwrap();
    let (mut tx, mut rx) = queue.split();

    let mut pushes = 0usize;
    let mut pops = 0usize;
    for round in 0..50u32 {
        for k in 0..3 {
            if tx.try_emplace(|| Tracked::new(round * 10 + k, &counters)) {
                pushes += 1;
            }
        }
        if let Some(item) = rx.try_pop() {
            drop(item);
            pops += 1;
        }
        assert_eq!(counters.live(), pushes - pops);
        assert_eq!(rx.len(), pushes - pops);
    }
}

#[test]
fn rejected_push_returns_value_without_dropping() {
    let counters = Arc::new(Counters::default());
    let mut queue = SpscQueue::<Tracked>::with_capacity(2).unwrap();
    let (mut tx, _rx) = queue.split();

    assert!(tx.try_push(Tracked::new(0, &counters)).is_ok());
    let back = tx.try_push(Tracked::new(1, &counters)).err().unwrap();
    assert_eq!(back.id, 1);
    assert_eq!(counters.dropped(), 0);
    drop(back);
    assert_eq!(counters.dropped(), 1);
}

/// Pushes six, pops five and pushes five more, so the occupied region of a
/// 7- or 8-slot queue straddles the wrap point when the queue is dropped.
fn teardown_after_wrap(slots: usize) {
    let counters = Arc::new(Counters::default());
    {
        let mut queue = SpscQueue::<Tracked>::with_capacity(slots).unwrap();
        let (mut tx, mut rx) = queue.split();
        for id in 0..6 {
            assert!(tx.try_emplace(|| Tracked::new(id, &counters)));
        }
        for _ in 0..5 {
            rx.try_pop().unwrap();
        }
        for id in 6..11 {
            assert!(tx.try_emplace(|| Tracked::new(id, &counters)));
        }
        assert_eq!(counters.dropped(), 5);
        assert_eq!(counters.live(), 6);
    }
    assert_eq!(counters.live(), 0, "slots={slots}");
    assert_eq!(counters.dropped(), 11, "slots={slots}");
}

#[test]
fn dropping_queue_drops_remaining_elements_once() {
    teardown_after_wrap(8);
}

#[test]
fn dropping_odd_sized_queue_drops_wrapped_region_once() {
    // Not a power of two: exercises the compare-and-reset wrap in teardown.
    teardown_after_wrap(7);
}

#[test]
fn failed_constructor_counts_nothing() {
    let counters = Arc::new(Counters::default());
    let mut queue = SpscQueue::<Tracked>::with_capacity(4).unwrap();
    let (mut tx, mut rx) = queue.split();

    assert!(matches!(tx.try_emplace_with(|| Tracked::try_new(0, &counters)), Ok(true)));
    assert!(matches!(tx.try_emplace_with(|| Tracked::try_new(1, &counters)), Err(_)));
    assert!(matches!(tx.try_emplace_with(|| Tracked::try_new(2, &counters)), Ok(true)));
    assert_eq!(counters.live(), 2);

    assert_eq!(rx.try_pop().map(|t| t.id), Some(0));
    assert_eq!(rx.try_pop().map(|t| t.id), Some(2));
    assert!(rx.try_pop().is_none());
    assert_eq!(counters.live(), 0);
}

#[test]
fn concurrent_transfer_drops_everything() {
    const COUNT: u32 = 20_000;
    let counters = Arc::new(Counters::default());
    {
        let mut queue = SpscQueue::<Tracked>::with_capacity(16).unwrap();
        let (mut tx, mut rx) = queue.split();
        let producer_counters = Arc::clone(&counters);

        thread::scope(|s| {
            s.spawn(move || {
                for id in 0..COUNT {
                    let backoff = Backoff::new();
                    while !tx.try_emplace(|| Tracked::new(id, &producer_counters)) {
                        backoff.snooze();
                    }
                }
            });
            s.spawn(move || {
                // Leave the tail of the stream queued for teardown.
                for id in 0..COUNT - 10 {
                    let backoff = Backoff::new();
                    let item = loop {
                        if let Some(item) = rx.try_pop() {
                            break item;
                        }
                        backoff.snooze();
                    };
                    assert_eq!(item.id, id);
                }
            });
        });
        assert_eq!(queue.len(), 10);
    }
    assert_eq!(counters.dropped(), COUNT as usize);
    assert_eq!(counters.live(), 0);
}
