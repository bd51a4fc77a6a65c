//! Bounded single-producer, single-consumer (SPSC) queue.
//!
//! One thread pushes, one thread pops, and the two only communicate through a
//! pair of atomic cursors:
//!
//! ```text
//!            read                 write
//!             │                     │
//!   ┌───┬───┬─▼─┬───┬───┬───┬───┬───▼───┬───┐
//!   │   │   │ a │ b │ c │ d │ e │ free  │   │
//!   └───┴───┴───┴───┴───┴───┴───┴───────┴───┘
//!             └──── occupied ────┘
//! ```
//!
//! # Protocol
//!
//! **Producer** (`try_push` / `try_emplace`):
//! 1. Load own `write` cursor (Relaxed)
//! 2. If `next(write)` equals the cached `read`, refresh the cache from the
//!    real `read` cursor (Acquire); still equal → full
//! 3. Write the element into slot `write`
//! 4. Store `next(write)` (Release) → element visible to the consumer
//!
//! **Consumer** (`try_pop`):
//! 1. Load own `read` cursor (Relaxed)
//! 2. If `read` equals the cached `write`, refresh the cache from the real
//!    `write` cursor (Acquire); still equal → empty
//! 3. Move the element out of slot `read`
//! 4. Store `next(read)` (Release) → slot reusable by the producer
//!
//! Each side's cursor lives on its own cache line next to that side's cache
//! of the other cursor, so the hot path of one thread never writes a line the
//! other thread reads unless it is publishing.
//!
//! # Thread Safety
//! - [`SpscQueue::split`] hands out exactly one [`Producer`] and one
//!   [`Consumer`]; both borrow the queue, so it cannot move or drop while
//!   either is alive.
//! - `Producer` and `Consumer` are `Send` (when `T: Send`) and take `&mut self`
//!   for every operation that touches the cursors.

use crate::alloc::{Heap, SlotAlloc};
use crate::error::QueueError;
use crate::ring::{QueueConfig, Wrap};
use crate::storage::Slots;
use crossbeam_utils::CachePadded;
use std::cell::Cell;
use std::convert::Infallible;
use std::fmt;

#[cfg(not(loom))]
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(loom)]
use loom::sync::atomic::{AtomicUsize, Ordering};

/// State written by the producer.
struct ProducerSide {
    /// Next slot to write. Published with Release.
    write: AtomicUsize,
    /// Last `read` value the producer observed.
    read_cache: Cell<usize>,
}

/// State written by the consumer.
struct ConsumerSide {
    /// Next slot to read. Published with Release.
    read: AtomicUsize,
    /// Last `write` value the consumer observed.
    write_cache: Cell<usize>,
}

/// A bounded SPSC queue with run-time slot count.
///
/// `slots` slots are reserved at construction; one stays free to tell "full"
/// from "empty", so [`capacity`](SpscQueue::capacity) is `slots - 1`.
///
/// # Example
/// ```
/// use basalt_spsc::SpscQueue;
///
/// let mut queue = SpscQueue::<u32>::with_capacity(16).unwrap();
/// let (mut tx, mut rx) = queue.split();
///
/// std::thread::scope(|s| {
///     s.spawn(move || {
///         for i in 0..100 {
///             while tx.try_push(i).is_err() {
///                 std::thread::yield_now();
///             }
///         }
///     });
///     s.spawn(move || {
///         for i in 0..100 {
///             loop {
///                 if let Some(v) = rx.try_pop() {
///                     assert_eq!(v, i);
///                     break;
///                 }
///                 std::thread::yield_now();
///             }
///         }
///     });
/// });
/// ```
pub struct SpscQueue<T, A: SlotAlloc = Heap> {
    slots: Slots<T, A>,
    wrap: Wrap,
    producer: CachePadded<ProducerSide>,
    consumer: CachePadded<ConsumerSide>,
}

// SAFETY: through `&SpscQueue` only the atomic cursors can be read. Slot and
// cache access goes through `Producer`/`Consumer`, of which `split` creates
// exactly one each, and the cursor protocol keeps their slot ranges disjoint.
unsafe impl<T: Send, A: SlotAlloc + Sync> Sync for SpscQueue<T, A> {}

impl<T> SpscQueue<T> {
    /// Creates a heap-backed queue with `slots` slots.
    ///
    /// # Errors
    /// See [`SpscQueue::new_in`].
    pub fn with_capacity(slots: usize) -> Result<Self, QueueError> {
        Self::with_capacity_in(slots, Heap)
    }
}

impl<T, A: SlotAlloc> SpscQueue<T, A> {
    /// Creates a queue with `slots` slots backed by `alloc`.
    pub fn with_capacity_in(slots: usize, alloc: A) -> Result<Self, QueueError> {
        Self::new_in(QueueConfig::new(slots)?, alloc)
    }

    /// Creates a queue from a validated config, backed by `alloc`.
    ///
    /// No element is constructed; both cursors start at slot 0.
    ///
    /// # Errors
    /// - [`QueueError::CapacityOverflow`] if `slots × size_of::<T>()` does not
    ///   fit in a single allocation
    /// - [`QueueError::AllocFailed`] if `alloc` cannot provide the block
    pub fn new_in(cfg: QueueConfig, alloc: A) -> Result<Self, QueueError> {
        let slots = Slots::new_in(cfg.slots(), alloc)?;
        Ok(Self {
            slots,
            wrap: cfg.wrap(),
            producer: CachePadded::new(ProducerSide {
                write: AtomicUsize::new(0),
                read_cache: Cell::new(0),
            }),
            consumer: CachePadded::new(ConsumerSide {
                read: AtomicUsize::new(0),
                write_cache: Cell::new(0),
            }),
        })
    }

    /// Splits the queue into its producer and consumer halves.
    ///
    /// Calling `split` again after both halves are dropped resumes from the
    /// same state; queued elements are kept.
    pub fn split(&mut self) -> (Producer<'_, T, A>, Consumer<'_, T, A>) {
        let queue: &Self = self;
        (Producer { queue }, Consumer { queue })
    }

    /// Snapshot of the number of queued elements.
    #[inline]
    pub fn len(&self) -> usize {
        let read = self.consumer.read.load(Ordering::Acquire);
        let write = self.producer.write.load(Ordering::Acquire);
        self.wrap.distance(read, write)
    }

    /// Snapshot of whether the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.consumer.read.load(Ordering::Acquire) == self.producer.write.load(Ordering::Acquire)
    }

    /// Maximum number of elements held at once (`slots - 1`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Number of slots reserved, including the one kept free.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Wraparound strategy chosen for this queue's slot count.
    #[inline]
    pub fn wrap(&self) -> Wrap {
        self.wrap
    }

    /// Allocation strategy backing the slot storage.
    pub fn allocator(&self) -> &A {
        self.slots.allocator()
    }
}

impl<T, A: SlotAlloc> Drop for SpscQueue<T, A> {
    fn drop(&mut self) {
        if !std::mem::needs_drop::<T>() {
            return;
        }
        // `&mut self`: neither half is alive, the cursors are final.
        let mut idx = self.consumer.read.load(Ordering::Relaxed);
        let write = self.producer.write.load(Ordering::Relaxed);
        while idx != write {
            // SAFETY: slots in [read, write) hold live elements, each visited once.
            unsafe { self.slots.drop_in_place(idx) };
            idx = self.wrap.next(idx);
        }
    }
}

impl<T, A: SlotAlloc> fmt::Debug for SpscQueue<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpscQueue")
            .field("slots", &self.slots.len())
            .field("wrap", &self.wrap)
            .field("len", &self.len())
            .finish()
    }
}

/// The writing half of an [`SpscQueue`].
pub struct Producer<'q, T, A: SlotAlloc = Heap> {
    queue: &'q SpscQueue<T, A>,
}

impl<T, A: SlotAlloc> Producer<'_, T, A> {
    /// Finds the slot to write, if one is free.
    ///
    /// Returns `(write, next(write))`. Touches the consumer's cursor only
    /// when the cached copy says the queue might be full.
    #[inline(always)]
    fn reserve(&mut self) -> Option<(usize, usize)> {
        let q = self.queue;
        let write = q.producer.write.load(Ordering::Relaxed);
        let next = q.wrap.next(write);
        if next == q.producer.read_cache.get() {
            q.producer.read_cache.set(q.consumer.read.load(Ordering::Acquire));
            if next == q.producer.read_cache.get() {
                return None;
            }
        }
        Some((write, next))
    }

    #[inline(always)]
    fn commit(&mut self, write: usize, next: usize, value: T) {
        let q = self.queue;
        // SAFETY: `reserve` proved slot `write` is outside [read, write), so it
        // is uninitialized and the consumer will not look at it before the
        // store below.
        unsafe { q.slots.write(write, value) };
        q.producer.write.store(next, Ordering::Release);
    }

    /// Pushes `value`, or hands it back if the queue is full.
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        match self.reserve() {
            Some((write, next)) => {
                self.commit(write, next, value);
                Ok(())
            }
            None => Err(value),
        }
    }

    /// Builds an element with `make` directly into the next free slot.
    ///
    /// `make` is only called when a slot is free. Returns `false` if the queue
    /// is full. If `make` panics, the queue is left exactly as it was.
    #[inline]
    pub fn try_emplace<F>(&mut self, make: F) -> bool
    where
        F: FnOnce() -> T,
    {
        match self.try_emplace_with(|| Ok::<T, Infallible>(make())) {
            Ok(pushed) => pushed,
            Err(never) => match never {},
        }
    }

    /// Like [`try_emplace`](Producer::try_emplace) with a fallible constructor.
    ///
    /// An `Err` from `make` is returned as is; no slot is consumed and the
    /// write cursor does not move.
    #[inline]
    pub fn try_emplace_with<E, F>(&mut self, make: F) -> Result<bool, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let Some((write, next)) = self.reserve() else {
            return Ok(false);
        };
        let value = make()?;
        self.commit(write, next, value);
        Ok(true)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl<T, A: SlotAlloc> fmt::Debug for Producer<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").field("queue", self.queue).finish()
    }
}

/// The reading half of an [`SpscQueue`].
pub struct Consumer<'q, T, A: SlotAlloc = Heap> {
    queue: &'q SpscQueue<T, A>,
}

impl<T, A: SlotAlloc> Consumer<'_, T, A> {
    /// Index of the oldest element, if any. Touches the producer's cursor only
    /// when the cached copy says the queue might be empty.
    #[inline(always)]
    fn front(&mut self) -> Option<usize> {
        let q = self.queue;
        let read = q.consumer.read.load(Ordering::Relaxed);
        if read == q.consumer.write_cache.get() {
            q.consumer.write_cache.set(q.producer.write.load(Ordering::Acquire));
            if read == q.consumer.write_cache.get() {
                return None;
            }
        }
        Some(read)
    }

    /// Takes the oldest element, or `None` if the queue is empty.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        let read = self.front()?;
        let q = self.queue;
        // SAFETY: `front` proved slot `read` is inside [read, write); the Acquire
        // load of `write` made its initialization visible. The producer will not
        // reuse it before the store below.
        let value = unsafe { q.slots.read(read) };
        q.consumer.read.store(q.wrap.next(read), Ordering::Release);
        Some(value)
    }

    /// Borrows the oldest element without removing it.
    #[inline]
    pub fn peek(&mut self) -> Option<&T> {
        let read = self.front()?;
        // SAFETY: as in `try_pop`; the borrow of `self` prevents popping the
        // element while the reference lives.
        Some(unsafe { self.queue.slots.get(read) })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl<T, A: SlotAlloc> fmt::Debug for Consumer<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("queue", self.queue).finish()
    }
}
