//! Queue configuration and cursor arithmetic.
//!
//! A queue is sized by its slot count `N`. One slot is always kept free so
//! that `read == write` can only ever mean "empty": the queue is full once
//! advancing the write cursor would land on the read cursor. The usable
//! capacity is therefore `N - 1`.
//!
//! How a cursor wraps is decided once, when the slot count is fixed:
//! - power-of-two `N` → branchless bitmask
//! - anything else   → compare against `N` and reset to zero

use crate::error::QueueError;

/// Cursor wraparound strategy, fixed at construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Wrap {
    /// `N` is a power of two; holds `N - 1`.
    Mask(usize),
    /// `N` is not a power of two; holds `N`.
    Reset(usize),
}

impl Wrap {
    /// Picks the strategy for a queue of `slots` slots.
    ///
    /// `slots` must be non-zero; [`QueueConfig::new`] enforces that.
    pub fn for_slots(slots: usize) -> Self {
        if slots.is_power_of_two() {
            Wrap::Mask(slots - 1)
        } else {
            Wrap::Reset(slots)
        }
    }

    /// Number of slots this strategy wraps over.
    #[inline(always)]
    pub fn slots(self) -> usize {
        match self {
            Wrap::Mask(mask) => mask + 1,
            Wrap::Reset(slots) => slots,
        }
    }

    /// Index following `idx`.
    ///
    /// With `N = 4` (mask `0b11`):
    /// ```text
    /// 0 → 1 → 2 → 3 → 0
    /// ```
    #[inline(always)]
    pub fn next(self, idx: usize) -> usize {
        match self {
            Wrap::Mask(mask) => (idx + 1) & mask,
            Wrap::Reset(slots) => {
                let n = idx + 1;
                if n == slots { 0 } else { n }
            }
        }
    }

    /// Number of occupied slots in the circular range `[read, write)`.
    #[inline(always)]
    pub fn distance(self, read: usize, write: usize) -> usize {
        match self {
            Wrap::Mask(mask) => write.wrapping_sub(read) & mask,
            Wrap::Reset(slots) => {
                if write >= read {
                    write - read
                } else {
                    slots - read + write
                }
            }
        }
    }
}

/// Validated sizing for a queue.
///
/// # Example
/// ```
/// use basalt_spsc::{QueueConfig, Wrap};
/// let cfg = QueueConfig::new(8).unwrap();
/// assert_eq!(cfg.capacity(), 7);
/// assert_eq!(cfg.wrap(), Wrap::Mask(7));
/// assert!(QueueConfig::new(0).is_err());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    slots: usize,
}

impl QueueConfig {
    /// Creates a configuration for `slots` slots (usable capacity `slots - 1`).
    ///
    /// # Errors
    /// [`QueueError::ZeroCapacity`] when `slots == 0`.
    pub fn new(slots: usize) -> Result<Self, QueueError> {
        if slots == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self { slots })
    }

    /// Total slot count `N`.
    #[inline]
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Number of elements the queue can hold at once.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots - 1
    }

    /// Wraparound strategy for this slot count.
    #[inline]
    pub fn wrap(&self) -> Wrap {
        Wrap::for_slots(self.slots)
    }
}
