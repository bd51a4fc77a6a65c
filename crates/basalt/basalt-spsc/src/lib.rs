//! Bounded, lock-free single-producer/single-consumer queue.
//!
//! [`SpscQueue`] moves values of `T` from one thread to another through a
//! fixed ring of slots. Neither side blocks: full and empty are reported to
//! the caller, who picks its own retry policy.

mod alloc;
mod error;
mod queue;
mod ring;
mod storage;

pub use alloc::{Heap, SlotAlloc};
pub use error::QueueError;
pub use queue::{Consumer, Producer, SpscQueue};
pub use ring::{QueueConfig, Wrap};
