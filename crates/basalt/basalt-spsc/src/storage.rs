//! Raw slot storage.
//!
//! A single contiguous block of `N` cells, each an `UnsafeCell<MaybeUninit<T>>`.
//! The block does not know which slots are live: the queue tracks that with
//! its cursors and is responsible for writing, reading and dropping elements.
//! Dropping `Slots` only returns the memory to the allocation strategy.
//!
//! ```text
//! ┌────────┬────────┬────────┬────────┬─────┬──────────┐
//! │ slot 0 │ slot 1 │ slot 2 │ slot 3 │ ... │ slot N-1 │
//! └────────┴────────┴────────┴────────┴─────┴──────────┘
//!   live only inside [read, write)
//! ```
//!
//! Under `cfg(loom)` the cells are `loom::cell::UnsafeCell`, so every slot
//! access is checked against the happens-before edges the cursors create.

use crate::alloc::SlotAlloc;
use crate::error::QueueError;
use std::alloc::Layout;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ptr::NonNull;

#[cfg(not(loom))]
type SlotCell<T> = std::cell::UnsafeCell<MaybeUninit<T>>;

#[cfg(loom)]
type SlotCell<T> = loom::cell::UnsafeCell<MaybeUninit<T>>;

pub(crate) struct Slots<T, A: SlotAlloc> {
    ptr: NonNull<SlotCell<T>>,
    len: usize,
    alloc: A,
    /// The block logically owns the `T`s the queue puts in it.
    _pd: PhantomData<T>,
}

// SAFETY: `Slots` is a uniquely owned block of `T`s; sending it sends the
// elements, sharing it only allows the queue's disjoint-index accesses.
unsafe impl<T: Send, A: SlotAlloc + Send> Send for Slots<T, A> {}
unsafe impl<T: Send, A: SlotAlloc + Sync> Sync for Slots<T, A> {}

impl<T, A: SlotAlloc> Slots<T, A> {
    /// Reserves storage for `len` slots without initializing any element.
    pub(crate) fn new_in(len: usize, alloc: A) -> Result<Self, QueueError> {
        let layout = Layout::array::<SlotCell<T>>(len)
            .map_err(|_| QueueError::CapacityOverflow { slots: len })?;

        // Zero-sized elements need no memory at all.
        let ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            alloc
                .allocate(layout)
                .ok_or(QueueError::AllocFailed {
                    bytes: layout.size(),
                })?
                .cast::<SlotCell<T>>()
        };

        // loom cells carry tracking state and must be constructed.
        #[cfg(loom)]
        for i in 0..len {
            // SAFETY: i < len, the block is fresh.
            unsafe { ptr.as_ptr().add(i).write(SlotCell::new(MaybeUninit::uninit())) };
        }

        Ok(Self {
            ptr,
            len,
            alloc,
            _pd: PhantomData,
        })
    }

    #[inline(always)]
    fn cell(&self, idx: usize) -> &SlotCell<T> {
        debug_assert!(idx < self.len);
        // SAFETY: idx < len, so the cell is inside the block.
        unsafe { &*self.ptr.as_ptr().add(idx) }
    }

    #[inline(always)]
    fn with_slot<R>(&self, idx: usize, f: impl FnOnce(*const MaybeUninit<T>) -> R) -> R {
        #[cfg(not(loom))]
        return f(self.cell(idx).get().cast_const());
        #[cfg(loom)]
        return self.cell(idx).with(f);
    }

    #[inline(always)]
    fn with_slot_mut<R>(&self, idx: usize, f: impl FnOnce(*mut MaybeUninit<T>) -> R) -> R {
        #[cfg(not(loom))]
        return f(self.cell(idx).get());
        #[cfg(loom)]
        return self.cell(idx).with_mut(f);
    }

    /// Moves `value` into slot `idx`.
    ///
    /// # Safety
    /// `idx < len`, the slot is uninitialized and no other thread accesses it
    /// until the write is published.
    #[inline(always)]
    pub(crate) unsafe fn write(&self, idx: usize, value: T) {
        // SAFETY: caller contract.
        self.with_slot_mut(idx, |p| unsafe { p.write(MaybeUninit::new(value)) })
    }

    /// Moves the element out of slot `idx`, leaving it uninitialized.
    ///
    /// # Safety
    /// `idx < len`, the slot holds a live element and no other thread accesses
    /// it until the read cursor moves past it.
    #[inline(always)]
    pub(crate) unsafe fn read(&self, idx: usize) -> T {
        // SAFETY: caller contract.
        self.with_slot(idx, |p| unsafe { p.read().assume_init() })
    }

    /// # Safety
    /// Same as [`Slots::read`]; the returned reference must not outlive the
    /// element.
    #[inline(always)]
    pub(crate) unsafe fn get(&self, idx: usize) -> &T {
        // SAFETY: caller contract.
        self.with_slot(idx, |p| unsafe { (*p).assume_init_ref() })
    }

    /// Drops the element in slot `idx` in place.
    ///
    /// # Safety
    /// The slot holds a live element that is never touched again.
    #[inline]
    pub(crate) unsafe fn drop_in_place(&mut self, idx: usize) {
        // SAFETY: caller contract.
        self.with_slot_mut(idx, |p| unsafe { (*p).assume_init_drop() })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }
}

impl<T, A: SlotAlloc> Drop for Slots<T, A> {
    fn drop(&mut self) {
        // The cells themselves, not the elements; only loom cells need it.
        if mem::needs_drop::<SlotCell<T>>() {
            for i in 0..self.len {
                // SAFETY: every cell was constructed in `new_in`.
                unsafe { self.ptr.as_ptr().add(i).drop_in_place() };
            }
        }

        // `new_in` already proved the layout valid.
        let Ok(layout) = Layout::array::<SlotCell<T>>(self.len) else {
            return;
        };
        if layout.size() != 0 {
            // SAFETY: ptr came from `allocate` on this allocator with `layout`.
            unsafe { self.alloc.deallocate(self.ptr.cast(), layout) }
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::alloc::Heap;

    #[test]
    fn zero_sized_elements_skip_allocation() {
        struct Refuse;
        // SAFETY: never hands out memory.
        unsafe impl SlotAlloc for Refuse {
            fn allocate(&self, _layout: Layout) -> Option<NonNull<u8>> {
                None
            }
            unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
                unreachable!("nothing was allocated")
            }
        }

        let slots = Slots::<(), _>::new_in(64, Refuse).unwrap();
        assert_eq!(slots.len(), 64);
        assert!(Slots::<u64, _>::new_in(64, Refuse).is_err());
    }

    #[test]
    fn overflowing_layout_is_reported() {
        let err = Slots::<u64, _>::new_in(usize::MAX, Heap).err();
        assert_eq!(err, Some(QueueError::CapacityOverflow { slots: usize::MAX }));
    }

    #[test]
    fn cells_have_element_layout() {
        assert_eq!(mem::size_of::<SlotCell<u64>>(), mem::size_of::<u64>());
        assert_eq!(mem::align_of::<SlotCell<u64>>(), mem::align_of::<u64>());
    }

    #[test]
    fn write_then_read_moves_value() {
        let mut slots = Slots::<String, _>::new_in(4, Heap).unwrap();
        unsafe {
            slots.write(2, "lava".to_string());
            assert_eq!(slots.get(2), "lava");
            assert_eq!(slots.read(2), "lava");
            slots.write(3, "ash".to_string());
            slots.drop_in_place(3);
        }
    }
}
