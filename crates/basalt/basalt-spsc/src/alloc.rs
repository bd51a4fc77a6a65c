//! Allocation strategy for slot storage.
//!
//! The queue only ever asks for one block, sized for exactly `N` slots, at
//! construction and hands it back on drop. [`SlotAlloc`] is that whole
//! contract; [`Heap`] forwards to the global allocator.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Source of raw memory for slot storage.
///
/// # Safety
/// - `allocate` must return either `None` or a pointer to a block valid for
///   reads and writes of `layout.size()` bytes, aligned to `layout.align()`,
///   that stays valid until passed to `deallocate`.
/// - `deallocate` must accept any pointer returned by `allocate` on the same
///   instance together with the layout it was requested with.
pub unsafe trait SlotAlloc {
    /// Allocates a block for `layout`. Never called with a zero-sized layout.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Releases a block obtained from [`SlotAlloc::allocate`].
    ///
    /// # Safety
    /// `ptr` must come from `allocate` on `self` with the same `layout`, and
    /// must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct Heap;

// SAFETY: forwards to the global allocator, which upholds the same contract.
unsafe impl SlotAlloc for Heap {
    #[inline]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() != 0);
        // SAFETY: layout has non-zero size (caller contract).
        NonNull::new(unsafe { alloc::alloc(layout) })
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: ptr was returned by `alloc::alloc` with this layout.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

// SAFETY: delegates to `A`, which upholds the contract.
unsafe impl<A: SlotAlloc + ?Sized> SlotAlloc for &A {
    #[inline]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).deallocate(ptr, layout) }
    }
}
