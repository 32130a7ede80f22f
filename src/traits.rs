//! Allocator traits
//!
//! [`RawAllocator`] is the layout-based surface that lets the pool back
//! generic single-element containers; [`MemoryUsage`] and [`Resettable`]
//! cover observation and bulk teardown.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::AllocResult;

/// Layout-based allocation surface.
///
/// This is the adapter that generic containers consume: anything that hands
/// out raw memory for a `Layout` and takes it back. Pool allocators
/// implement it for layouts that fit one slot and reject everything else.
///
/// # Safety
///
/// Implementors must ensure that:
/// - returned pointers are valid for reads and writes of `layout.size()`
///   bytes and properly aligned for `layout.align()`,
/// - deallocation is only required to work for pointers previously returned
///   by the same allocator with a matching layout.
pub unsafe trait RawAllocator {
    /// Allocates memory for the given layout. The contents of the returned
    /// region are indeterminate.
    ///
    /// # Safety
    ///
    /// The returned pointer must not be used after the allocator is dropped
    /// or reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout cannot be satisfied or the host
    /// allocator fails.
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>>;

    /// Deallocates memory at the given pointer.
    ///
    /// # Safety
    ///
    /// - `ptr` must have been allocated by this allocator with a matching
    ///   `layout`,
    /// - `ptr` must not have been deallocated already,
    /// - after this call `ptr` is invalid and must not be used.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

// SAFETY: forwarding preserves the implementor's guarantees.
unsafe impl<A: RawAllocator + ?Sized> RawAllocator for &A {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        unsafe { (**self).allocate(layout) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { (**self).deallocate(ptr, layout) }
    }
}

/// Memory usage reporting.
pub trait MemoryUsage {
    /// Returns the bytes currently handed out to clients.
    fn used_memory(&self) -> usize;

    /// Returns the bytes currently available without growing, or `None` if
    /// the allocator has no inherent limit.
    fn available_memory(&self) -> Option<usize>;

    /// Returns the total footprint in bytes, or `None` if unknown.
    fn total_memory(&self) -> Option<usize> {
        match (self.used_memory(), self.available_memory()) {
            (used, Some(available)) => Some(used + available),
            _ => None,
        }
    }
}

/// Allocators that can invalidate every previous allocation at once.
pub trait Resettable {
    /// Resets the allocator, invalidating all previous allocations.
    ///
    /// # Safety
    ///
    /// All pointers from previous allocations become invalid immediately;
    /// the caller must ensure no live references exist before calling this.
    unsafe fn reset(&self);

    /// Checks if the allocator can be safely reset right now.
    fn can_reset(&self) -> bool {
        true
    }

    /// Resets only if [`can_reset`](Resettable::can_reset) allows it.
    /// Returns `true` if the reset was performed.
    ///
    /// # Safety
    ///
    /// Same requirements as [`reset`](Resettable::reset) when the reset is
    /// actually performed.
    unsafe fn try_reset(&self) -> bool {
        if self.can_reset() {
            // SAFETY: caller upholds the reset contract.
            unsafe { self.reset() };
            true
        } else {
            false
        }
    }
}
