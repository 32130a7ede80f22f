//! Slot cell: a live `T` or a free-list link
//!
//! # Safety
//!
//! A slot is a tagged-by-context union with no runtime tag. The containing
//! block's free list carries the distinction:
//! - while a slot is on its block's free list it may only be accessed as a
//!   link,
//! - while it is handed out it may only be accessed as a `T`.
//!
//! Every accessor below states which of the two states it requires. The
//! allocator upholds the discipline statically; nothing here checks it at
//! runtime.

use core::mem::ManuallyDrop;
use core::ptr::NonNull;

/// Storage cell for one pool entry.
///
/// `repr(C)` guarantees both fields live at offset 0, so a slot pointer and
/// a value pointer are interchangeable addresses. The cell is exactly
/// `max(size_of::<T>(), size_of::<*mut _>())` bytes (rounded up to the
/// common alignment) and naturally aligned for `T`.
#[repr(C)]
pub(crate) union Slot<T> {
    value: ManuallyDrop<T>,
    next: *mut Slot<T>,
}

impl<T> Slot<T> {
    /// Views the slot as a value pointer. The address is valid in both slot
    /// states; reading or writing through it is only allowed while the slot
    /// is handed out.
    #[inline(always)]
    pub(crate) fn as_value_ptr(this: NonNull<Self>) -> *mut T {
        this.as_ptr().cast::<T>()
    }

    /// Reads the free-list link.
    ///
    /// # Safety
    ///
    /// `this` must point to a slot that is currently on its block's free
    /// list and whose link has been written by [`Slot::link`].
    #[inline(always)]
    pub(crate) unsafe fn next_free(this: NonNull<Self>) -> *mut Slot<T> {
        // SAFETY: the slot is free, so the `next` view is the active one.
        unsafe { (*this.as_ptr()).next }
    }

    /// Writes the free-list link, putting the slot into its free view.
    ///
    /// # Safety
    ///
    /// `this` must point to slot storage that holds no live `T` (either
    /// uninitialized or already vacated by the caller).
    #[inline(always)]
    pub(crate) unsafe fn link(this: NonNull<Self>, next: *mut Slot<T>) {
        // SAFETY: no live value overlaps the link; writing the raw field is
        // a plain store into owned storage.
        unsafe { (*this.as_ptr()).next = next };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem;

    #[test]
    fn test_slot_is_at_least_link_sized() {
        assert!(mem::size_of::<Slot<u8>>() >= mem::size_of::<*mut Slot<u8>>());
        assert!(mem::size_of::<Slot<[u64; 4]>>() >= mem::size_of::<[u64; 4]>());
    }

    #[test]
    fn test_slot_alignment_covers_value_and_link() {
        assert!(mem::align_of::<Slot<u8>>() >= mem::align_of::<*mut ()>());
        assert!(mem::align_of::<Slot<[u64; 4]>>() >= mem::align_of::<[u64; 4]>());
    }

    #[test]
    fn test_link_round_trip() {
        let mut storage: [Slot<u64>; 2] = unsafe { mem::zeroed() };
        let base = storage.as_mut_ptr();
        let first = NonNull::new(base).unwrap();
        let second = NonNull::new(unsafe { base.add(1) }).unwrap();

        unsafe {
            Slot::link(first, second.as_ptr());
            Slot::link(second, core::ptr::null_mut());

            assert_eq!(Slot::next_free(first), second.as_ptr());
            assert!(Slot::next_free(second).is_null());
        }
    }

    #[test]
    fn test_value_view_shares_the_slot_address() {
        let mut storage: Slot<u32> = unsafe { mem::zeroed() };
        let slot = NonNull::from(&mut storage);

        let value_ptr = Slot::as_value_ptr(slot);
        assert_eq!(value_ptr.cast::<Slot<u32>>(), slot.as_ptr());

        unsafe {
            value_ptr.write(0xDEAD_BEEF);
            assert_eq!(value_ptr.read(), 0xDEAD_BEEF);
        }
    }
}
