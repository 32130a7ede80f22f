//! Block: one host allocation holding a header and a slot array
//!
//! # Safety
//!
//! A block is a single raw region of exactly `BLOCK_SIZE` bytes obtained
//! from the host allocator. The header lives at offset 0; the slot array
//! starts at the first offset past the header that satisfies the slot
//! alignment. Slots past index 0 of a fresh block stay uninitialized until
//! the lazy-extension rule threads them into the free list, so nothing here
//! may read a slot that the free list has not reached yet.
//!
//! All accessors take the block as a `NonNull` pointer rather than a
//! reference: a reference to the header would not carry provenance over the
//! slot array that lives in the tail of the same allocation.

#[cfg(not(feature = "std"))]
use alloc::alloc::{alloc, dealloc};
#[cfg(feature = "std")]
use std::alloc::{alloc, dealloc};

use core::alloc::Layout;
use core::mem;
use core::ptr::{self, NonNull};

use super::slot::Slot;
use crate::error::{AllocError, AllocResult};
use crate::utils::{align_up, max_usize};

/// Block header. The slot array follows it inside the same allocation.
#[repr(C)]
pub(crate) struct Block<T, const BLOCK_SIZE: usize> {
    next_block: *mut Block<T, BLOCK_SIZE>,
    free_head: *mut Slot<T>,
    free_count: usize,
}

impl<T, const BLOCK_SIZE: usize> Block<T, BLOCK_SIZE> {
    const HEADER_SIZE: usize = mem::size_of::<Self>();

    /// Byte offset of `slots[0]` within the block region.
    const SLOTS_OFFSET: usize = align_up(Self::HEADER_SIZE, mem::align_of::<Slot<T>>());

    /// Number of slots per block. Evaluating this constant rejects, at
    /// compile time, any `BLOCK_SIZE` too small to hold the header plus one
    /// slot.
    pub(crate) const SLOT_COUNT: usize = {
        assert!(
            BLOCK_SIZE >= Self::SLOTS_OFFSET + mem::size_of::<Slot<T>>(),
            "BLOCK_SIZE too small: a block must hold its header and at least one slot"
        );
        (BLOCK_SIZE - Self::SLOTS_OFFSET) / mem::size_of::<Slot<T>>()
    };

    const LAST_SLOT_INDEX: usize = Self::SLOT_COUNT - 1;

    const ALIGN: usize = max_usize(mem::align_of::<Self>(), mem::align_of::<Slot<T>>());

    /// Host-allocator layout of one block region.
    // SAFETY: ALIGN is a max of two alignments, hence a power of two, and
    // SLOT_COUNT's assertion bounds BLOCK_SIZE away from degenerate sizes.
    pub(crate) const LAYOUT: Layout =
        unsafe { Layout::from_size_align_unchecked(BLOCK_SIZE, Self::ALIGN) };

    /// Allocates a fresh block from the host allocator.
    ///
    /// The free list starts as `slots[0]` alone with a null link and
    /// `free_count == SLOT_COUNT`; slots `1..` remain uninitialized and are
    /// threaded in lazily by [`Block::pop_free_slot`].
    pub(crate) fn allocate() -> AllocResult<NonNull<Self>> {
        // SAFETY: LAYOUT has non-zero size (enforced by SLOT_COUNT).
        let raw = unsafe { alloc(Self::LAYOUT) };
        let Some(block) = NonNull::new(raw.cast::<Self>()) else {
            return Err(AllocError::out_of_memory(Self::LAYOUT));
        };

        // SAFETY: `block` owns the whole BLOCK_SIZE region; the header and
        // slots[0] both lie inside it and are properly aligned.
        unsafe {
            let first = Self::slot(block, 0);
            Slot::link(first, ptr::null_mut());
            block.as_ptr().write(Block {
                next_block: ptr::null_mut(),
                free_head: first.as_ptr(),
                free_count: Self::SLOT_COUNT,
            });
        }

        Ok(block)
    }

    /// Returns the block region to the host allocator.
    ///
    /// # Safety
    ///
    /// `this` must come from [`Block::allocate`] and must not be used
    /// afterwards. Live values in handed-out slots are not dropped.
    pub(crate) unsafe fn release(this: NonNull<Self>) {
        // SAFETY: same layout as the original allocation.
        unsafe { dealloc(this.as_ptr().cast::<u8>(), Self::LAYOUT) };
    }

    /// Pointer to `slots[index]`.
    ///
    /// # Safety
    ///
    /// `index < SLOT_COUNT`. The returned pointer may reference
    /// uninitialized storage.
    #[inline]
    pub(crate) unsafe fn slot(this: NonNull<Self>, index: usize) -> NonNull<Slot<T>> {
        debug_assert!(index < Self::SLOT_COUNT);
        // SAFETY: derived from the whole-region pointer, so provenance
        // covers the slot array; the offset stays inside BLOCK_SIZE.
        unsafe {
            let base = this
                .as_ptr()
                .cast::<u8>()
                .add(Self::SLOTS_OFFSET)
                .cast::<Slot<T>>();
            NonNull::new_unchecked(base.add(index))
        }
    }

    /// Checks whether `addr` falls inside this block's slot array, by
    /// integer address comparison.
    ///
    /// # Safety
    ///
    /// `this` must be a live block.
    #[inline]
    pub(crate) unsafe fn contains(this: NonNull<Self>, addr: *const u8) -> bool {
        // SAFETY: both slot indices are in bounds.
        let first = unsafe { Self::slot(this, 0) }.as_ptr() as usize;
        let last = unsafe { Self::slot(this, Self::LAST_SLOT_INDEX) }.as_ptr() as usize;
        let addr = addr as usize;
        addr >= first && addr <= last
    }

    /// Pops the head of the free list, lazily threading the physically
    /// adjacent slot into the list when the head was the lazy frontier.
    ///
    /// # Safety
    ///
    /// `this` must be a live block with `free_count > 0`.
    pub(crate) unsafe fn pop_free_slot(this: NonNull<Self>) -> NonNull<Slot<T>> {
        // SAFETY: the caller guarantees at least one free slot, so the head
        // is a valid slot inside this block.
        unsafe {
            let header = this.as_ptr();
            debug_assert!((*header).free_count > 0);
            let head = NonNull::new_unchecked((*header).free_head);

            (*header).free_count -= 1;
            if (*header).free_count == 0 {
                (*header).free_head = ptr::null_mut();
            } else {
                let next = Slot::next_free(head);
                if next.is_null() {
                    // Lazy extension: the head was the frontier of the
                    // never-used suffix. A null link on the last slot would
                    // mean free_count was already 0.
                    debug_assert!(head != Self::slot(this, Self::LAST_SLOT_INDEX));
                    let adjacent = NonNull::new_unchecked(head.as_ptr().add(1));
                    Slot::link(adjacent, ptr::null_mut());
                    (*header).free_head = adjacent.as_ptr();
                } else {
                    (*header).free_head = next;
                }
            }

            head
        }
    }

    /// Pushes `slot` onto the free list (LIFO).
    ///
    /// # Safety
    ///
    /// `slot` must belong to this block, hold no live value, and not be on
    /// the free list already. `free_count` must be below `SLOT_COUNT`.
    pub(crate) unsafe fn push_free_slot(this: NonNull<Self>, slot: NonNull<Slot<T>>) {
        // SAFETY: the slot is vacated, so its link view is writable.
        unsafe {
            let header = this.as_ptr();
            debug_assert!(Self::contains(this, slot.as_ptr().cast::<u8>()));
            debug_assert!((*header).free_count < Self::SLOT_COUNT);
            Slot::link(slot, (*header).free_head);
            (*header).free_head = slot.as_ptr();
            (*header).free_count += 1;
        }
    }

    /// Current number of free slots.
    ///
    /// # Safety
    ///
    /// `this` must be a live block.
    #[inline]
    pub(crate) unsafe fn free_count(this: NonNull<Self>) -> usize {
        // SAFETY: reading a header field of a live block.
        unsafe { (*this.as_ptr()).free_count }
    }

    /// True when every slot is free and the block is eligible for release.
    ///
    /// # Safety
    ///
    /// `this` must be a live block.
    #[inline]
    pub(crate) unsafe fn is_fully_free(this: NonNull<Self>) -> bool {
        // SAFETY: see `free_count`.
        unsafe { Self::free_count(this) == Self::SLOT_COUNT }
    }

    /// Successor in the block chain, or null at the tail.
    ///
    /// # Safety
    ///
    /// `this` must be a live block.
    #[inline]
    pub(crate) unsafe fn next_block(this: NonNull<Self>) -> *mut Self {
        // SAFETY: reading a header field of a live block.
        unsafe { (*this.as_ptr()).next_block }
    }

    /// Replaces the chain successor.
    ///
    /// # Safety
    ///
    /// `this` must be a live block.
    #[inline]
    pub(crate) unsafe fn set_next_block(this: NonNull<Self>, next: *mut Self) {
        // SAFETY: writing a header field of a live block.
        unsafe { (*this.as_ptr()).next_block = next };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type SmallBlock = Block<u64, 4096>;

    #[test]
    fn test_slot_count_math() {
        let header = mem::size_of::<SmallBlock>();
        let offset = align_up(header, mem::align_of::<Slot<u64>>());
        let expected = (4096 - offset) / mem::size_of::<Slot<u64>>();

        assert_eq!(SmallBlock::SLOT_COUNT, expected);
        assert!(SmallBlock::SLOT_COUNT > 0);
    }

    #[test]
    fn test_fresh_block_state() {
        let block = SmallBlock::allocate().unwrap();

        unsafe {
            assert_eq!(SmallBlock::free_count(block), SmallBlock::SLOT_COUNT);
            assert!(SmallBlock::is_fully_free(block));
            assert!(SmallBlock::next_block(block).is_null());

            let first = SmallBlock::slot(block, 0);
            assert_eq!((*block.as_ptr()).free_head, first.as_ptr());
            assert!(Slot::next_free(first).is_null());

            SmallBlock::release(block);
        }
    }

    #[test]
    fn test_pop_walks_slots_in_ascending_address_order() {
        let block = SmallBlock::allocate().unwrap();

        unsafe {
            let mut previous: Option<usize> = None;
            for _ in 0..SmallBlock::SLOT_COUNT {
                let slot = SmallBlock::pop_free_slot(block);
                let addr = slot.as_ptr() as usize;
                if let Some(prev) = previous {
                    assert_eq!(addr, prev + mem::size_of::<Slot<u64>>());
                }
                previous = Some(addr);
            }
            assert_eq!(SmallBlock::free_count(block), 0);
            assert!((*block.as_ptr()).free_head.is_null());

            SmallBlock::release(block);
        }
    }

    #[test]
    fn test_push_pop_is_lifo() {
        let block = SmallBlock::allocate().unwrap();

        unsafe {
            let a = SmallBlock::pop_free_slot(block);
            let b = SmallBlock::pop_free_slot(block);

            SmallBlock::push_free_slot(block, a);
            SmallBlock::push_free_slot(block, b);

            assert_eq!(SmallBlock::pop_free_slot(block), b);
            assert_eq!(SmallBlock::pop_free_slot(block), a);

            SmallBlock::release(block);
        }
    }

    #[test]
    fn test_contains_bounds() {
        let block = SmallBlock::allocate().unwrap();

        unsafe {
            let first = SmallBlock::slot(block, 0).as_ptr().cast::<u8>();
            let last = SmallBlock::slot(block, SmallBlock::LAST_SLOT_INDEX)
                .as_ptr()
                .cast::<u8>();

            assert!(SmallBlock::contains(block, first));
            assert!(SmallBlock::contains(block, last));
            assert!(!SmallBlock::contains(block, block.as_ptr().cast::<u8>()));
            assert!(!SmallBlock::contains(
                block,
                last.add(mem::size_of::<Slot<u64>>())
            ));

            SmallBlock::release(block);
        }
    }

    #[test]
    fn test_tight_block_still_fits_one_slot() {
        // Header is three words; 64 bytes leaves room for a handful of
        // 8-byte slots.
        type Tight = Block<u64, 64>;
        let expected = (64 - mem::size_of::<Tight>()) / mem::size_of::<Slot<u64>>();

        assert_eq!(Tight::SLOT_COUNT, expected);

        let block = Tight::allocate().unwrap();
        unsafe {
            for _ in 0..Tight::SLOT_COUNT {
                Tight::pop_free_slot(block);
            }
            assert_eq!(Tight::free_count(block), 0);
            Tight::release(block);
        }
    }
}
