//! Pool allocator for values of a single type
//!
//! # Safety
//!
//! The pool owns a singly-linked chain of raw blocks and hands out slot
//! pointers into them:
//! - every outstanding pointer lies inside exactly one chain block until it
//!   is deallocated,
//! - the `first_free_block` cursor, when set, points to the earliest block
//!   with a free slot and every earlier block is full,
//! - cursors live in `Cell`s; the pool is single-owner and never `Sync`.

use core::alloc::Layout;
use core::cell::Cell;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use super::block::Block;
use super::config::PoolConfig;
use super::slot::Slot;
use super::stats::{Counters, PoolStats};
use crate::error::{AllocError, AllocResult};
use crate::traits::{MemoryUsage, RawAllocator, Resettable};
use crate::utils::debug_assert_aligned;

/// Fixed-size object pool allocator for values of type `T`.
///
/// Storage comes from the host allocator in blocks of `BLOCK_SIZE` bytes
/// (4096 by default). Allocation and deallocation are amortized O(1) except
/// for the owner-lookup walk in [`deallocate`](TypedPool::deallocate), which
/// is O(blocks) and pays for whole-block reclamation.
///
/// A fresh pool owns no memory; the first block is created on first
/// allocation.
///
/// # Destruction
///
/// Dropping the pool releases every block **without running destructors of
/// live values**. Clients are responsible for destroying live objects (via
/// [`destroy`](TypedPool::destroy) or [`PoolBox`](super::PoolBox)) before
/// the pool goes away.
pub struct TypedPool<T, const BLOCK_SIZE: usize = 4096> {
    first_block: Cell<*mut Block<T, BLOCK_SIZE>>,
    last_block: Cell<*mut Block<T, BLOCK_SIZE>>,
    first_free_block: Cell<*mut Block<T, BLOCK_SIZE>>,
    config: PoolConfig,
    counters: Counters,
    _marker: PhantomData<T>,
}

impl<T, const BLOCK_SIZE: usize> TypedPool<T, BLOCK_SIZE> {
    /// Slot capacity of every block. Referencing this constant also
    /// enforces, at compile time, that `BLOCK_SIZE` holds the block header
    /// plus at least one slot.
    pub const SLOTS_PER_BLOCK: usize = Block::<T, BLOCK_SIZE>::SLOT_COUNT;

    /// Creates an empty pool. No memory is allocated until the first
    /// allocation.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Creates an empty pool with the given configuration.
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            first_block: Cell::new(ptr::null_mut()),
            last_block: Cell::new(ptr::null_mut()),
            first_free_block: Cell::new(ptr::null_mut()),
            config,
            counters: Counters::default(),
            _marker: PhantomData,
        }
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Allocates storage for one `T` and returns a pointer to it. The
    /// contents are indeterminate; the caller must write a value before
    /// reading through the pointer.
    ///
    /// The pointer stays valid until it is passed to
    /// [`deallocate`](TypedPool::deallocate) or the pool is reset or
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::out_of_memory`] if a new block is needed and
    /// the host allocator refuses it; the pool is left unchanged.
    pub fn allocate(&self) -> AllocResult<NonNull<T>> {
        if self.first_free_block.get().is_null() {
            self.grow()?;
        }

        // SAFETY: the cursor is non-null here and points to a chain block
        // with at least one free slot (cursor invariant).
        unsafe {
            let block = NonNull::new_unchecked(self.first_free_block.get());
            let slot = Block::pop_free_slot(block);

            if Block::free_count(block) == 0 {
                self.first_free_block
                    .set(self.next_free_from(Block::next_block(block)));
            }

            if let Some(pattern) = self.config.alloc_pattern {
                ptr::write_bytes(slot.as_ptr().cast::<u8>(), pattern, mem::size_of::<Slot<T>>());
            }
            if self.config.track_stats {
                self.counters.record_alloc();
            }

            let value = Slot::as_value_ptr(slot);
            debug_assert_aligned(value);
            Ok(NonNull::new_unchecked(value))
        }
    }

    /// Returns a slot to the pool.
    ///
    /// Walks the block chain to find the owning block, pushes the slot onto
    /// that block's free list and either releases the whole block (when it
    /// became fully free) or backfills the free-block cursor. O(blocks).
    ///
    /// # Safety
    ///
    /// - `ptr` must have been returned by [`allocate`](TypedPool::allocate)
    ///   (or [`create`](TypedPool::create)) on **this** pool,
    /// - it must not have been deallocated already,
    /// - the value, if it was initialized and needs dropping, must have been
    ///   dropped by the caller ([`destroy`](TypedPool::destroy) does both).
    pub unsafe fn deallocate(&self, ptr: NonNull<T>) {
        let slot = ptr.cast::<Slot<T>>();
        let addr = ptr.as_ptr().cast::<u8>().cast_const();

        let mut prev: *mut Block<T, BLOCK_SIZE> = ptr::null_mut();
        let mut cur = self.first_block.get();
        // Stays true while the free-block cursor is known to sit at or
        // after the walk position (or is unset).
        let mut first_free_follows_walk = true;

        while !cur.is_null() {
            // SAFETY: `cur` is a live block of this pool's chain.
            unsafe {
                let block = NonNull::new_unchecked(cur);

                if self.first_free_block.get() == cur {
                    first_free_follows_walk = false;
                }

                if Block::contains(block, addr) {
                    if let Some(pattern) = self.config.dealloc_pattern {
                        ptr::write_bytes(
                            ptr.as_ptr().cast::<u8>(),
                            pattern,
                            mem::size_of::<Slot<T>>(),
                        );
                    }
                    Block::push_free_slot(block, slot);
                    if self.config.track_stats {
                        self.counters.record_dealloc();
                    }

                    if Block::is_fully_free(block) {
                        self.retire_block(block, prev);
                    } else if first_free_follows_walk {
                        // The walk proved every earlier block is full, so
                        // this is now the earliest block with a free slot.
                        self.first_free_block.set(cur);
                    }
                    return;
                }

                prev = cur;
                cur = Block::next_block(block);
            }
        }

        debug_assert!(false, "pointer does not belong to this pool");
    }

    /// Allocates a slot and moves `value` into it.
    ///
    /// # Errors
    ///
    /// Propagates the allocation failure; `value` is dropped in that case.
    pub fn create(&self, value: T) -> AllocResult<NonNull<T>> {
        let ptr = self.allocate()?;
        // SAFETY: freshly allocated slot, sized and aligned for `T`.
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }

    /// Allocates a slot and constructs a value into it with `f`.
    ///
    /// If `f` panics the slot is returned to the pool before the panic
    /// propagates, so a failing constructor cannot leak pool capacity.
    ///
    /// # Errors
    ///
    /// Propagates the allocation failure; `f` is not called in that case.
    pub fn create_with<F>(&self, f: F) -> AllocResult<NonNull<T>>
    where
        F: FnOnce() -> T,
    {
        let ptr = self.allocate()?;
        let guard = DeallocateOnDrop { pool: self, ptr };
        let value = f();
        mem::forget(guard);
        // SAFETY: freshly allocated slot, sized and aligned for `T`.
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }

    /// Drops the value in place and returns its slot to the pool.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`create`](TypedPool::create) or
    /// [`create_with`](TypedPool::create_with) on this pool (or by
    /// [`allocate`](TypedPool::allocate) with a value written since), and
    /// must not have been destroyed or deallocated already.
    pub unsafe fn destroy(&self, ptr: NonNull<T>) {
        // SAFETY: caller guarantees a live value in a slot of this pool.
        unsafe {
            ptr::drop_in_place(ptr.as_ptr());
            self.deallocate(ptr);
        }
    }

    /// Returns the address of the referenced value.
    pub fn address(&self, value: &T) -> NonNull<T> {
        NonNull::from(value)
    }

    /// Advisory upper bound on the number of slots this pool could ever
    /// hand out, assuming the whole address space were carved into blocks.
    /// Not overflow-checked; treat as a hint, never as a promise.
    pub const fn max_size(&self) -> usize {
        (usize::MAX / BLOCK_SIZE) * Self::SLOTS_PER_BLOCK
    }

    /// Number of blocks currently in the chain. O(blocks).
    pub fn block_count(&self) -> usize {
        let mut count = 0;
        let mut cur = self.first_block.get();
        while !cur.is_null() {
            count += 1;
            // SAFETY: chain pointers are live blocks owned by this pool.
            cur = unsafe { Block::next_block(NonNull::new_unchecked(cur)) };
        }
        count
    }

    /// Free slots across all current blocks. O(blocks).
    pub fn free_slots(&self) -> usize {
        let mut free = 0;
        let mut cur = self.first_block.get();
        while !cur.is_null() {
            // SAFETY: chain pointers are live blocks owned by this pool.
            unsafe {
                let block = NonNull::new_unchecked(cur);
                free += Block::free_count(block);
                cur = Block::next_block(block);
            }
        }
        free
    }

    /// Slots currently handed out. O(blocks).
    pub fn in_use(&self) -> usize {
        self.block_count() * Self::SLOTS_PER_BLOCK - self.free_slots()
    }

    /// True when no slot is handed out.
    pub fn is_empty(&self) -> bool {
        self.in_use() == 0
    }

    /// Returns a traffic snapshot, or `None` when
    /// [`PoolConfig::track_stats`] is off.
    pub fn stats(&self) -> Option<PoolStats> {
        if !self.config.track_stats {
            return None;
        }
        Some(PoolStats {
            total_allocs: self.counters.allocs(),
            total_deallocs: self.counters.deallocs(),
            blocks_allocated: self.counters.blocks_allocated(),
            blocks_released: self.counters.blocks_released(),
            current_blocks: self.block_count(),
            free_slots: self.free_slots(),
            in_use: self.in_use(),
            slots_per_block: Self::SLOTS_PER_BLOCK,
            block_size: BLOCK_SIZE,
        })
    }

    /// Appends a fresh block at the tail and points the free-block cursor
    /// at it.
    fn grow(&self) -> AllocResult<()> {
        debug_assert!(self.first_free_block.get().is_null());

        let block = Block::<T, BLOCK_SIZE>::allocate()?;
        let raw = block.as_ptr();

        if self.first_block.get().is_null() {
            self.first_block.set(raw);
        } else {
            // SAFETY: a non-empty chain has a live tail block.
            unsafe {
                Block::set_next_block(NonNull::new_unchecked(self.last_block.get()), raw);
            }
        }
        self.last_block.set(raw);
        self.first_free_block.set(raw);

        if self.config.track_stats {
            self.counters.record_block_alloc();
        }
        #[cfg(feature = "logging")]
        debug!(block = ?raw, slots = Self::SLOTS_PER_BLOCK, "allocated pool block");

        Ok(())
    }

    /// Handles a block whose last slot was just freed: either retains it as
    /// the single spare (`leave_free_block`) or unlinks it from the chain
    /// and releases its storage.
    ///
    /// # Safety
    ///
    /// `block` must be a fully free live block of the chain and `prev` its
    /// predecessor (null when `block` is the head).
    unsafe fn retire_block(
        &self,
        block: NonNull<Block<T, BLOCK_SIZE>>,
        prev: *mut Block<T, BLOCK_SIZE>,
    ) {
        let raw = block.as_ptr();
        let cursor = self.first_free_block.get();

        if self.config.leave_free_block {
            // Another block with free slots makes the spare redundant;
            // otherwise this block becomes the one retained spare.
            let other_free = if cursor.is_null() {
                ptr::null_mut()
            } else if cursor != raw {
                cursor
            } else {
                // SAFETY: `block` is live.
                unsafe { self.next_free_from(Block::next_block(block)) }
            };
            if other_free.is_null() {
                self.first_free_block.set(raw);
                #[cfg(feature = "logging")]
                trace!(block = ?raw, "retaining fully free block");
                return;
            }
        }

        // SAFETY: `block` is live until the final release below; `prev`,
        // when non-null, is its live predecessor.
        unsafe {
            if cursor == raw {
                self.first_free_block
                    .set(self.next_free_from(Block::next_block(block)));
            }

            if prev.is_null() {
                self.first_block.set(Block::next_block(block));
            } else {
                Block::set_next_block(NonNull::new_unchecked(prev), Block::next_block(block));
            }
            if self.last_block.get() == raw {
                self.last_block.set(prev);
            }

            Block::release(block);
        }

        if self.config.track_stats {
            self.counters.record_block_release();
        }
        #[cfg(feature = "logging")]
        debug!(block = ?raw, "released fully free block");
    }

    /// First block at or after `start` with a free slot, or null.
    fn next_free_from(&self, start: *mut Block<T, BLOCK_SIZE>) -> *mut Block<T, BLOCK_SIZE> {
        let mut cur = start;
        while !cur.is_null() {
            // SAFETY: chain pointers are live blocks owned by this pool.
            unsafe {
                let block = NonNull::new_unchecked(cur);
                if Block::free_count(block) > 0 {
                    break;
                }
                cur = Block::next_block(block);
            }
        }
        cur
    }

    /// Releases every block and resets the cursors. Does not drop live
    /// values.
    fn release_all(&self) {
        let mut cur = self.first_block.get();
        while !cur.is_null() {
            // SAFETY: chain pointers are live blocks; the successor is read
            // before the block goes away.
            unsafe {
                let block = NonNull::new_unchecked(cur);
                cur = Block::next_block(block);
                Block::release(block);
            }
        }
        self.first_block.set(ptr::null_mut());
        self.last_block.set(ptr::null_mut());
        self.first_free_block.set(ptr::null_mut());
    }
}

impl<T, const BLOCK_SIZE: usize> Default for TypedPool<T, BLOCK_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const BLOCK_SIZE: usize> Clone for TypedPool<T, BLOCK_SIZE> {
    /// Cloning produces an **empty** pool with the same configuration. A
    /// pool clone never aliases the source's storage; this mirrors
    /// allocator-copy semantics expected by containers.
    fn clone(&self) -> Self {
        Self::with_config(self.config.clone())
    }
}

impl<T, const BLOCK_SIZE: usize> Drop for TypedPool<T, BLOCK_SIZE> {
    fn drop(&mut self) {
        self.release_all();
    }
}

// SAFETY: the pool can move to another thread together with its blocks when
// the values themselves can. Cell-based cursors keep it !Sync, so no
// concurrent access is possible on one instance.
unsafe impl<T: Send, const BLOCK_SIZE: usize> Send for TypedPool<T, BLOCK_SIZE> {}

// SAFETY: slots handed out through the layout surface are valid for
// `layout.size() <= size_of::<Slot<T>>()` bytes at slot alignment.
unsafe impl<T, const BLOCK_SIZE: usize> RawAllocator for TypedPool<T, BLOCK_SIZE> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.size() > mem::size_of::<Slot<T>>()
            || layout.align() > mem::align_of::<Slot<T>>()
        {
            return Err(AllocError::invalid_layout("layout exceeds pool slot", layout));
        }
        if layout.size() == 0 {
            return Ok(NonNull::slice_from_raw_parts(NonNull::dangling(), 0));
        }

        let ptr = TypedPool::allocate(self)?;
        Ok(NonNull::slice_from_raw_parts(ptr.cast::<u8>(), layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        // SAFETY: caller contract matches the typed surface's contract.
        unsafe { TypedPool::deallocate(self, ptr.cast::<T>()) };
    }
}

impl<T, const BLOCK_SIZE: usize> MemoryUsage for TypedPool<T, BLOCK_SIZE> {
    fn used_memory(&self) -> usize {
        self.in_use() * mem::size_of::<Slot<T>>()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.free_slots() * mem::size_of::<Slot<T>>())
    }

    /// Total footprint: whole blocks, headers included.
    fn total_memory(&self) -> Option<usize> {
        Some(self.block_count() * BLOCK_SIZE)
    }
}

impl<T, const BLOCK_SIZE: usize> Resettable for TypedPool<T, BLOCK_SIZE> {
    unsafe fn reset(&self) {
        self.release_all();
        #[cfg(feature = "logging")]
        debug!("pool reset: released every block");
    }
}

/// Returns the slot to the pool when dropped. Armed while a constructor
/// closure runs, disarmed with `mem::forget` once the value is written.
struct DeallocateOnDrop<'pool, T, const BLOCK_SIZE: usize> {
    pool: &'pool TypedPool<T, BLOCK_SIZE>,
    ptr: NonNull<T>,
}

impl<T, const BLOCK_SIZE: usize> Drop for DeallocateOnDrop<'_, T, BLOCK_SIZE> {
    fn drop(&mut self) {
        // SAFETY: the slot was just allocated and no value was written.
        unsafe { self.pool.deallocate(self.ptr) };
    }
}
