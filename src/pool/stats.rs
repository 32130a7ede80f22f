//! Statistics for pool traffic
//!
//! Counters use `Cell` rather than atomics: the pool is single-owner and
//! never `Sync`, so there is nothing to synchronize against.

use core::cell::Cell;

/// Internal counters, recorded only when
/// [`PoolConfig::track_stats`](super::PoolConfig::track_stats) is set.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    allocs: Cell<u64>,
    deallocs: Cell<u64>,
    blocks_allocated: Cell<u64>,
    blocks_released: Cell<u64>,
}

impl Counters {
    #[inline]
    pub(crate) fn record_alloc(&self) {
        self.allocs.set(self.allocs.get() + 1);
    }

    #[inline]
    pub(crate) fn record_dealloc(&self) {
        self.deallocs.set(self.deallocs.get() + 1);
    }

    #[inline]
    pub(crate) fn record_block_alloc(&self) {
        self.blocks_allocated.set(self.blocks_allocated.get() + 1);
    }

    #[inline]
    pub(crate) fn record_block_release(&self) {
        self.blocks_released.set(self.blocks_released.get() + 1);
    }

    pub(crate) fn allocs(&self) -> u64 {
        self.allocs.get()
    }

    pub(crate) fn deallocs(&self) -> u64 {
        self.deallocs.get()
    }

    pub(crate) fn blocks_allocated(&self) -> u64 {
        self.blocks_allocated.get()
    }

    pub(crate) fn blocks_released(&self) -> u64 {
        self.blocks_released.get()
    }
}

/// Point-in-time snapshot of a pool's traffic and footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolStats {
    /// Slot allocations performed since pool creation.
    pub total_allocs: u64,
    /// Slot deallocations performed since pool creation.
    pub total_deallocs: u64,
    /// Blocks obtained from the host allocator since pool creation.
    pub blocks_allocated: u64,
    /// Blocks returned to the host allocator since pool creation.
    pub blocks_released: u64,
    /// Blocks currently in the chain.
    pub current_blocks: usize,
    /// Free slots across all current blocks.
    pub free_slots: usize,
    /// Slots currently handed out.
    pub in_use: usize,
    /// Slot capacity of every block.
    pub slots_per_block: usize,
    /// Byte size of every block.
    pub block_size: usize,
}
