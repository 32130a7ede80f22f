//! # typed-pool
//!
//! A fixed-size object pool allocator for one object type at a time.
//!
//! The pool hands out and reclaims storage for values of a single type `T`
//! with amortized O(1) allocation and deallocation. Storage is obtained from
//! the host allocator in larger multi-slot *blocks* chained in a
//! singly-linked list; each block threads an intrusive free list through its
//! own slots and is returned to the host allocator as a whole once every
//! slot in it is free again.
//!
//! ## Quick start
//!
//! ```rust
//! use typed_pool::{PoolBox, TypedPool};
//!
//! struct Particle {
//!     position: [f32; 3],
//!     velocity: [f32; 3],
//! }
//!
//! let pool = TypedPool::<Particle>::new();
//!
//! // RAII handle: the slot is returned to the pool on drop.
//! let p = PoolBox::new_in(
//!     Particle { position: [0.0; 3], velocity: [1.0, 0.0, 0.0] },
//!     &pool,
//! )
//! .unwrap();
//! assert_eq!(p.velocity[0], 1.0);
//! drop(p);
//! assert!(pool.is_empty());
//! ```
//!
//! ## Features
//!
//! - `std` (default): enable standard library integration
//! - `logging`: structured logging of block traffic via `tracing`
//! - `serde`: serialization support for [`PoolConfig`] and [`PoolStats`]
//!
//! ## Design
//!
//! - Slots inside a fresh block are **lazily** threaded into the free list:
//!   a new block pays O(1) initialization cost and the list grows through
//!   the slot array in allocation order until deallocations start mixing it
//!   up.
//! - Deallocation walks the block chain to find the owning block, which
//!   makes it O(blocks). This is the price of whole-block reclamation.
//! - A pool instance is single-owner: it is `Send` (when `T` is) but never
//!   `Sync`. Distinct pools may be used independently on distinct threads.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

#[cfg(not(feature = "std"))]
extern crate alloc;

mod error;
pub mod pool;
mod traits;
pub mod utils;

pub use crate::error::{AllocError, AllocErrorKind, AllocResult};
pub use crate::pool::{PoolBox, PoolConfig, PoolStats, TypedPool};
pub use crate::traits::{MemoryUsage, RawAllocator, Resettable};

/// Convenient re-exports of commonly used types and traits.
pub mod prelude {
    pub use crate::error::{AllocError, AllocErrorKind, AllocResult};
    pub use crate::pool::{PoolBox, PoolConfig, PoolStats, TypedPool};
    pub use crate::traits::{MemoryUsage, RawAllocator, Resettable};
}
