/*!
 * Fixed-Arena Sub-Allocator
 * Freelist-backed dynamic allocation over caller-supplied memory
 *
 * Two components:
 * - [`Freelist`] tracks which byte ranges of a fixed logical arena are
 *   unused, using a bounded node pool carved out of caller-supplied storage.
 * - [`DynamicAllocator`] owns one freelist plus a byte arena and presents a
 *   malloc/free-shaped API: sized, optionally aligned allocations with
 *   embedded metadata so `free` needs no size or alignment arguments.
 *
 * Both follow a two-phase construction protocol: call
 * `memory_requirement(total_size)` to learn the backing-storage footprint,
 * then `create(total_size, storage)` with a block of exactly that size. The
 * allocator never allocates for its own bookkeeping after creation.
 *
 * Every operation takes `&mut self`; one instance is single-threaded by
 * contract and the borrow checker enforces it. Independent instances are
 * fully independent.
 */

pub mod allocator;
pub mod core;
pub mod freelist;
pub mod traits;
pub mod types;

// Re-exports
pub use allocator::DynamicAllocator;
pub use crate::core::types::{Address, Size};
pub use freelist::Freelist;
pub use traits::{BlockAllocator, MemoryInfo};
pub use types::{AllocError, AllocResult, MemoryPressure, MemoryReport};
