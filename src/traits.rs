/*!
 * Allocator Traits
 * Interface seams for consumers of the allocator
 */

use crate::core::types::{Address, Size};
use crate::types::{AllocResult, MemoryPressure, MemoryReport};

/// Block allocator interface
///
/// The contract consumed by every subsystem built on the arena: renderers,
/// audio, asset caches. All operations are synchronous and non-reentrant;
/// `&mut self` makes one instance single-threaded by construction.
pub trait BlockAllocator {
    /// Allocate `size` bytes with byte granularity (alignment 1)
    fn allocate(&mut self, size: Size) -> AllocResult<Address>;

    /// Allocate `size` bytes aligned to a power-of-two boundary
    fn allocate_aligned(&mut self, size: Size, alignment: Size) -> AllocResult<Address>;

    /// Free a previously returned address; `size` is cross-checked against
    /// stored metadata and kept only for call-site symmetry with `allocate`
    fn free(&mut self, address: Address, size: Size) -> AllocResult<()>;

    /// Free a previously returned address using stored metadata alone
    fn free_aligned(&mut self, address: Address) -> AllocResult<()>;

    /// Read back the size and alignment recorded for a live allocation
    fn get_size_alignment(&self, address: Address) -> AllocResult<(Size, Size)>;
}

/// Memory statistics provider
pub trait MemoryInfo {
    /// Full statistics snapshot
    fn report(&self) -> MemoryReport;

    /// Remaining free bytes. O(n) over the free-range list; intended for
    /// diagnostics and assertions rather than hot paths.
    fn free_space(&self) -> Size;

    /// Arena capacity in bytes
    fn total_space(&self) -> Size;

    /// Current memory pressure level
    fn pressure(&self) -> MemoryPressure {
        self.report().pressure()
    }
}
