/*!
 * Dynamic Allocator
 * Malloc/free-shaped API over one freelist and one byte arena
 *
 * Converts "allocate N aligned bytes" requests into freelist reservations
 * large enough for alignment slack plus embedded metadata, so a later free
 * needs nothing but the address. The arena is addressed by arena-relative
 * offsets; payload access goes through [`DynamicAllocator::read_bytes`] and
 * [`DynamicAllocator::write_bytes`], keeping raw offset math inside this
 * module.
 */

mod header;

use crate::core::limits::PRESSURE_WARNING;
use crate::core::types::{align_up, Address, Size};
use crate::freelist::Freelist;
use crate::traits::{BlockAllocator, MemoryInfo};
use crate::types::{AllocError, AllocResult, MemoryReport};
use header::{AllocHeader, HEADER_LEN, METADATA_LEN, SIZE_PREFIX_LEN};
use log::{trace, warn};

pub use header::METADATA_LEN as ALLOCATION_OVERHEAD;

/// Fixed-arena dynamic allocator
///
/// Owns a `total_size`-byte arena and the freelist tracking its unused
/// ranges. Created via the two-phase protocol; never `Clone` (copying
/// would duplicate arena ownership). Destroying the allocator releases
/// the arena and all accounting at once.
pub struct DynamicAllocator {
    total_size: Size,
    freelist: Freelist,
    arena: Box<[u8]>,
    used: Size,
    live_allocations: usize,
}

impl DynamicAllocator {
    /// Phase one of construction: bytes of backing storage an allocator for
    /// a `total_size`-byte arena needs (freelist accounting plus the arena
    /// itself).
    pub fn memory_requirement(total_size: Size) -> usize {
        Freelist::memory_requirement(total_size) + total_size
    }

    /// Phase two of construction: build the allocator over caller-owned
    /// `storage` of exactly `memory_requirement(total_size)` bytes.
    ///
    /// The block is partitioned into freelist accounting followed by the
    /// user arena; the arena is zeroed.
    pub fn create(total_size: Size, storage: Box<[u8]>) -> AllocResult<Self> {
        if total_size == 0 {
            return Err(AllocError::InvalidSize(0));
        }

        let required = Self::memory_requirement(total_size);
        if storage.len() != required {
            return Err(AllocError::StorageSizeMismatch {
                provided: storage.len(),
                required,
            });
        }

        let mut accounting = storage.into_vec();
        let mut arena = accounting.split_off(Freelist::memory_requirement(total_size));
        arena.fill(0);

        let freelist = Freelist::create(total_size, accounting.into_boxed_slice())?;

        trace!(
            "Dynamic allocator created: {} byte arena, {} bytes total storage",
            total_size,
            required
        );

        Ok(Self {
            total_size,
            freelist,
            arena: arena.into_boxed_slice(),
            used: 0,
            live_allocations: 0,
        })
    }

    /// Run both construction phases with internally allocated storage, for
    /// callers that do not need the zero-allocation bootstrap.
    pub fn with_capacity(total_size: Size) -> AllocResult<Self> {
        let storage = vec![0u8; Self::memory_requirement(total_size)].into_boxed_slice();
        Self::create(total_size, storage)
    }

    /// Allocate `size` bytes aligned to `alignment`, a power of two.
    ///
    /// Reserves `alignment + 16 + size` bytes from the freelist: alignment
    /// slack, a u32 size prefix before the payload, and a trailing
    /// `{base_offset, alignment}` header after it. Returns the aligned
    /// arena-relative address of the payload.
    pub fn allocate_aligned(&mut self, size: Size, alignment: Size) -> AllocResult<Address> {
        if size == 0 || size > u32::MAX as usize {
            return Err(AllocError::InvalidSize(size));
        }
        if alignment == 0 || alignment > u32::MAX as usize || !alignment.is_power_of_two() {
            return Err(AllocError::InvalidAlignment(alignment));
        }

        // Reject reservations the offset width cannot represent instead of
        // silently truncating.
        let reservation = alignment
            .checked_add(METADATA_LEN)
            .and_then(|r| r.checked_add(size))
            .ok_or(AllocError::InvalidSize(size))?;

        let base = self.freelist.allocate_block(reservation)?;
        let aligned = align_up(base + SIZE_PREFIX_LEN, alignment);

        header::write_prefix(&mut self.arena, aligned, size);
        header::write_header(
            &mut self.arena,
            aligned,
            size,
            AllocHeader {
                base_offset: base,
                alignment,
            },
        );

        self.used += reservation;
        self.live_allocations += 1;

        let ratio = self.used as f64 / self.total_size as f64;
        if ratio >= PRESSURE_WARNING {
            warn!(
                "Memory pressure: allocated {} bytes at {:#x} ({:.1}% of {} byte arena used)",
                size,
                aligned,
                ratio * 100.0,
                self.total_size
            );
        } else {
            trace!("Allocated {} bytes at {:#x} (alignment {})", size, aligned, alignment);
        }

        Ok(aligned)
    }

    /// Allocate `size` bytes with byte granularity.
    pub fn allocate(&mut self, size: Size) -> AllocResult<Address> {
        self.allocate_aligned(size, 1)
    }

    /// Free the allocation at `address` using its stored metadata.
    ///
    /// Addresses outside the arena are rejected without touching any state;
    /// addresses inside the arena that do not carry coherent metadata (a
    /// double free, or an address this allocator never returned) fail as
    /// corruption.
    pub fn free_aligned(&mut self, address: Address) -> AllocResult<()> {
        let (size, alignment, base) = self.metadata_of(address)?;
        let reservation = alignment + METADATA_LEN + size;

        self.freelist.free_block(reservation, base)?;
        header::scrub(&mut self.arena, address, size);

        self.used -= reservation;
        self.live_allocations -= 1;

        trace!("Freed {} bytes at {:#x}", size, address);
        Ok(())
    }

    /// Free with an explicit size argument, kept for call-site symmetry
    /// with [`DynamicAllocator::allocate`]. The stored prefix is
    /// authoritative; a mismatching `size` is logged and ignored.
    pub fn free(&mut self, address: Address, size: Size) -> AllocResult<()> {
        let (stored, _, _) = self.metadata_of(address)?;
        if size != stored {
            warn!(
                "Free at {:#x} passed size {}, stored size is {}; using stored size",
                address, size, stored
            );
        }
        self.free_aligned(address)
    }

    /// Read back the size and alignment recorded for the allocation at
    /// `address`, without freeing it.
    pub fn get_size_alignment(&self, address: Address) -> AllocResult<(Size, Size)> {
        let (size, alignment, _) = self.metadata_of(address)?;
        Ok((size, alignment))
    }

    /// Copy `data` into the payload of the allocation at `address`.
    pub fn write_bytes(&mut self, address: Address, data: &[u8]) -> AllocResult<()> {
        let (size, _, _) = self.metadata_of(address)?;
        if data.len() > size {
            return Err(AllocError::InvalidSize(data.len()));
        }
        self.arena[address..address + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Copy `len` payload bytes out of the allocation at `address`.
    pub fn read_bytes(&self, address: Address, len: Size) -> AllocResult<Vec<u8>> {
        let (size, _, _) = self.metadata_of(address)?;
        if len > size {
            return Err(AllocError::InvalidSize(len));
        }
        Ok(self.arena[address..address + len].to_vec())
    }

    /// Remaining free bytes. O(n) over the free-range list.
    pub fn free_space(&self) -> Size {
        self.freelist.free_space()
    }

    /// Arena capacity in bytes
    pub fn total_space(&self) -> Size {
        self.total_size
    }

    /// Statistics snapshot
    pub fn report(&self) -> MemoryReport {
        let free_space = self.freelist.free_space();
        MemoryReport {
            total_space: self.total_size,
            used_space: self.used,
            free_space,
            usage_percentage: (self.used as f64 / self.total_size as f64) * 100.0,
            live_allocations: self.live_allocations,
            free_ranges: self.freelist.range_count(),
        }
    }

    /// Validate `address` and decode the metadata of the allocation there.
    ///
    /// Returns `(size, alignment, base_offset)`. The arena is zeroed at
    /// creation and metadata is scrubbed on free, so stale or foreign
    /// addresses decode a zero size and are rejected before the freelist
    /// sees them.
    fn metadata_of(&self, address: Address) -> AllocResult<(Size, Size, Address)> {
        if address < SIZE_PREFIX_LEN || address >= self.total_size {
            warn!(
                "Address {:#x} is outside the {} byte arena",
                address, self.total_size
            );
            return Err(AllocError::OutOfRange(address));
        }

        let size = header::read_prefix(&self.arena, address);
        if size == 0 {
            warn!("No live allocation at {:#x}; double free or foreign address", address);
            return Err(AllocError::CorruptionDetected(address));
        }

        address
            .checked_add(size)
            .and_then(|e| e.checked_add(HEADER_LEN))
            .filter(|&e| e <= self.total_size)
            .ok_or(AllocError::CorruptionDetected(address))?;

        // Header bytes sit inside payload-reachable memory, so every decoded
        // field is untrusted until it survives checked recomputation.
        let decoded = header::read_header(&self.arena, address, size);
        if decoded.alignment == 0
            || !decoded.alignment.is_power_of_two()
            || decoded.alignment > self.total_size
        {
            return Err(AllocError::CorruptionDetected(address));
        }
        let payload_start = decoded
            .base_offset
            .checked_add(SIZE_PREFIX_LEN)
            .filter(|&start| start <= address)
            .ok_or(AllocError::CorruptionDetected(address))?;
        if align_up(payload_start, decoded.alignment) != address {
            return Err(AllocError::CorruptionDetected(address));
        }

        Ok((size, decoded.alignment, decoded.base_offset))
    }
}

impl BlockAllocator for DynamicAllocator {
    fn allocate(&mut self, size: Size) -> AllocResult<Address> {
        DynamicAllocator::allocate(self, size)
    }

    fn allocate_aligned(&mut self, size: Size, alignment: Size) -> AllocResult<Address> {
        DynamicAllocator::allocate_aligned(self, size, alignment)
    }

    fn free(&mut self, address: Address, size: Size) -> AllocResult<()> {
        DynamicAllocator::free(self, address, size)
    }

    fn free_aligned(&mut self, address: Address) -> AllocResult<()> {
        DynamicAllocator::free_aligned(self, address)
    }

    fn get_size_alignment(&self, address: Address) -> AllocResult<(Size, Size)> {
        DynamicAllocator::get_size_alignment(self, address)
    }
}

impl MemoryInfo for DynamicAllocator {
    fn report(&self) -> MemoryReport {
        DynamicAllocator::report(self)
    }

    fn free_space(&self) -> Size {
        DynamicAllocator::free_space(self)
    }

    fn total_space(&self) -> Size {
        DynamicAllocator::total_space(self)
    }
}
