/*!
 * Freelist
 * Ordered free-range tracker over a fixed-size arena
 *
 * Tracks unused byte ranges `[offset, offset + size)` as a singly linked
 * list in ascending offset order. List nodes come from a bounded pool
 * carved out of caller-supplied storage, so the tracker never allocates to
 * do its own bookkeeping.
 *
 * Allocation policy is first-fit: the scan returns the lowest-offset range
 * large enough for the request, splitting larger ranges from the front.
 * This favors low-offset reuse and keeps the scan simple at the cost of
 * potential fragmentation, which is reported rather than resolved.
 */

mod pool;

use crate::core::limits::MIN_FREELIST_ENTRIES;
use crate::core::types::{Address, Size, INVALID_ID};
use crate::types::{AllocError, AllocResult};
use log::{error, info, warn};
use pool::{FreeListNode, NodePool};

/// Free-range tracker for a fixed arena
///
/// Constructed via the two-phase protocol: [`Freelist::memory_requirement`]
/// for the storage footprint, then [`Freelist::create`] with a block of
/// exactly that size. Not `Clone`: one tracker owns one arena's accounting.
#[derive(Debug)]
pub struct Freelist {
    total_size: Size,
    head: u32,
    pool: NodePool,
}

impl Freelist {
    /// Node-pool entry count for an arena of `total_size` bytes.
    ///
    /// One entry per pointer-width of arena is enough for worst-case
    /// fragmentation while keeping the pool small relative to the arena it
    /// tracks.
    fn max_entries(total_size: Size) -> u32 {
        (total_size / std::mem::size_of::<usize>())
            .max(MIN_FREELIST_ENTRIES)
            .min(u32::MAX as usize) as u32
    }

    /// Phase one of construction: bytes of backing storage a freelist for
    /// `total_size` needs.
    pub fn memory_requirement(total_size: Size) -> usize {
        NodePool::footprint(Self::max_entries(total_size))
    }

    /// Phase two of construction: build the tracker over caller-owned
    /// `storage` of exactly `memory_requirement(total_size)` bytes.
    ///
    /// Starts with a single free range covering the whole arena.
    pub fn create(total_size: Size, storage: Box<[u8]>) -> AllocResult<Self> {
        if total_size == 0 {
            return Err(AllocError::InvalidSize(0));
        }

        let required = Self::memory_requirement(total_size);
        if storage.len() != required {
            error!(
                "Freelist storage mismatch: provided {} bytes, required {}",
                storage.len(),
                required
            );
            return Err(AllocError::StorageSizeMismatch {
                provided: storage.len(),
                required,
            });
        }

        if required > total_size {
            warn!(
                "Freelist overhead ({} bytes) exceeds the {} byte arena it tracks; \
                 consider a larger arena",
                required, total_size
            );
        }

        let capacity = Self::max_entries(total_size);
        let mut pool = NodePool::new(storage, capacity);
        pool.nodes_mut()[0] = FreeListNode {
            offset: 0,
            size: total_size as u64,
            next: INVALID_ID,
        };

        info!(
            "Freelist created: {} byte arena, {} node entries ({} bytes of storage)",
            total_size,
            capacity,
            pool.storage_len()
        );

        Ok(Self {
            total_size,
            head: 0,
            pool,
        })
    }

    /// Reserve `size` bytes, returning the arena offset of the reservation.
    ///
    /// First-fit by ascending offset. An exact-size range is detached and
    /// its node returned to the pool; a larger range is split from the
    /// front in place, consuming no extra node.
    pub fn allocate_block(&mut self, size: Size) -> AllocResult<Address> {
        if size == 0 {
            return Err(AllocError::InvalidSize(0));
        }

        let wanted = size as u64;
        let mut prev = INVALID_ID;
        let mut current = self.head;

        while current != INVALID_ID {
            let node = self.pool.nodes()[current as usize];

            if node.size == wanted {
                // Exact match: detach the whole range.
                if prev == INVALID_ID {
                    self.head = node.next;
                } else {
                    self.pool.nodes_mut()[prev as usize].next = node.next;
                }
                self.pool.release(current);
                return Ok(node.offset as Address);
            }

            if node.size > wanted {
                // Split from the front: the remainder keeps this node.
                let slot = &mut self.pool.nodes_mut()[current as usize];
                let offset = slot.offset;
                slot.offset += wanted;
                slot.size -= wanted;
                return Ok(offset as Address);
            }

            prev = current;
            current = node.next;
        }

        let available = self.free_space();
        error!(
            "Freelist exhausted: no block of {} bytes found, {} bytes free of {} total",
            size, available, self.total_size
        );
        Err(AllocError::OutOfMemory {
            requested: size,
            available,
            total: self.total_size,
        })
    }

    /// Return the range `[offset, offset + size)` to the tracker.
    ///
    /// The range is inserted in ascending offset order and coalesced with
    /// both neighbors when byte-exact adjacent; a freed range can bridge
    /// two formerly separated neighbors into one. Ranges overlapping a
    /// tracked range, or extending past the arena, fail as corruption:
    /// either a double free or an offset this list never handed out.
    pub fn free_block(&mut self, size: Size, offset: Address) -> AllocResult<()> {
        if size == 0 {
            return Err(AllocError::InvalidSize(0));
        }
        let end = offset
            .checked_add(size)
            .filter(|&e| e <= self.total_size)
            .ok_or_else(|| {
                error!(
                    "Freed range [{:#x}, +{}) extends past the {} byte arena; corruption possible",
                    offset, size, self.total_size
                );
                AllocError::CorruptionDetected(offset)
            })?;

        // Fully-allocated arena: the freed range becomes the new head.
        if self.head == INVALID_ID {
            let id = self.acquire_node(offset, size, INVALID_ID)?;
            self.head = id;
            return Ok(());
        }

        let offset_u = offset as u64;
        let mut prev = INVALID_ID;
        let mut current = self.head;

        while current != INVALID_ID {
            let node = self.pool.nodes()[current as usize];

            if node.offset == offset_u {
                // Re-free at a tracked offset grows that range in place. The
                // grown extent must still stop short of the next tracked
                // range (and the arena end when there is none).
                let grown = offset_u + node.size + size as u64;
                let limit = if node.next != INVALID_ID {
                    self.pool.nodes()[node.next as usize].offset
                } else {
                    self.total_size as u64
                };
                if grown > limit {
                    return Err(self.corruption(offset, size));
                }
                self.pool.nodes_mut()[current as usize].size += size as u64;
                self.coalesce_with_next(current);
                return Ok(());
            }

            if node.offset > offset_u {
                if (end as u64) > node.offset || self.overlaps_prev(prev, offset_u) {
                    return Err(self.corruption(offset, size));
                }
                let id = self.acquire_node(offset, size, current)?;
                if prev == INVALID_ID {
                    self.head = id;
                } else {
                    self.pool.nodes_mut()[prev as usize].next = id;
                }
                self.coalesce_with_next(id);
                if prev != INVALID_ID {
                    self.coalesce_with_next(prev);
                }
                return Ok(());
            }

            prev = current;
            current = node.next;
        }

        // Past the last tracked range: append.
        if self.overlaps_prev(prev, offset_u) {
            return Err(self.corruption(offset, size));
        }
        let id = self.acquire_node(offset, size, INVALID_ID)?;
        self.pool.nodes_mut()[prev as usize].next = id;
        self.coalesce_with_next(prev);
        Ok(())
    }

    /// Reset to the single-range, fully-free state without releasing the
    /// backing storage.
    pub fn clear(&mut self) {
        self.pool.reset();
        self.pool.nodes_mut()[0] = FreeListNode {
            offset: 0,
            size: self.total_size as u64,
            next: INVALID_ID,
        };
        self.head = 0;
    }

    /// Sum of all free ranges. O(n); diagnostics and assertions only.
    pub fn free_space(&self) -> Size {
        let mut total = 0u64;
        let mut current = self.head;
        while current != INVALID_ID {
            let node = self.pool.nodes()[current as usize];
            total += node.size;
            current = node.next;
        }
        total as Size
    }

    /// Number of live free ranges. O(n); diagnostics only.
    pub fn range_count(&self) -> usize {
        let mut count = 0;
        let mut current = self.head;
        while current != INVALID_ID {
            count += 1;
            current = self.pool.nodes()[current as usize].next;
        }
        count
    }

    /// Arena size this tracker covers
    pub fn total_size(&self) -> Size {
        self.total_size
    }

    fn acquire_node(&mut self, offset: Address, size: Size, next: u32) -> AllocResult<u32> {
        let capacity = self.pool.capacity();
        let id = self.pool.acquire().ok_or_else(|| {
            error!(
                "Freelist node pool exhausted: all {} entries in use while freeing [{:#x}, +{})",
                capacity, offset, size
            );
            AllocError::NodePoolExhausted { capacity }
        })?;
        self.pool.nodes_mut()[id as usize] = FreeListNode {
            offset: offset as u64,
            size: size as u64,
            next,
        };
        Ok(id)
    }

    /// Merge `id`'s next range into `id` when byte-exact adjacent.
    fn coalesce_with_next(&mut self, id: u32) {
        let node = self.pool.nodes()[id as usize];
        if node.next == INVALID_ID {
            return;
        }
        let next = self.pool.nodes()[node.next as usize];
        if node.offset + node.size == next.offset {
            let slot = &mut self.pool.nodes_mut()[id as usize];
            slot.size += next.size;
            slot.next = next.next;
            self.pool.release(node.next);
        }
    }

    fn overlaps_prev(&self, prev: u32, offset: u64) -> bool {
        if prev == INVALID_ID {
            return false;
        }
        let node = self.pool.nodes()[prev as usize];
        node.offset + node.size > offset
    }

    fn corruption(&self, offset: Address, size: Size) -> AllocError {
        error!(
            "No valid insertion point for freed range [{:#x}, +{}); double free or \
             foreign offset, corruption possible",
            offset, size
        );
        AllocError::CorruptionDetected(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freelist(total_size: Size) -> Freelist {
        let storage = vec![0u8; Freelist::memory_requirement(total_size)].into_boxed_slice();
        Freelist::create(total_size, storage).unwrap()
    }

    #[test]
    fn test_create_single_range() {
        let list = freelist(4096);
        assert_eq!(list.free_space(), 4096);
        assert_eq!(list.range_count(), 1);
        assert_eq!(list.total_size(), 4096);
    }

    #[test]
    fn test_create_storage_mismatch() {
        let err = Freelist::create(4096, vec![0u8; 10].into_boxed_slice()).unwrap_err();
        assert!(matches!(err, AllocError::StorageSizeMismatch { provided: 10, .. }));
    }

    #[test]
    fn test_first_fit_splits_from_front() {
        let mut list = freelist(4096);
        let a = list.allocate_block(64).unwrap();
        let b = list.allocate_block(64).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 64);
        assert_eq!(list.free_space(), 4096 - 128);
        assert_eq!(list.range_count(), 1);
    }

    #[test]
    fn test_exact_fit_detaches_range() {
        let mut list = freelist(512);
        let a = list.allocate_block(512).unwrap();
        assert_eq!(a, 0);
        assert_eq!(list.free_space(), 0);
        assert_eq!(list.range_count(), 0);

        assert!(matches!(
            list.allocate_block(1),
            Err(AllocError::OutOfMemory { requested: 1, available: 0, total: 512 })
        ));

        list.free_block(512, a).unwrap();
        assert_eq!(list.free_space(), 512);
        assert_eq!(list.range_count(), 1);
    }

    #[test]
    fn test_free_reuses_low_offset_first() {
        let mut list = freelist(4096);
        let a = list.allocate_block(128).unwrap();
        let _b = list.allocate_block(128).unwrap();
        list.free_block(128, a).unwrap();

        // First-fit prefers the freed low-offset hole.
        let c = list.allocate_block(64).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn test_coalesce_forward_and_backward() {
        let mut list = freelist(4096);
        let a = list.allocate_block(100).unwrap();
        let b = list.allocate_block(100).unwrap();
        let c = list.allocate_block(100).unwrap();
        assert_eq!((a, b, c), (0, 100, 200));

        // Free outer blocks first, then the bridge.
        list.free_block(100, a).unwrap();
        list.free_block(100, c).unwrap();
        assert_eq!(list.range_count(), 2);

        list.free_block(100, b).unwrap();
        assert_eq!(list.range_count(), 1);
        assert_eq!(list.free_space(), 4096);
    }

    #[test]
    fn test_free_order_does_not_matter() {
        for order in [[0usize, 1, 2], [2, 1, 0], [1, 0, 2], [1, 2, 0]] {
            let mut list = freelist(2048);
            let blocks: Vec<Address> =
                (0..3).map(|_| list.allocate_block(256).unwrap()).collect();
            for idx in order {
                list.free_block(256, blocks[idx]).unwrap();
            }
            assert_eq!(list.range_count(), 1, "order {order:?}");
            assert_eq!(list.free_space(), 2048, "order {order:?}");
        }
    }

    #[test]
    fn test_free_past_arena_is_corruption() {
        let mut list = freelist(1024);
        assert!(matches!(
            list.free_block(64, 1000),
            Err(AllocError::CorruptionDetected(1000))
        ));
    }

    #[test]
    fn test_free_overlapping_range_is_corruption() {
        let mut list = freelist(1024);
        let a = list.allocate_block(128).unwrap();
        list.free_block(128, a).unwrap();

        // [64, 192) overlaps the tracked [0, 1024) range.
        assert!(matches!(
            list.free_block(128, 64),
            Err(AllocError::CorruptionDetected(64))
        ));
    }

    #[test]
    fn test_clear_restores_full_arena() {
        let mut list = freelist(1024);
        let _ = list.allocate_block(600).unwrap();
        let _ = list.allocate_block(100).unwrap();
        list.clear();
        assert_eq!(list.free_space(), 1024);
        assert_eq!(list.range_count(), 1);
        assert_eq!(list.allocate_block(1024).unwrap(), 0);
    }
}
