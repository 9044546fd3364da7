/*!
 * Freelist Node Pool
 * Bounded node table carved out of caller-supplied storage
 */

use crate::core::types::INVALID_ID;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;

/// Sentinel carried in `offset` and `size` while a slot is not part of the
/// live free-range list.
pub(super) const UNUSED: u64 = u64::MAX;

/// One free-range node. `next` is an index into the pool rather than a
/// native pointer, so the list never allocates behind the arena's back and
/// stays valid when the owning struct moves.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub(super) struct FreeListNode {
    pub offset: u64,
    pub size: u64,
    pub next: u32,
}

impl FreeListNode {
    #[inline]
    pub fn is_unused(&self) -> bool {
        self.offset == UNUSED && self.size == UNUSED
    }
}

/// Fixed-capacity node table backed by the caller's byte block.
///
/// The block is taken apart into raw parts at construction and viewed as a
/// `FreeListNode` slice at an aligned offset inside it. This is the only
/// raw-memory boundary in the crate; everything above works with node
/// indices through the safe accessors below.
#[derive(Debug)]
pub(super) struct NodePool {
    storage: NonNull<u8>,
    storage_len: usize,
    nodes: NonNull<FreeListNode>,
    capacity: u32,
}

impl NodePool {
    /// Bytes a pool of `capacity` nodes occupies, including alignment slack
    /// so the table fits at any storage alignment.
    pub fn footprint(capacity: u32) -> usize {
        capacity as usize * size_of::<FreeListNode>() + align_of::<FreeListNode>()
    }

    /// Build a pool over `storage`, which must be at least
    /// `footprint(capacity)` bytes. All slots start unused.
    pub fn new(storage: Box<[u8]>, capacity: u32) -> Self {
        debug_assert!(storage.len() >= Self::footprint(capacity));

        let storage_len = storage.len();
        // SAFETY: `Box::into_raw` always returns a non-null pointer. The
        // allocation is reconstructed and released in `drop`.
        let storage = unsafe { NonNull::new_unchecked(Box::into_raw(storage).cast::<u8>()) };

        let skew = storage.as_ptr().align_offset(align_of::<FreeListNode>());
        // SAFETY: `footprint` reserves one alignment's worth of slack, so
        // the aligned table of `capacity` nodes lies inside the block.
        let nodes = unsafe { NonNull::new_unchecked(storage.as_ptr().add(skew).cast()) };

        let mut pool = Self {
            storage,
            storage_len,
            nodes,
            capacity,
        };
        pool.reset();
        pool
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub fn storage_len(&self) -> usize {
        self.storage_len
    }

    /// Shared view of the node table.
    #[inline]
    pub fn nodes(&self) -> &[FreeListNode] {
        // SAFETY: `nodes` points at `capacity` in-bounds, aligned slots
        // inside storage this pool exclusively owns, and every bit pattern
        // is a valid `FreeListNode` (plain integers).
        unsafe { std::slice::from_raw_parts(self.nodes.as_ptr(), self.capacity as usize) }
    }

    /// Mutable view of the node table.
    #[inline]
    pub fn nodes_mut(&mut self) -> &mut [FreeListNode] {
        // SAFETY: as `nodes`; `&mut self` guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.nodes.as_ptr(), self.capacity as usize) }
    }

    /// Borrow an unused slot, or `None` when every slot is in use.
    pub fn acquire(&mut self) -> Option<u32> {
        self.nodes()
            .iter()
            .position(FreeListNode::is_unused)
            .map(|idx| idx as u32)
    }

    /// Return a slot to the pool.
    pub fn release(&mut self, id: u32) {
        let node = &mut self.nodes_mut()[id as usize];
        node.offset = UNUSED;
        node.size = UNUSED;
        node.next = INVALID_ID;
    }

    /// Mark every slot unused.
    pub fn reset(&mut self) {
        for node in self.nodes_mut() {
            node.offset = UNUSED;
            node.size = UNUSED;
            node.next = INVALID_ID;
        }
    }
}

impl Drop for NodePool {
    fn drop(&mut self) {
        let slice = std::ptr::slice_from_raw_parts_mut(self.storage.as_ptr(), self.storage_len);
        // SAFETY: `storage`/`storage_len` are the raw parts of the boxed
        // slice taken in `new` and released exactly once here.
        unsafe { drop(Box::from_raw(slice)) };
    }
}

// SAFETY: the pool exclusively owns its backing storage; no shared state.
unsafe impl Send for NodePool {}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(capacity: u32) -> NodePool {
        let storage = vec![0u8; NodePool::footprint(capacity)].into_boxed_slice();
        NodePool::new(storage, capacity)
    }

    #[test]
    fn test_all_slots_start_unused() {
        let pool = pool_of(16);
        assert_eq!(pool.capacity(), 16);
        assert!(pool.nodes().iter().all(FreeListNode::is_unused));
    }

    #[test]
    fn test_acquire_release_cycle() {
        let mut pool = pool_of(4);

        let a = pool.acquire().unwrap();
        pool.nodes_mut()[a as usize].offset = 0;
        pool.nodes_mut()[a as usize].size = 128;

        let b = pool.acquire().unwrap();
        assert_ne!(a, b);

        pool.release(a);
        assert_eq!(pool.acquire(), Some(a)); // lowest unused slot comes back first
    }

    #[test]
    fn test_exhaustion() {
        let mut pool = pool_of(2);
        for _ in 0..2 {
            let id = pool.acquire().unwrap();
            pool.nodes_mut()[id as usize].offset = 0;
            pool.nodes_mut()[id as usize].size = 1;
        }
        assert_eq!(pool.acquire(), None);
    }
}
