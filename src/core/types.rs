/*!
 * Core Types
 * Common types used across the allocator
 */

/// Arena-relative byte address. Offset 0 is the first byte of the arena;
/// raw host pointers never cross the crate boundary.
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Sentinel node index meaning "no next node"
pub const INVALID_ID: u32 = u32::MAX;

/// Round `value` up to the next multiple of `alignment`.
///
/// `alignment` must be a nonzero power of two; callers validate before
/// reaching offset math.
#[inline]
#[must_use]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 8), 16);
        assert_eq!(align_up(13, 1), 13);
        assert_eq!(align_up(100, 64), 128);
    }
}
