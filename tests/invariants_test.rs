/*!
 * Allocator Invariant Tests
 * Property checks over randomized allocate/free sequences
 */

use proptest::prelude::*;
use suballoc::allocator::ALLOCATION_OVERHEAD;
use suballoc::DynamicAllocator;

const ARENA_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
enum Op {
    /// Allocate `size` bytes at alignment `1 << align_pow`
    Allocate { size: usize, align_pow: u32 },
    /// Free the live allocation at `pick % live.len()`
    Free { pick: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..2048, 0u32..7).prop_map(|(size, align_pow)| Op::Allocate { size, align_pow }),
        (0usize..64).prop_map(|pick| Op::Free { pick }),
    ]
}

proptest! {
    /// At every observation point, free space plus the sum of live
    /// reservations equals the arena size.
    #[test]
    fn conservation_holds_across_sequences(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let mut allocator = DynamicAllocator::with_capacity(ARENA_SIZE).unwrap();
        let mut live: Vec<(usize, usize)> = Vec::new(); // (address, reservation)

        for op in ops {
            match op {
                Op::Allocate { size, align_pow } => {
                    let alignment = 1usize << align_pow;
                    if let Ok(address) = allocator.allocate_aligned(size, alignment) {
                        prop_assert_eq!(address % alignment, 0);
                        live.push((address, alignment + ALLOCATION_OVERHEAD + size));
                    }
                }
                Op::Free { pick } => {
                    if !live.is_empty() {
                        let (address, _) = live.swap_remove(pick % live.len());
                        allocator.free_aligned(address).unwrap();
                    }
                }
            }

            let reserved: usize = live.iter().map(|(_, r)| r).sum();
            prop_assert_eq!(allocator.free_space() + reserved, ARENA_SIZE);
        }

        // Draining every live allocation must reassemble one free range
        // covering the whole arena, whatever order the frees happen in.
        while let Some((address, _)) = live.pop() {
            allocator.free_aligned(address).unwrap();
        }
        prop_assert_eq!(allocator.free_space(), ARENA_SIZE);
        prop_assert_eq!(allocator.report().free_ranges, 1);
        prop_assert_eq!(allocator.report().live_allocations, 0);
    }

    /// Stored metadata always reads back exactly what was requested.
    #[test]
    fn metadata_round_trips(size in 1usize..4096, align_pow in 0u32..9) {
        let mut allocator = DynamicAllocator::with_capacity(ARENA_SIZE).unwrap();
        let alignment = 1usize << align_pow;

        let address = allocator.allocate_aligned(size, alignment).unwrap();
        prop_assert_eq!(allocator.get_size_alignment(address).unwrap(), (size, alignment));

        allocator.free_aligned(address).unwrap();
        prop_assert_eq!(allocator.free_space(), ARENA_SIZE);
    }

    /// Freeing a split pair in either order always coalesces back to the
    /// pre-split state.
    #[test]
    fn coalescing_is_complete(first in 64usize..512, second in 64usize..512, reverse in any::<bool>()) {
        let mut allocator = DynamicAllocator::with_capacity(ARENA_SIZE).unwrap();

        let a = allocator.allocate(first).unwrap();
        let b = allocator.allocate(second).unwrap();

        if reverse {
            allocator.free_aligned(b).unwrap();
            allocator.free_aligned(a).unwrap();
        } else {
            allocator.free_aligned(a).unwrap();
            allocator.free_aligned(b).unwrap();
        }

        prop_assert_eq!(allocator.free_space(), ARENA_SIZE);
        prop_assert_eq!(allocator.report().free_ranges, 1);
    }
}
