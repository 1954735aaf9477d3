//! Property-based invariant checks from `SPEC_FULL.md` section 8, for any sequence of valid
//! `allocate`/`deallocate` operations. Lives inside the crate (rather than in `tests/`) so
//! `assert_invariants` can reach `PoolManager::debug_segments`/`debug_gap_entries` and check
//! properties 3 and 4 (gap-index membership and ordering) against the live pool, not just
//! `gap_index.rs`'s hand-picked unit fixtures.

use proptest::prelude::*;

use crate::manager::PoolManager;
use crate::policy::Policy;
use crate::slab::NodeState;

const TOTAL_SIZE: usize = 256;

#[derive(Debug, Clone)]
enum Op {
	Allocate(usize),
	DeallocateOldest,
}

fn op_strategy() -> impl Strategy<Value = Op> {
	prop_oneof![
		(1..=TOTAL_SIZE).prop_map(Op::Allocate),
		Just(Op::DeallocateOldest),
	]
}

/// Recompute every cross-checked invariant from `SPEC_FULL.md` section 3/8 against the live pool
/// and assert they all hold.
fn assert_invariants(pool: &PoolManager) {
	let segments = pool.inspect();
	let stats = pool.stats();

	// 1. Segment sizes sum to total_size.
	let total: usize = segments.iter().map(|(size, _)| size).sum();
	assert_eq!(total, stats.total_size);

	// 2. No two adjacent segments are both gaps.
	for w in segments.windows(2) {
		assert!(
			!(w[0].1 == NodeState::Gap && w[1].1 == NodeState::Gap),
			"adjacent gaps were not coalesced: {segments:?}"
		);
	}

	// 5. alloc_bytes + sum(gap sizes) == total_size.
	let gap_bytes: usize = segments
		.iter()
		.filter(|(_, state)| *state == NodeState::Gap)
		.map(|(size, _)| size)
		.sum();
	assert_eq!(stats.alloc_bytes + gap_bytes, stats.total_size);

	// 6. alloc_count / gap_count match the segment list.
	let alloc_count = segments.iter().filter(|(_, s)| *s == NodeState::Allocated).count();
	let gap_count = segments.iter().filter(|(_, s)| *s == NodeState::Gap).count();
	assert_eq!(alloc_count, stats.alloc_count);
	assert_eq!(gap_count, stats.gap_count);

	// 3. Every gap segment has exactly one matching (size, base) entry in the gap index, and
	// the index has no entries beyond those.
	let mut expected_gaps: Vec<(usize, usize)> = pool
		.debug_segments()
		.into_iter()
		.filter(|(_, _, state)| *state == NodeState::Gap)
		.map(|(base, size, _)| (size, base))
		.collect();
	let mut actual_gaps = pool.debug_gap_entries();
	expected_gaps.sort();
	actual_gaps.sort();
	assert_eq!(
		actual_gaps, expected_gaps,
		"gap index entries do not match the set of gap segments"
	);

	// 4. The gap index is sorted strictly ascending by (size, base).
	let stored_gaps = pool.debug_gap_entries();
	assert!(
		stored_gaps.windows(2).all(|w| w[0] < w[1]),
		"gap index is not strictly sorted by (size, base): {stored_gaps:?}"
	);
}

proptest! {
	#[test]
	fn invariants_hold_after_every_operation(ops in prop::collection::vec(op_strategy(), 0..200)) {
		let mut pool = PoolManager::open(TOTAL_SIZE, Policy::FirstFit).unwrap();
		let mut live = Vec::new();

		for op in ops {
			match op {
				Op::Allocate(size) => {
					if let Ok(handle) = pool.allocate(size) {
						live.push(handle);
					}
				}
				Op::DeallocateOldest => {
					if !live.is_empty() {
						let handle = live.remove(0);
						pool.deallocate(handle).unwrap();
					}
				}
			}
			assert_invariants(&pool);
		}
	}

	#[test]
	fn invariants_hold_under_best_fit(ops in prop::collection::vec(op_strategy(), 0..200)) {
		let mut pool = PoolManager::open(TOTAL_SIZE, Policy::BestFit).unwrap();
		let mut live = Vec::new();

		for op in ops {
			match op {
				Op::Allocate(size) => {
					if let Ok(handle) = pool.allocate(size) {
						live.push(handle);
					}
				}
				Op::DeallocateOldest => {
					if !live.is_empty() {
						let handle = live.remove(0);
						pool.deallocate(handle).unwrap();
					}
				}
			}
			assert_invariants(&pool);
		}
	}

	/// Property 8: after deallocating every allocation in any order, the pool contains exactly
	/// one gap of size `total_size`.
	#[test]
	fn full_reclaim_is_idempotent(sizes in prop::collection::vec(1..=40usize, 0..20)) {
		let mut pool = PoolManager::open(TOTAL_SIZE, Policy::FirstFit).unwrap();
		let mut live = Vec::new();
		for size in sizes {
			if let Ok(handle) = pool.allocate(size) {
				live.push(handle);
			}
		}

		// Free in reverse order, a different order than allocation, per property 8's "any order".
		while let Some(handle) = live.pop() {
			pool.deallocate(handle).unwrap();
		}

		assert_eq!(pool.inspect(), vec![(TOTAL_SIZE, NodeState::Gap)]);
		assert!(pool.is_empty());
	}

	/// Property 7: freeing a region and immediately reallocating the same size, with nothing else
	/// intervening and the freed region the only gap, returns the same base address.
	#[test]
	fn round_trip_reuses_the_same_base(size in 1..=TOTAL_SIZE) {
		let mut pool = PoolManager::open(TOTAL_SIZE, Policy::FirstFit).unwrap();
		let handle = pool.allocate(size).unwrap();
		let base = pool.base_of(handle);

		pool.deallocate(handle).unwrap();
		let reused = pool.allocate(size).unwrap();
		prop_assert_eq!(pool.base_of(reused), base);
	}
}
