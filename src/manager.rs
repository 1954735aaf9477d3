//! The pool manager: ties the node slab, the address list, and the gap index together behind
//! the `allocate`/`deallocate`/`open`/`close`/`inspect` operations of `SPEC_FULL.md` section 4.

use log::{debug, error, trace};

use crate::error::PoolError;
use crate::gap_index::GapIndex;
use crate::policy::Policy;
use crate::slab::{NodeRef, NodeSlab, NodeState};

/// A handle identifying a live allocation within a single `PoolManager`. Not valid across pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocHandle(pub(crate) NodeRef);

/// Explicit configuration for [`PoolManager::open_with_config`]. The two-argument
/// [`PoolManager::open`] is a convenience constructor that builds one of these and calls through;
/// this struct is the place future knobs (initial slab/gap-index capacity, growth factor) land
/// without another breaking change to `open`'s signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
	pub size: usize,
	pub policy: Policy,
}

/// A snapshot of a pool's bookkeeping counters (`SPEC_FULL.md` section 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
	pub total_size: usize,
	pub alloc_bytes: usize,
	pub alloc_count: usize,
	pub gap_count: usize,
	pub policy: Policy,
}

/// One contiguous byte range, split into allocations and gaps.
pub struct PoolManager {
	buffer: Box<[u8]>,
	slab: NodeSlab,
	gaps: GapIndex,
	policy: Policy,
	alloc_bytes: usize,
	alloc_count: usize,
}

impl PoolManager {
	/// Open a pool of `size` bytes under `policy`. `size` must be greater than zero.
	///
	/// Convenience wrapper around [`PoolManager::open_with_config`].
	pub fn open(size: usize, policy: Policy) -> Result<Self, PoolError> {
		Self::open_with_config(PoolConfig { size, policy })
	}

	/// Open a pool per an explicit [`PoolConfig`]. `config.size` must be greater than zero.
	pub fn open_with_config(config: PoolConfig) -> Result<Self, PoolError> {
		let PoolConfig { size, policy } = config;
		if size == 0 {
			return Err(PoolError::InvalidSize);
		}

		let mut buffer = Vec::new();
		buffer
			.try_reserve_exact(size)
			.map_err(|_| PoolError::HostOutOfMemory)?;
		buffer.resize(size, 0u8);

		let slab = NodeSlab::new(size)?;
		let mut gaps = GapIndex::new();
		let root = slab.head().expect("NodeSlab::new always seeds one gap");
		gaps.insert(size, 0, root)?;

		debug!("opened pool of {size} bytes under {policy:?}");
		Ok(Self {
			buffer: buffer.into_boxed_slice(),
			slab,
			gaps,
			policy,
			alloc_bytes: 0,
			alloc_count: 0,
		})
	}

	/// Whether the pool is fully reclaimed: exactly one gap covering the whole buffer and no
	/// live allocations. `close` only succeeds when this holds.
	pub fn is_empty(&self) -> bool {
		self.alloc_count == 0 && self.gaps.len() == 1
	}

	/// Close the pool. Rejected unless [`PoolManager::is_empty`] holds.
	pub fn close(self) -> Result<(), PoolError> {
		if !self.is_empty() {
			return Err(PoolError::NotEmpty);
		}
		debug!("closed pool of {} bytes", self.buffer.len());
		Ok(())
	}

	pub fn stats(&self) -> PoolStats {
		PoolStats {
			total_size: self.buffer.len(),
			alloc_bytes: self.alloc_bytes,
			alloc_count: self.alloc_count,
			gap_count: self.gaps.len(),
			policy: self.policy,
		}
	}

	/// Base offset into the backing buffer of the allocation identified by `handle`.
	pub fn base_of(&self, handle: AllocHandle) -> usize {
		self.slab.base_of(handle.0)
	}

	/// Size in bytes of the allocation identified by `handle`.
	pub fn size_of(&self, handle: AllocHandle) -> usize {
		self.slab.size_of(handle.0)
	}

	/// Byte slice backing the allocation identified by `handle`.
	pub fn data(&self, handle: AllocHandle) -> &[u8] {
		let base = self.slab.base_of(handle.0);
		let size = self.slab.size_of(handle.0);
		&self.buffer[base..base + size]
	}

	/// Mutable byte slice backing the allocation identified by `handle`.
	pub fn data_mut(&mut self, handle: AllocHandle) -> &mut [u8] {
		let base = self.slab.base_of(handle.0);
		let size = self.slab.size_of(handle.0);
		&mut self.buffer[base..base + size]
	}

	/// Carve `size` bytes out of the pool according to the active policy.
	pub fn allocate(&mut self, size: usize) -> Result<AllocHandle, PoolError> {
		if size == 0 {
			return Err(PoolError::InvalidSize);
		}
		if self.gaps.len() == 0 {
			return Err(PoolError::NoGaps);
		}

		self.slab.reserve_slot()?;

		let gap = self
			.find_gap(size)
			.ok_or(PoolError::NoFit)?;

		// The remainder (if any) needs a fresh gap-index entry once `gap` is removed and split;
		// reserve room for it before removing anything, so a `HostOutOfMemory` here can't leave
		// `gap` removed from the index with no replacement inserted.
		let remainder = self.slab.size_of(gap) - size;
		if remainder > 0 {
			self.gaps.reserve_for_insert()?;
		}

		self.gaps.remove(gap)?;

		if remainder > 0 {
			let tail = self.slab.split(gap, size)?;
			self.gaps
				.insert(remainder, self.slab.base_of(tail), tail)?;
		}

		self.slab.set_state(gap, NodeState::Allocated);
		self.alloc_count += 1;
		self.alloc_bytes += size;

		trace!(
			"allocated {size} bytes at {:#x} (policy {:?})",
			self.slab.base_of(gap),
			self.policy
		);
		Ok(AllocHandle(gap))
	}

	fn find_gap(&self, size: usize) -> Option<NodeRef> {
		match self.policy {
			Policy::FirstFit => self
				.slab
				.iter()
				.find(|&n| self.slab.state_of(n) == NodeState::Gap && self.slab.size_of(n) >= size),
			Policy::BestFit => self.gaps.find_best_fit(size),
		}
	}

	/// Release the allocation identified by `handle`, coalescing with neighboring gaps.
	pub fn deallocate(&mut self, handle: AllocHandle) -> Result<(), PoolError> {
		let node = handle.0;
		if self.slab.state_of(node) != NodeState::Allocated {
			return Err(PoolError::UnknownHandle);
		}

		// The surviving node always needs a final gap-index entry, regardless of how much
		// coalescing happens; reserve room for it before any removal/merge starts, so a
		// `HostOutOfMemory` on the final insert can't leave a live gap absent from the index.
		self.gaps.reserve_for_insert()?;

		self.alloc_count -= 1;
		self.alloc_bytes -= self.slab.size_of(node);
		self.slab.set_state(node, NodeState::Gap);

		let mut surviving = node;

		// Forward coalesce first, so the backward step folds the combined size in one shot.
		if let Some(next) = self.slab.next_of(surviving) {
			if self.slab.state_of(next) == NodeState::Gap {
				if let Err(e) = self.gaps.remove(next) {
					error!("gap index missing entry for forward neighbor during coalesce");
					return Err(e);
				}
				self.slab.absorb_next(surviving, next);
			}
		}

		if let Some(prev) = self.slab.prev_of(surviving) {
			if self.slab.state_of(prev) == NodeState::Gap {
				if let Err(e) = self.gaps.remove(prev) {
					error!("gap index missing entry for backward neighbor during coalesce");
					return Err(e);
				}
				self.slab.absorb_next(prev, surviving);
				surviving = prev;
			}
		}

		self.gaps
			.insert(self.slab.size_of(surviving), self.slab.base_of(surviving), surviving)?;
		trace!("deallocated node, surviving gap now {} bytes", self.slab.size_of(surviving));
		Ok(())
	}

	/// Snapshot of the address-ordered list: `(size, state)` per segment.
	pub fn inspect(&self) -> Vec<(usize, NodeState)> {
		self.slab
			.iter()
			.map(|n| (self.slab.size_of(n), self.slab.state_of(n)))
			.collect()
	}

	/// Snapshot of the address-ordered list as `(base, size, state)` per segment, for property
	/// tests that need to cross-check the gap index's membership (which is keyed on base).
	#[cfg(test)]
	pub(crate) fn debug_segments(&self) -> Vec<(usize, usize, NodeState)> {
		self.slab
			.iter()
			.map(|n| (self.slab.base_of(n), self.slab.size_of(n), self.slab.state_of(n)))
			.collect()
	}

	/// Snapshot of the gap index's entries as `(size, base)`, in stored order.
	#[cfg(test)]
	pub(crate) fn debug_gap_entries(&self) -> Vec<(usize, usize)> {
		self.gaps.entries_snapshot()
	}
}
