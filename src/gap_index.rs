//! Size-ordered directory of gap nodes, used for best-fit lookup.

use log::trace;

use crate::error::PoolError;
use crate::slab::NodeRef;

#[derive(Debug, Clone, Copy)]
struct GapEntry {
	size: usize,
	base: usize,
	node: NodeRef,
}

pub struct GapIndex {
	entries: Vec<GapEntry>,
	capacity: usize,
}

impl GapIndex {
	pub const INITIAL_CAPACITY: usize = 40;
	pub const FILL_FACTOR_THRESHOLD: f64 = 0.75;

	pub(crate) fn new() -> Self {
		Self {
			entries: Vec::with_capacity(Self::INITIAL_CAPACITY),
			capacity: Self::INITIAL_CAPACITY,
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}

	fn occupancy(&self) -> f64 {
		self.entries.len() as f64 / self.capacity as f64
	}

	/// Grow the index if its fill factor already exceeds 0.75, so a subsequent `insert` is
	/// guaranteed not to need its own growth (and therefore cannot fail). Callers that must pair
	/// a removal/merge with a later insert call this first, before mutating anything, so a
	/// `HostOutOfMemory` here leaves the prior structure untouched.
	pub(crate) fn reserve_for_insert(&mut self) -> Result<(), PoolError> {
		self.reserve_capacity()
	}

	fn reserve_capacity(&mut self) -> Result<(), PoolError> {
		if self.occupancy() > Self::FILL_FACTOR_THRESHOLD {
			let new_capacity = self.capacity.checked_mul(2).ok_or(PoolError::HostOutOfMemory)?;
			self.entries
				.try_reserve(new_capacity - self.capacity)
				.map_err(|_| PoolError::HostOutOfMemory)?;
			trace!("gap index grew {} -> {new_capacity}", self.capacity);
			self.capacity = new_capacity;
		}
		Ok(())
	}

	/// Insert a `(size, node)` entry, keeping the array sorted ascending by `(size, base)`.
	pub(crate) fn insert(&mut self, size: usize, base: usize, node: NodeRef) -> Result<(), PoolError> {
		self.reserve_capacity()?;

		self.entries.push(GapEntry { size, base, node });
		let mut i = self.entries.len() - 1;
		while i > 0 && Self::key_of(&self.entries[i]) < Self::key_of(&self.entries[i - 1]) {
			self.entries.swap(i, i - 1);
			i -= 1;
		}
		Ok(())
	}

	fn key_of(entry: &GapEntry) -> (usize, usize) {
		(entry.size, entry.base)
	}

	/// Remove the entry referencing `node`. Fails with `NotFoundInIndex` if no such entry exists
	/// — that indicates the gap index and the address list have drifted apart.
	pub(crate) fn remove(&mut self, node: NodeRef) -> Result<(), PoolError> {
		let pos = self
			.entries
			.iter()
			.position(|e| e.node == node)
			.ok_or(PoolError::NotFoundInIndex)?;
		self.entries.remove(pos);
		Ok(())
	}

	/// Smallest gap with `size >= request`, breaking ties by lowest base address. `None` if no
	/// gap is large enough.
	pub(crate) fn find_best_fit(&self, request: usize) -> Option<NodeRef> {
		self.entries
			.iter()
			.find(|e| e.size >= request)
			.map(|e| e.node)
	}

	/// Snapshot of every entry as `(size, base)`, in stored order. Exposed only so property tests
	/// can cross-check the index's membership and ordering against the live address list.
	#[cfg(test)]
	pub(crate) fn entries_snapshot(&self) -> Vec<(usize, usize)> {
		self.entries.iter().map(|e| (e.size, e.base)).collect()
	}

	#[cfg(test)]
	fn is_sorted(&self) -> bool {
		self.entries.windows(2).all(|w| Self::key_of(&w[0]) < Self::key_of(&w[1]))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insert_keeps_ascending_order() {
		let mut idx = GapIndex::new();
		idx.insert(50, 0, 0).unwrap();
		idx.insert(10, 10, 1).unwrap();
		idx.insert(10, 5, 2).unwrap();
		idx.insert(30, 20, 3).unwrap();
		assert!(idx.is_sorted());
		// (10, 5) sorts before (10, 10): equal size, lower base wins.
		assert_eq!(idx.entries[0].node, 2);
		assert_eq!(idx.entries[1].node, 1);
	}

	#[test]
	fn remove_missing_node_is_an_error() {
		let mut idx = GapIndex::new();
		idx.insert(10, 0, 0).unwrap();
		assert_eq!(idx.remove(99), Err(PoolError::NotFoundInIndex));
	}

	#[test]
	fn find_best_fit_returns_smallest_adequate_gap() {
		let mut idx = GapIndex::new();
		idx.insert(10, 30, 0).unwrap();
		idx.insert(10, 10, 1).unwrap();
		idx.insert(30, 0, 2).unwrap();
		// Lowest base among the two equal-size (10) gaps wins.
		assert_eq!(idx.find_best_fit(10), Some(1));
		assert_eq!(idx.find_best_fit(11), Some(2));
		assert_eq!(idx.find_best_fit(31), None);
	}
}
