//! The top-level pool registry: a trivial grow-only table of open `PoolManager` handles.
//!
//! Declared out of scope for the pool-manager core proper (`SPEC_FULL.md` section 1), but
//! implemented here in its simplest form so the crate is usable end to end through the
//! `init`/`shutdown`/`open`/`close` operations of section 6. Slots are nulled in place on close
//! and never reused or compacted, so a `PoolHandle` from a closed pool always reports
//! `UnknownHandle` rather than silently resolving to an unrelated, later pool (`SPEC_FULL.md`
//! section 9, "process-wide registry").

use log::debug;

use crate::error::PoolError;
use crate::manager::{AllocHandle, PoolManager, PoolStats};
use crate::policy::Policy;
use crate::slab::NodeState;

/// A stable handle to a pool held by a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle(usize);

/// Process-wide, single-threaded collection of open pools.
///
/// Mirrors the source's grow-only array of pool-manager handles: `close` nulls a slot rather than
/// removing it, so indices remain stable and `shutdown` can simply check that every slot is
/// empty.
pub struct Registry {
	initialized: bool,
	pools: Vec<Option<PoolManager>>,
}

impl Registry {
	pub const fn new() -> Self {
		Self {
			initialized: false,
			pools: Vec::new(),
		}
	}

	pub fn init(&mut self) -> Result<(), PoolError> {
		if self.initialized {
			return Err(PoolError::AlreadyInitialized);
		}
		self.initialized = true;
		debug!("registry initialized");
		Ok(())
	}

	pub fn shutdown(&mut self) -> Result<(), PoolError> {
		if !self.initialized {
			return Err(PoolError::NotInitialized);
		}
		if self.pools.iter().any(Option::is_some) {
			return Err(PoolError::LiveManagers);
		}
		self.initialized = false;
		self.pools.clear();
		debug!("registry shut down");
		Ok(())
	}

	pub fn open(&mut self, size: usize, policy: Policy) -> Result<PoolHandle, PoolError> {
		if !self.initialized {
			return Err(PoolError::NotInitialized);
		}
		let pool = PoolManager::open(size, policy)?;

		// Grow-only: a new pool always gets a fresh slot, even if earlier slots were nulled by
		// `close`. This keeps closed handles permanently invalid instead of letting them resolve
		// to whatever later pool happens to reuse their index.
		self.pools.push(Some(pool));
		Ok(PoolHandle(self.pools.len() - 1))
	}

	pub fn close(&mut self, handle: PoolHandle) -> Result<(), PoolError> {
		let slot = self
			.pools
			.get_mut(handle.0)
			.ok_or(PoolError::UnknownHandle)?;
		let pool = slot.as_ref().ok_or(PoolError::UnknownHandle)?;
		if !pool.is_empty() {
			return Err(PoolError::NotEmpty);
		}
		// Checked above, so the consuming close() below cannot fail; the slot is nulled either
		// way, keeping the handle permanently invalid afterwards.
		slot.take()
			.expect("checked Some above")
			.close()
			.expect("is_empty checked above");
		Ok(())
	}

	fn get_mut(&mut self, handle: PoolHandle) -> Result<&mut PoolManager, PoolError> {
		self.pools
			.get_mut(handle.0)
			.and_then(Option::as_mut)
			.ok_or(PoolError::UnknownHandle)
	}

	fn get(&self, handle: PoolHandle) -> Result<&PoolManager, PoolError> {
		self.pools
			.get(handle.0)
			.and_then(Option::as_ref)
			.ok_or(PoolError::UnknownHandle)
	}

	pub fn allocate(&mut self, handle: PoolHandle, size: usize) -> Result<AllocHandle, PoolError> {
		self.get_mut(handle)?.allocate(size)
	}

	pub fn deallocate(&mut self, handle: PoolHandle, alloc: AllocHandle) -> Result<(), PoolError> {
		self.get_mut(handle)?.deallocate(alloc)
	}

	pub fn inspect(&self, handle: PoolHandle) -> Result<Vec<(usize, NodeState)>, PoolError> {
		Ok(self.get(handle)?.inspect())
	}

	pub fn stats(&self, handle: PoolHandle) -> Result<PoolStats, PoolError> {
		Ok(self.get(handle)?.stats())
	}
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}
