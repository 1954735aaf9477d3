//! A suballocator library: open a fixed-size backing buffer under an allocation policy, then
//! repeatedly carve byte ranges out of it with `allocate` and hand them back with `deallocate`.
//!
//! The pool manager (`manager` module) tracks the buffer's contents as an address-ordered list of
//! allocation/gap segments threaded through a stable-index node slab (`slab` module), plus a
//! size-ordered gap index (`gap_index` module) for best-fit lookups. `registry` is the
//! process-wide, grow-only table of open pools; most callers only need `PoolManager` directly.
//!
//! This crate does not provide thread-safety, cross-pool coalescing, compaction, alignment beyond
//! byte granularity, or returning memory to the host allocator.

mod error;
mod gap_index;
mod manager;
mod policy;
#[cfg(test)]
mod proptests;
mod registry;
mod slab;

pub use error::PoolError;
pub use manager::{AllocHandle, PoolConfig, PoolManager, PoolStats};
pub use policy::Policy;
pub use registry::{PoolHandle, Registry};
pub use slab::NodeState;
