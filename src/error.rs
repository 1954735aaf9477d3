use thiserror::Error;

/// Everything that can go wrong talking to the registry or a single pool.
///
/// Every public operation in this crate returns `Result<_, PoolError>`; there are no panics on a
/// caller-triggerable condition. `NotFoundInIndex` is the exception: it only surfaces if the gap
/// index and the address list have drifted apart, which is a bug in this crate rather than
/// caller misuse, and callers should treat it as fatal.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum PoolError {
	/// `Registry::init` was called a second time without an intervening `shutdown`.
	#[error("registry already initialized")]
	AlreadyInitialized,
	/// A registry operation other than `init` was called before `init`.
	#[error("registry not initialized")]
	NotInitialized,
	/// `shutdown` was called while one or more pools are still open.
	#[error("shutdown refused: pools are still open")]
	LiveManagers,
	/// `open` or `allocate` was asked for a zero-sized region.
	#[error("requested size must be greater than zero")]
	InvalidSize,
	/// `allocate` was called on a pool with no gap nodes at all.
	#[error("pool has no free gaps")]
	NoGaps,
	/// `allocate` found gaps, but none large enough (or, under `BestFit`, none at all satisfying
	/// the policy) for the request.
	#[error("no gap satisfies the requested size")]
	NoFit,
	/// `close` was called while the pool has live allocations or more than one gap.
	#[error("pool is not empty")]
	NotEmpty,
	/// The host allocator could not satisfy a growth request.
	#[error("host allocator is out of memory")]
	HostOutOfMemory,
	/// A gap node had no matching entry in the gap index. This is an internal consistency
	/// violation, not a caller error.
	#[error("gap index inconsistency: no entry for a live gap node")]
	NotFoundInIndex,
	/// A pool or allocation handle did not resolve to anything live.
	#[error("handle does not refer to a live pool or allocation")]
	UnknownHandle,
}
