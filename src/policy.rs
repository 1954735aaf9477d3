/// The strategy `PoolManager::allocate` uses to pick a gap for a new allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
	/// Take the earliest gap in address order that is large enough.
	FirstFit,
	/// Take the smallest gap that is large enough, breaking ties by lowest base address.
	BestFit,
}
