//! Stable-index node storage and the address-ordered list threaded through it.
//!
//! Spec components 4.1 (node slab) and 4.2 (address-ordered list) are implemented as a single
//! type here rather than two collaborating objects: the link pointers and the free-slot list are
//! fields of the same storage, and every mutation that touches one touches the other. See
//! `SPEC_FULL.md` section 4.2.

use log::trace;

use crate::error::PoolError;

/// Index into [`NodeSlab::nodes`]. Stable for the lifetime of the node it identifies, even across
/// slab growth, since growth only appends to the backing `Vec` and never relocates by value in a
/// way that changes what index `i` refers to.
pub type NodeRef = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
	/// Not linked into the address list; available for [`NodeSlab::acquire`].
	Vacant,
	Gap,
	Allocated,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Node {
	pub base: usize,
	pub size: usize,
	pub state: NodeState,
	pub prev: Option<NodeRef>,
	/// Doubles as the next-free-slot link while `state == Vacant`.
	pub next: Option<NodeRef>,
}

impl Node {
	const fn vacant(next_free: Option<NodeRef>) -> Self {
		Self {
			base: 0,
			size: 0,
			state: NodeState::Vacant,
			prev: None,
			next: next_free,
		}
	}
}

pub struct NodeSlab {
	nodes: Vec<Node>,
	free_head: Option<NodeRef>,
	in_use: usize,
	head: Option<NodeRef>,
	tail: Option<NodeRef>,
}

impl NodeSlab {
	pub const INITIAL_CAPACITY: usize = 40;
	pub const FILL_FACTOR_THRESHOLD: f64 = 0.75;

	/// Build a slab whose address list initially contains a single gap node covering
	/// `[0, total_size)`.
	pub(crate) fn new(total_size: usize) -> Result<Self, PoolError> {
		let mut slab = Self {
			nodes: Vec::new(),
			free_head: None,
			in_use: 0,
			head: None,
			tail: None,
		};
		slab.grow_to(Self::INITIAL_CAPACITY)?;

		let root = slab.acquire()?;
		slab.nodes[root] = Node {
			base: 0,
			size: total_size,
			state: NodeState::Gap,
			prev: None,
			next: None,
		};
		slab.head = Some(root);
		slab.tail = Some(root);
		Ok(slab)
	}

	pub(crate) fn head(&self) -> Option<NodeRef> {
		self.head
	}

	pub(crate) fn next_of(&self, node: NodeRef) -> Option<NodeRef> {
		self.nodes[node].next
	}

	pub(crate) fn prev_of(&self, node: NodeRef) -> Option<NodeRef> {
		self.nodes[node].prev
	}

	pub(crate) fn state_of(&self, node: NodeRef) -> NodeState {
		self.nodes[node].state
	}

	pub(crate) fn size_of(&self, node: NodeRef) -> usize {
		self.nodes[node].size
	}

	pub(crate) fn base_of(&self, node: NodeRef) -> usize {
		self.nodes[node].base
	}

	/// Iterate nodes in address order, starting at the head of the list.
	pub(crate) fn iter(&self) -> NodeIter<'_> {
		NodeIter {
			slab: self,
			current: self.head,
		}
	}

	fn occupancy(&self) -> f64 {
		if self.nodes.is_empty() {
			return 1.0;
		}
		self.in_use as f64 / self.nodes.len() as f64
	}

	fn grow_to(&mut self, new_capacity: usize) -> Result<(), PoolError> {
		let old_capacity = self.nodes.len();
		if new_capacity <= old_capacity {
			return Ok(());
		}
		self.nodes
			.try_reserve(new_capacity - old_capacity)
			.map_err(|_| PoolError::HostOutOfMemory)?;
		for _ in old_capacity..new_capacity {
			let idx = self.nodes.len();
			self.nodes.push(Node::vacant(self.free_head));
			self.free_head = Some(idx);
		}
		trace!("node slab grew {old_capacity} -> {new_capacity}");
		Ok(())
	}

	fn grow(&mut self) -> Result<(), PoolError> {
		let old_capacity = self.nodes.len();
		let new_capacity = old_capacity
			.checked_mul(2)
			.ok_or(PoolError::HostOutOfMemory)?;
		self.grow_to(new_capacity)
	}

	/// Double the slab first if occupancy already exceeds the fill-factor threshold.
	pub(crate) fn reserve_slot(&mut self) -> Result<(), PoolError> {
		if self.occupancy() > Self::FILL_FACTOR_THRESHOLD {
			self.grow()?;
		}
		Ok(())
	}

	/// Return a vacant slot, growing the slab first if needed. Does not link the slot into the
	/// address list or set its fields; callers (`new`, `split`) do that themselves.
	pub(crate) fn acquire(&mut self) -> Result<NodeRef, PoolError> {
		self.reserve_slot()?;
		let slot = self
			.free_head
			.expect("reserve_slot guarantees a vacant slot exists");
		self.free_head = self.nodes[slot].next;
		self.nodes[slot].next = None;
		self.in_use += 1;
		Ok(slot)
	}

	/// Transition a node to `Vacant`, clear its fields, and unlink it from the address list.
	pub(crate) fn release(&mut self, node: NodeRef) {
		let prev = self.nodes[node].prev;
		let next = self.nodes[node].next;
		match prev {
			Some(p) => self.nodes[p].next = next,
			None => self.head = next,
		}
		match next {
			Some(n) => self.nodes[n].prev = prev,
			None => self.tail = prev,
		}

		self.nodes[node] = Node::vacant(self.free_head);
		self.free_head = Some(node);
		self.in_use -= 1;
	}

	/// Split `node` (which must be a `Gap` with `size > prefix_size`) into a `prefix_size`-byte
	/// prefix that keeps `node`'s identity, and a newly acquired `Gap` node covering the
	/// remainder, linked immediately after `node`. Returns the new node's reference.
	pub(crate) fn split(&mut self, node: NodeRef, prefix_size: usize) -> Result<NodeRef, PoolError> {
		debug_assert_eq!(self.nodes[node].state, NodeState::Gap);
		let old_size = self.nodes[node].size;
		debug_assert!(old_size > prefix_size);

		let base = self.nodes[node].base;
		let old_next = self.nodes[node].next;

		let remainder = self.acquire()?;
		self.nodes[node].size = prefix_size;
		self.nodes[remainder] = Node {
			base: base + prefix_size,
			size: old_size - prefix_size,
			state: NodeState::Gap,
			prev: Some(node),
			next: old_next,
		};

		match old_next {
			Some(n) => self.nodes[n].prev = Some(remainder),
			None => self.tail = Some(remainder),
		}
		self.nodes[node].next = Some(remainder);

		Ok(remainder)
	}

	pub(crate) fn set_state(&mut self, node: NodeRef, state: NodeState) {
		self.nodes[node].state = state;
	}

	/// Grow `node`'s size and release its forward neighbor `merged`, which must be the
	/// node immediately after `node` on the list. Used by forward coalescing.
	pub(crate) fn absorb_next(&mut self, node: NodeRef, merged: NodeRef) {
		debug_assert_eq!(self.nodes[node].next, Some(merged));
		self.nodes[node].size += self.nodes[merged].size;
		self.release(merged);
	}
}

pub(crate) struct NodeIter<'a> {
	slab: &'a NodeSlab,
	current: Option<NodeRef>,
}

impl<'a> Iterator for NodeIter<'a> {
	type Item = NodeRef;

	fn next(&mut self) -> Option<Self::Item> {
		let node = self.current?;
		self.current = self.slab.next_of(node);
		Some(node)
	}
}
