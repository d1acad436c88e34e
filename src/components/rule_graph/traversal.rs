//! Ancestor/descendant closures over a directed rule graph.
//!
//! The graph is flattened into an arena of indexed records with forward and
//! backward adjacency lists. Each walk is an explicit depth-first loop over
//! that arena with its own visited bitset, so cycles terminate and stack
//! depth stays constant regardless of graph shape.
//!
//! A start node belongs to its own closure only when it can be reached from
//! itself through at least one edge in the walked direction, i.e. when it
//! sits on a directed cycle or carries a self-link.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use super::types::{RuleId, RuleLink};

pub type ClosureSet = BTreeSet<RuleId>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
	/// Follow edges backward, toward rules that reference this one.
	Ancestors,
	/// Follow edges forward, toward rules this one references.
	Descendants,
}

impl Direction {
	/// The endpoint a link leads to when walked in this direction.
	pub fn next(self, link: &RuleLink) -> RuleId {
		match self {
			Direction::Ancestors => link.source,
			Direction::Descendants => link.target,
		}
	}

	/// The endpoint a link is walked from in this direction.
	pub fn from(self, link: &RuleLink) -> RuleId {
		match self {
			Direction::Ancestors => link.target,
			Direction::Descendants => link.source,
		}
	}
}

struct VisitedSet {
	words: Vec<u64>,
}

impl VisitedSet {
	fn new(len: usize) -> Self {
		Self {
			words: vec![0; len.div_ceil(64)],
		}
	}

	/// Marks `idx`, returning false if it was already marked.
	fn insert(&mut self, idx: usize) -> bool {
		let (word, bit) = (idx / 64, 1u64 << (idx % 64));
		let fresh = self.words[word] & bit == 0;
		self.words[word] |= bit;
		fresh
	}
}

pub struct Traversal {
	ids: Vec<RuleId>,
	index: HashMap<RuleId, usize>,
	forward: Vec<Vec<usize>>,
	backward: Vec<Vec<usize>>,
	links: Vec<RuleLink>,
	cache: RefCell<HashMap<(RuleId, Direction), Rc<ClosureSet>>>,
}

impl Traversal {
	/// Builds the arena. Links with an endpoint outside `node_ids` are
	/// ignored, they are never walked.
	pub fn new(
		node_ids: impl IntoIterator<Item = RuleId>,
		links: impl IntoIterator<Item = RuleLink>,
	) -> Self {
		let mut ids: Vec<RuleId> = node_ids.into_iter().collect();
		ids.sort_unstable();
		ids.dedup();
		let index: HashMap<RuleId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

		let mut forward = vec![Vec::new(); ids.len()];
		let mut backward = vec![Vec::new(); ids.len()];
		let mut kept: Vec<RuleLink> = Vec::new();
		for link in links {
			let (Some(&src), Some(&tgt)) = (index.get(&link.source), index.get(&link.target)) else {
				continue;
			};
			forward[src].push(tgt);
			backward[tgt].push(src);
			kept.push(link);
		}
		for adj in forward.iter_mut().chain(backward.iter_mut()) {
			adj.sort_unstable();
			adj.dedup();
		}
		kept.sort_unstable();
		kept.dedup();

		Self {
			ids,
			index,
			forward,
			backward,
			links: kept,
			cache: RefCell::new(HashMap::new()),
		}
	}

	pub fn empty() -> Self {
		Self::new(std::iter::empty(), std::iter::empty())
	}

	pub fn contains(&self, id: RuleId) -> bool {
		self.index.contains_key(&id)
	}

	pub fn node_count(&self) -> usize {
		self.ids.len()
	}

	pub fn links(&self) -> &[RuleLink] {
		&self.links
	}

	/// Cached closure of `id`; unknown ids yield an empty set.
	pub fn closure(&self, id: RuleId, direction: Direction) -> Rc<ClosureSet> {
		if let Some(hit) = self.cache.borrow().get(&(id, direction)) {
			return hit.clone();
		}
		let set = Rc::new(self.walk(id, direction));
		self.cache.borrow_mut().insert((id, direction), set.clone());
		set
	}

	pub fn ancestors(&self, id: RuleId) -> Rc<ClosureSet> {
		self.closure(id, Direction::Ancestors)
	}

	pub fn descendants(&self, id: RuleId) -> Rc<ClosureSet> {
		self.closure(id, Direction::Descendants)
	}

	fn walk(&self, id: RuleId, direction: Direction) -> ClosureSet {
		let Some(&start) = self.index.get(&id) else {
			return ClosureSet::new();
		};
		let adjacency = match direction {
			Direction::Ancestors => &self.backward,
			Direction::Descendants => &self.forward,
		};

		let mut visited = VisitedSet::new(self.ids.len());
		let mut out = ClosureSet::new();
		// The start is not pre-marked: reaching it again means it is on a cycle.
		let mut stack: Vec<usize> = adjacency[start].iter().rev().copied().collect();
		while let Some(idx) = stack.pop() {
			if !visited.insert(idx) {
				continue;
			}
			out.insert(self.ids[idx]);
			stack.extend(adjacency[idx].iter().rev().copied());
		}
		out
	}

	/// Links highlighted together with the closure of `id`.
	pub fn induced_links(&self, id: RuleId, direction: Direction) -> BTreeSet<RuleLink> {
		if !self.contains(id) {
			return BTreeSet::new();
		}
		let closure = self.closure(id, direction);
		self.links
			.iter()
			.filter(|link| {
				let both_inside = closure.contains(&link.source) && closure.contains(&link.target);
				let leaves_start = direction.from(link) == id;
				let next_inside = closure.contains(&direction.next(link)) && link.touches(id);
				both_inside || leaves_start || next_inside
			})
			.copied()
			.collect()
	}

	/// Drops memoized closures; the arena itself is immutable.
	pub fn clear_cache(&self) {
		self.cache.borrow_mut().clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn graph(n: u32, edges: &[(u32, u32)]) -> Traversal {
		Traversal::new(0..n, edges.iter().map(|&(s, t)| RuleLink::new(s, t)))
	}

	fn set(ids: &[u32]) -> ClosureSet {
		ids.iter().copied().collect()
	}

	#[test]
	fn chain_closures() {
		// a -> b -> c
		let t = graph(3, &[(0, 1), (1, 2)]);
		assert_eq!(*t.descendants(0), set(&[1, 2]));
		assert_eq!(*t.ancestors(2), set(&[0, 1]));
		assert_eq!(*t.descendants(2), set(&[]));
		assert_eq!(*t.ancestors(0), set(&[]));
	}

	#[test]
	fn three_cycle_includes_start() {
		// a -> b -> c -> a
		let t = graph(3, &[(0, 1), (1, 2), (2, 0)]);
		assert_eq!(*t.ancestors(0), set(&[0, 1, 2]));
		assert_eq!(*t.descendants(1), set(&[0, 1, 2]));
	}

	#[test]
	fn start_outside_cycle_is_excluded() {
		// a -> b <-> c
		let t = graph(3, &[(0, 1), (1, 2), (2, 1)]);
		assert_eq!(*t.descendants(0), set(&[1, 2]));
		assert_eq!(*t.descendants(1), set(&[1, 2]));
	}

	#[test]
	fn self_link_is_a_cycle() {
		let t = graph(2, &[(0, 0), (0, 1)]);
		assert_eq!(*t.descendants(0), set(&[0, 1]));
		assert_eq!(*t.ancestors(0), set(&[0]));
		assert_eq!(*t.ancestors(1), set(&[0]));
	}

	#[test]
	fn unknown_node_has_empty_closure() {
		let t = graph(2, &[(0, 1)]);
		assert!(t.descendants(99).is_empty());
		assert!(t.induced_links(99, Direction::Ancestors).is_empty());
	}

	#[test]
	fn links_to_absent_nodes_are_never_walked() {
		let t = Traversal::new([0, 1], [RuleLink::new(0, 1), RuleLink::new(1, 7), RuleLink::new(7, 0)]);
		assert_eq!(*t.descendants(0), set(&[1]));
		assert_eq!(t.links(), &[RuleLink::new(0, 1)]);
	}

	#[test]
	fn closure_results_are_cached() {
		let t = graph(3, &[(0, 1), (1, 2)]);
		let first = t.descendants(0);
		let second = t.descendants(0);
		assert!(Rc::ptr_eq(&first, &second));
		t.clear_cache();
		assert!(!Rc::ptr_eq(&first, &t.descendants(0)));
	}

	#[test]
	fn induced_links_follow_the_walked_direction() {
		// a -> b -> c, d -> b
		let t = graph(4, &[(0, 1), (1, 2), (3, 1)]);
		let down: Vec<_> = t.induced_links(0, Direction::Descendants).into_iter().collect();
		assert_eq!(down, vec![RuleLink::new(0, 1), RuleLink::new(1, 2)]);

		let up: Vec<_> = t.induced_links(2, Direction::Ancestors).into_iter().collect();
		assert_eq!(
			up,
			vec![RuleLink::new(0, 1), RuleLink::new(1, 2), RuleLink::new(3, 1)]
		);

		// b's ancestors are a and d; the link out of b is not part of it.
		let up_b: Vec<_> = t.induced_links(1, Direction::Ancestors).into_iter().collect();
		assert_eq!(up_b, vec![RuleLink::new(0, 1), RuleLink::new(3, 1)]);
	}

	#[test]
	fn deep_chain_does_not_overflow() {
		let n = 100_000;
		let edges: Vec<_> = (0..n - 1).map(|i| RuleLink::new(i, i + 1)).collect();
		let t = Traversal::new(0..n, edges);
		assert_eq!(t.descendants(0).len(), (n - 1) as usize);
	}
}
