use std::collections::HashMap;

use super::builder::{BuildReport, RuleGraph, build_graph};
use super::traversal::Traversal;
use super::types::{CatalogEntry, RuleId};

/// One immutable build of the catalog together with its traversal arena.
/// Closure caches live exactly as long as the snapshot.
pub struct GraphSnapshot {
	pub graph: RuleGraph,
	pub traversal: Traversal,
	pub report: BuildReport,
}

impl GraphSnapshot {
	pub fn build(catalog: &[CatalogEntry]) -> Self {
		let (graph, report) = build_graph(catalog);
		let traversal = Traversal::new(graph.nodes.iter().map(|n| n.id), graph.links.iter().copied());
		Self {
			graph,
			traversal,
			report,
		}
	}

	/// Maps ids of `self` to ids of `next` for rules present in both, by name.
	pub fn id_mapping(&self, next: &GraphSnapshot) -> HashMap<RuleId, RuleId> {
		let by_name: HashMap<&str, RuleId> = next.graph.nodes.iter().map(|n| (n.name.as_str(), n.id)).collect();
		self.graph
			.nodes
			.iter()
			.filter_map(|n| by_name.get(n.name.as_str()).map(|&id| (n.id, id)))
			.collect()
	}
}

impl Default for GraphSnapshot {
	fn default() -> Self {
		Self::build(&[])
	}
}
