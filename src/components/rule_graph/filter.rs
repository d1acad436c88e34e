use std::collections::BTreeSet;

use super::builder::RuleGraph;
use super::traversal::Traversal;
use super::types::{RuleId, RuleLink, RuleNode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterParams {
	/// Substrings matched against `filepath`; any one matching is enough.
	pub category_filter: Vec<String>,
	pub search_term: String,
	pub show_draft_rules: bool,
}

impl Default for FilterParams {
	fn default() -> Self {
		Self {
			category_filter: Vec::new(),
			search_term: String::new(),
			show_draft_rules: true,
		}
	}
}

impl FilterParams {
	pub fn with_category(mut self, category: impl Into<String>) -> Self {
		self.category_filter.push(category.into());
		self
	}

	pub fn with_search(mut self, term: impl Into<String>) -> Self {
		self.search_term = term.into();
		self
	}

	pub fn with_drafts(mut self, show: bool) -> Self {
		self.show_draft_rules = show;
		self
	}

	fn category_terms(&self) -> Vec<String> {
		self.category_filter
			.iter()
			.map(|c| c.trim().to_lowercase())
			.filter(|c| !c.is_empty())
			.collect()
	}

	fn allows_draft(&self, node: &RuleNode) -> bool {
		self.show_draft_rules || node.is_published
	}
}

/// A single category string filters on that one term.
impl From<String> for FilterParams {
	fn from(category: String) -> Self {
		Self::default().with_category(category)
	}
}

impl From<&str> for FilterParams {
	fn from(category: &str) -> Self {
		Self::from(category.to_owned())
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterResult {
	/// Nodes that pass the category and draft rules; drawn.
	pub visible: BTreeSet<RuleId>,
	/// Visible nodes that also match the search term.
	pub search_matches: BTreeSet<RuleId>,
	/// Links whose endpoints are both visible.
	pub links: Vec<RuleLink>,
	/// Whether a non-blank search term is in effect.
	pub search_active: bool,
}

impl FilterResult {
	pub fn is_visible(&self, id: RuleId) -> bool {
		self.visible.contains(&id)
	}

	pub fn is_search_match(&self, id: RuleId) -> bool {
		self.search_matches.contains(&id)
	}
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
	haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

pub fn matches_search(node: &RuleNode, term: &str) -> bool {
	let term = term.trim().to_lowercase();
	term.is_empty()
		|| contains_ci(Some(&node.name), &term)
		|| contains_ci(node.label.as_deref(), &term)
		|| contains_ci(node.filepath.as_deref(), &term)
}

/// Computes the visible subset. `traversal` must be built over the full
/// `graph` so category context reaches through hidden neighbours.
pub fn apply_filter(graph: &RuleGraph, traversal: &Traversal, params: &FilterParams) -> FilterResult {
	let terms = params.category_terms();
	let mut visible = BTreeSet::new();

	if terms.is_empty() {
		visible.extend(graph.nodes.iter().filter(|n| params.allows_draft(n)).map(|n| n.id));
	} else {
		for node in &graph.nodes {
			let direct = terms
				.iter()
				.any(|term| contains_ci(node.filepath.as_deref(), term));
			if !direct {
				continue;
			}
			if params.allows_draft(node) {
				visible.insert(node.id);
			}
			let context = traversal
				.ancestors(node.id)
				.iter()
				.chain(traversal.descendants(node.id).iter())
				.copied()
				.collect::<Vec<_>>();
			for id in context {
				if graph.node(id).is_some_and(|n| params.allows_draft(n)) {
					visible.insert(id);
				}
			}
		}
	}

	let search_matches = visible
		.iter()
		.copied()
		.filter(|&id| graph.node(id).is_some_and(|n| matches_search(n, &params.search_term)))
		.collect();

	let links = graph
		.links
		.iter()
		.filter(|l| visible.contains(&l.source) && visible.contains(&l.target))
		.copied()
		.collect();

	FilterResult {
		visible,
		search_matches,
		links,
		search_active: !params.search_term.trim().is_empty(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::rule_graph::builder::build_graph;
	use crate::components::rule_graph::types::CatalogEntry;

	fn snapshot(catalog: &[CatalogEntry]) -> (RuleGraph, Traversal) {
		let (graph, _) = build_graph(catalog);
		let traversal = Traversal::new(graph.nodes.iter().map(|n| n.id), graph.links.iter().copied());
		(graph, traversal)
	}

	fn names(graph: &RuleGraph, ids: &BTreeSet<RuleId>) -> Vec<String> {
		ids.iter().filter_map(|&id| graph.node(id)).map(|n| n.name.clone()).collect()
	}

	fn finance_catalog() -> Vec<CatalogEntry> {
		vec![
			CatalogEntry::new("parent")
				.with_filepath("rules/ops/parent.yaml")
				.with_children(["invoice"])
				.published(false),
			CatalogEntry::new("invoice")
				.with_filepath("rules/Finance/invoice.yaml")
				.with_children(["tax"]),
			CatalogEntry::new("tax").with_filepath("rules/shared/tax.yaml"),
			CatalogEntry::new("unrelated").with_filepath("rules/hr/leave.yaml"),
		]
	}

	#[test]
	fn draft_parent_of_category_match_is_hidden() {
		let (graph, traversal) = snapshot(&finance_catalog());
		let params = FilterParams::default().with_category("finance").with_drafts(false);
		let result = apply_filter(&graph, &traversal, &params);

		assert_eq!(names(&graph, &result.visible), vec!["invoice", "tax"]);
		assert_eq!(result.links, vec![RuleLink::new(1, 2)]);
	}

	#[test]
	fn category_context_includes_drafts_when_shown() {
		let (graph, traversal) = snapshot(&finance_catalog());
		let params = FilterParams::default().with_category("FINANCE");
		let result = apply_filter(&graph, &traversal, &params);

		assert_eq!(names(&graph, &result.visible), vec!["parent", "invoice", "tax"]);
	}

	#[test]
	fn single_category_string_is_a_one_item_filter() {
		let params = FilterParams::from("finance");
		assert_eq!(params.category_filter, vec!["finance".to_string()]);
		assert!(params.show_draft_rules);

		let (graph, traversal) = snapshot(&finance_catalog());
		let result = apply_filter(&graph, &traversal, &FilterParams::from(String::from("hr")));
		assert_eq!(names(&graph, &result.visible), vec!["unrelated"]);
	}

	#[test]
	fn multiple_categories_use_or_semantics() {
		let (graph, traversal) = snapshot(&finance_catalog());
		let params = FilterParams::default().with_category("hr/").with_category("ops");
		let result = apply_filter(&graph, &traversal, &params);

		assert_eq!(
			names(&graph, &result.visible),
			vec!["parent", "invoice", "tax", "unrelated"]
		);
	}

	#[test]
	fn blank_category_terms_match_everything() {
		let (graph, traversal) = snapshot(&finance_catalog());
		let params = FilterParams::default().with_category("  ");
		assert_eq!(apply_filter(&graph, &traversal, &params).visible.len(), 4);
	}

	#[test]
	fn search_misses_stay_visible_but_unmatched() {
		let (graph, traversal) = snapshot(&finance_catalog());
		let params = FilterParams::default().with_search("TAX").with_drafts(false);
		let result = apply_filter(&graph, &traversal, &params);

		assert_eq!(names(&graph, &result.visible), vec!["invoice", "tax", "unrelated"]);
		assert_eq!(names(&graph, &result.search_matches), vec!["tax"]);
		assert!(result.search_active);
	}

	#[test]
	fn search_checks_label_and_filepath() {
		let catalog = vec![
			CatalogEntry::new("r1").with_label("Late Payment Fee"),
			CatalogEntry::new("r2").with_filepath("billing/payment.yaml"),
			CatalogEntry::new("r3"),
		];
		let (graph, traversal) = snapshot(&catalog);
		let result = apply_filter(&graph, &traversal, &FilterParams::default().with_search("payment"));
		assert_eq!(names(&graph, &result.search_matches), vec!["r1", "r2"]);
	}

	#[test]
	fn empty_search_matches_all_visible_nodes() {
		let (graph, traversal) = snapshot(&finance_catalog());
		let result = apply_filter(&graph, &traversal, &FilterParams::default());
		assert_eq!(result.search_matches, result.visible);
		assert!(!result.search_active);
	}

	#[test]
	fn filtering_is_deterministic() {
		let (graph, traversal) = snapshot(&finance_catalog());
		let params = FilterParams::default().with_category("finance").with_search("in");
		let first = apply_filter(&graph, &traversal, &params);
		let second = apply_filter(&graph, &traversal, &params);
		assert_eq!(first, second);
	}
}
