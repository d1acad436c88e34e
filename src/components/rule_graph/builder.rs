//! Catalog to graph transform.
//!
//! Names are the stable keys of the catalog: the first entry carrying a name
//! owns it and gets the next dense id. References are resolved afterwards, so
//! an entry may point at a rule that appears later in the catalog.

use std::collections::{BTreeSet, HashMap};

use super::types::{CatalogEntry, RuleId, RuleLink, RuleNode};

pub const BASE_RADIUS: f64 = 6.0;
pub const MAX_RADIUS: f64 = 16.0;

/// Deduplicated node/link model of one catalog.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleGraph {
	/// Sorted ascending by id; ids are dense so `nodes[id]` is the node.
	pub nodes: Vec<RuleNode>,
	/// Sorted by `(source, target)`, no duplicates.
	pub links: Vec<RuleLink>,
}

impl RuleGraph {
	pub fn node(&self, id: RuleId) -> Option<&RuleNode> {
		self.nodes.get(id as usize).filter(|n| n.id == id)
	}

	pub fn id_of(&self, name: &str) -> Option<RuleId> {
		self.nodes.iter().find(|n| n.name == name).map(|n| n.id)
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

/// What the builder dropped. Callers decide whether to log it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
	pub unnamed_entries: usize,
	pub duplicate_names: Vec<String>,
	pub dangling_refs: Vec<String>,
}

impl BuildReport {
	pub fn is_clean(&self) -> bool {
		self.unnamed_entries == 0 && self.duplicate_names.is_empty() && self.dangling_refs.is_empty()
	}
}

/// Names compare exactly; only blank ones are rejected.
fn clean_name(name: Option<&String>) -> Option<&str> {
	name.map(String::as_str).filter(|n| !n.trim().is_empty())
}

pub fn build_graph(catalog: &[CatalogEntry]) -> (RuleGraph, BuildReport) {
	let mut report = BuildReport::default();
	let mut ids: HashMap<&str, RuleId> = HashMap::new();
	let mut owners: Vec<&CatalogEntry> = Vec::new();

	for entry in catalog {
		let Some(name) = clean_name(entry.name.as_ref()) else {
			report.unnamed_entries += 1;
			continue;
		};
		if ids.contains_key(name) {
			report.duplicate_names.push(name.to_owned());
			continue;
		}
		ids.insert(name, owners.len() as RuleId);
		owners.push(entry);
	}

	let mut links = BTreeSet::new();
	for (idx, entry) in owners.iter().enumerate() {
		let id = idx as RuleId;
		for child in &entry.child_rules {
			match clean_name(child.name.as_ref()).and_then(|n| ids.get(n)) {
				Some(&target) => {
					links.insert(RuleLink::new(id, target));
				}
				None => report.dangling_refs.push(ref_label(child.name.as_deref())),
			}
		}
		for parent in &entry.parent_rules {
			match clean_name(parent.name.as_ref()).and_then(|n| ids.get(n)) {
				Some(&source) => {
					links.insert(RuleLink::new(source, id));
				}
				None => report.dangling_refs.push(ref_label(parent.name.as_deref())),
			}
		}
	}

	let mut degree = vec![0usize; owners.len()];
	for link in &links {
		degree[link.source as usize] += 1;
		degree[link.target as usize] += 1;
	}

	let nodes = owners
		.iter()
		.enumerate()
		.map(|(idx, entry)| RuleNode {
			id: idx as RuleId,
			name: clean_name(entry.name.as_ref()).unwrap_or_default().to_owned(),
			label: entry.label.clone(),
			filepath: entry.filepath.clone(),
			description: entry.description.clone(),
			url: entry.url.clone().filter(|u| !u.trim().is_empty()),
			is_published: entry.is_published.unwrap_or(true),
			review_branch: entry.review_branch.clone(),
			radius: (BASE_RADIUS + 2.0 * (degree[idx] as f64).sqrt()).min(MAX_RADIUS),
		})
		.collect();

	let graph = RuleGraph {
		nodes,
		links: links.into_iter().collect(),
	};
	(graph, report)
}

fn ref_label(name: Option<&str>) -> String {
	name.unwrap_or("<unnamed>").to_owned()
}
