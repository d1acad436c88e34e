//! Per-frame style and visibility decisions handed to the render adapter.

use super::builder::RuleGraph;
use super::config::Palette;
use super::interaction::{Interaction, Role, ViewTransform};
use super::simulation::Simulation;
use super::traversal::Direction;
use super::types::RuleId;

pub const SEARCH_DIM: f64 = 0.25;
pub const UNRELATED_DIM: f64 = 0.15;
pub const LINK_OPACITY: f64 = 0.6;
pub const LINK_DIM: f64 = 0.1;
pub const LINK_WIDTH: f64 = 1.5;
pub const LINK_HIGHLIGHT_WIDTH: f64 = 2.5;
pub const LINK_THIN_WIDTH: f64 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct StyledNode {
	pub id: RuleId,
	pub x: f64,
	pub y: f64,
	pub radius: f64,
	pub fill: String,
	/// Search emphasis ring.
	pub stroke: Option<String>,
	pub opacity: f64,
	/// `None` when the label is suppressed at the current zoom.
	pub label: Option<String>,
	pub role: Option<Role>,
	pub emphasized: bool,
	pub focused: bool,
	pub hovered: bool,
	pub draft: bool,
}

impl StyledNode {
	/// Drawn in the second, foreground pass.
	pub fn is_foreground(&self) -> bool {
		self.emphasized
			|| self.focused
			|| self.hovered
			|| matches!(self.role, Some(Role::Selected | Role::Ancestor | Role::Descendant))
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct StyledLink {
	pub source: RuleId,
	pub target: RuleId,
	pub from: (f64, f64),
	pub to: (f64, f64),
	/// Radius of the target node, so arrows stop at its rim.
	pub target_radius: f64,
	pub source_radius: f64,
	pub color: String,
	pub width: f64,
	pub opacity: f64,
	pub direction: Option<Direction>,
	/// Either endpoint is a draft rule.
	pub dashed: bool,
}

/// Everything the render adapter needs for one redraw, in draw order.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
	pub background: String,
	pub transform: ViewTransform,
	pub focus_ring: String,
	pub label_color: String,
	pub links: Vec<StyledLink>,
	pub nodes: Vec<StyledNode>,
}

pub fn build_frame(graph: &RuleGraph, interaction: &Interaction, simulation: &Simulation, palette: &Palette) -> Frame {
	let filter = interaction.filter();
	let highlight = interaction.highlight();
	let transform = interaction.transform();
	let show_all_labels = transform.k >= interaction.view_config().label_min_scale;

	let nodes: Vec<StyledNode> = filter
		.visible
		.iter()
		.filter_map(|&id| {
			let node = graph.node(id)?;
			let (x, y) = simulation.position(id)?;
			let matched = filter.is_search_match(id);
			let emphasized = filter.search_active && matched;

			let mut fill = if node.is_published { &palette.node } else { &palette.draft_node };
			let mut opacity = if filter.search_active && !matched { SEARCH_DIM } else { 1.0 };
			let role = highlight.map(|h| h.role(id));
			match role {
				Some(Role::Selected) => (fill, opacity) = (&palette.selected, 1.0),
				Some(Role::Ancestor) => (fill, opacity) = (&palette.ancestor, 1.0),
				Some(Role::Descendant) => (fill, opacity) = (&palette.descendant, 1.0),
				Some(Role::Unrelated) => opacity = opacity.min(UNRELATED_DIM),
				None => {}
			}

			let focused = interaction.focused() == Some(id);
			let hovered = interaction.hovered() == Some(id);
			let related = matches!(role, Some(r) if r != Role::Unrelated);
			let label = (show_all_labels || emphasized || focused || hovered || related)
				.then(|| node.display_name().to_owned());

			Some(StyledNode {
				id,
				x,
				y,
				radius: node.radius,
				fill: fill.clone(),
				stroke: emphasized.then(|| palette.search_match.clone()),
				opacity,
				label,
				role,
				emphasized,
				focused,
				hovered,
				draft: !node.is_published,
			})
		})
		.collect();

	let links = filter
		.links
		.iter()
		.filter_map(|link| {
			let from = simulation.position(link.source)?;
			let to = simulation.position(link.target)?;
			let (source, target) = (graph.node(link.source)?, graph.node(link.target)?);

			let (color, width, opacity, direction) = match highlight {
				Some(h) => match h.link_direction(link) {
					Some(Direction::Ancestors) => (&palette.ancestor, LINK_HIGHLIGHT_WIDTH, 1.0, Some(Direction::Ancestors)),
					Some(Direction::Descendants) => {
						(&palette.descendant, LINK_HIGHLIGHT_WIDTH, 1.0, Some(Direction::Descendants))
					}
					None => (&palette.link, LINK_THIN_WIDTH, LINK_DIM, None),
				},
				None => {
					let both_match = filter.is_search_match(link.source) && filter.is_search_match(link.target);
					let opacity = if filter.search_active && !both_match { SEARCH_DIM * LINK_OPACITY } else { LINK_OPACITY };
					(&palette.link, LINK_WIDTH, opacity, None)
				}
			};

			Some(StyledLink {
				source: link.source,
				target: link.target,
				from,
				to,
				source_radius: source.radius,
				target_radius: target.radius,
				color: color.clone(),
				width,
				opacity,
				direction,
				dashed: !source.is_published || !target.is_published,
			})
		})
		.collect();

	Frame {
		background: palette.background.clone(),
		transform,
		focus_ring: palette.focus_ring.clone(),
		label_color: palette.label.clone(),
		links,
		nodes,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::rule_graph::config::{LayoutConfig, ViewConfig};
	use crate::components::rule_graph::filter::FilterParams;
	use crate::components::rule_graph::interaction::Input;
	use crate::components::rule_graph::snapshot::GraphSnapshot;
	use crate::components::rule_graph::types::{CatalogEntry, Viewport};

	struct Fixture {
		snapshot: GraphSnapshot,
		interaction: Interaction,
		simulation: Simulation,
		palette: Palette,
	}

	impl Fixture {
		// a -> b -> c, x (draft) -> c, lone
		fn new(params: FilterParams) -> Self {
			let snapshot = GraphSnapshot::build(&[
				CatalogEntry::new("a").with_children(["b"]),
				CatalogEntry::new("b").with_children(["c"]),
				CatalogEntry::new("c"),
				CatalogEntry::new("x").with_children(["c"]).published(false),
				CatalogEntry::new("lone"),
			]);
			let viewport = Viewport::new(800.0, 600.0);
			let mut interaction = Interaction::new(ViewConfig::default(), viewport);
			interaction.refilter(&snapshot, params);
			let mut simulation = Simulation::new(LayoutConfig::default(), viewport);
			let visible: Vec<_> = snapshot
				.graph
				.nodes
				.iter()
				.filter(|n| interaction.filter().is_visible(n.id))
				.collect();
			simulation.reseed(visible, &interaction.filter().links);
			Self {
				snapshot,
				interaction,
				simulation,
				palette: Palette::default(),
			}
		}

		fn frame(&self) -> Frame {
			build_frame(&self.snapshot.graph, &self.interaction, &self.simulation, &self.palette)
		}

		fn handle(&mut self, input: Input) {
			self.interaction.handle(input, &self.snapshot);
		}
	}

	fn node(frame: &Frame, id: RuleId) -> &StyledNode {
		frame.nodes.iter().find(|n| n.id == id).unwrap()
	}

	#[test]
	fn idle_frame_is_plain_and_in_id_order() {
		let frame = Fixture::new(FilterParams::default()).frame();
		let ids: Vec<_> = frame.nodes.iter().map(|n| n.id).collect();
		assert_eq!(ids, vec![0, 1, 2, 3, 4]);
		assert!(frame.nodes.iter().all(|n| n.opacity == 1.0 && n.role.is_none()));
		assert!(node(&frame, 3).draft);
		assert_eq!(node(&frame, 3).fill, Palette::default().draft_node);
		assert!(frame.links.iter().any(|l| l.dashed));
	}

	#[test]
	fn hidden_drafts_are_not_drawn() {
		let frame = Fixture::new(FilterParams::default().with_drafts(false)).frame();
		assert!(frame.nodes.iter().all(|n| n.id != 3));
		assert!(frame.links.iter().all(|l| !l.dashed));
	}

	#[test]
	fn search_dims_misses_and_emphasizes_matches() {
		let mut fixture = Fixture::new(FilterParams::default());
		fixture.handle(Input::SearchChanged("lone".into()));
		let frame = fixture.frame();

		assert_eq!(frame.nodes.len(), 5);
		let lone = node(&frame, 4);
		assert!(lone.emphasized);
		assert_eq!(lone.stroke.as_deref(), Some(Palette::default().search_match.as_str()));
		assert_eq!(node(&frame, 0).opacity, SEARCH_DIM);
	}

	#[test]
	fn selection_colors_roles_and_closure_links() {
		let mut fixture = Fixture::new(FilterParams::default());
		fixture.handle(Input::NodeClick(1));
		let frame = fixture.frame();
		let palette = Palette::default();

		assert_eq!(node(&frame, 1).fill, palette.selected);
		assert_eq!(node(&frame, 0).fill, palette.ancestor);
		assert_eq!(node(&frame, 2).fill, palette.descendant);
		assert_eq!(node(&frame, 4).opacity, UNRELATED_DIM);
		assert!(node(&frame, 4).label.is_some());

		let link = |s, t| frame.links.iter().find(|l| l.source == s && l.target == t).unwrap();
		assert_eq!(link(0, 1).color, palette.ancestor);
		assert_eq!(link(0, 1).width, LINK_HIGHLIGHT_WIDTH);
		assert_eq!(link(1, 2).color, palette.descendant);
		assert_eq!(link(1, 2).opacity, 1.0);
		assert_eq!(link(3, 2).opacity, LINK_DIM);
		assert_eq!(link(3, 2).width, LINK_THIN_WIDTH);
	}

	#[test]
	fn selection_layers_over_search() {
		let mut fixture = Fixture::new(FilterParams::default());
		fixture.handle(Input::SearchChanged("lone".into()));
		fixture.handle(Input::NodeClick(1));
		let frame = fixture.frame();

		assert_eq!(node(&frame, 0).opacity, 1.0);
		assert!(node(&frame, 4).emphasized);
		assert_eq!(node(&frame, 4).opacity, UNRELATED_DIM);

		fixture.handle(Input::BackgroundClick);
		let frame = fixture.frame();
		assert_eq!(node(&frame, 0).opacity, SEARCH_DIM);
	}

	#[test]
	fn labels_hide_when_zoomed_out_unless_emphasized() {
		let mut fixture = Fixture::new(FilterParams::default());
		fixture.interaction.transform_mut().k = 0.2;
		fixture.handle(Input::Hover(Some(2)));
		let frame = fixture.frame();

		assert!(node(&frame, 0).label.is_none());
		assert_eq!(node(&frame, 2).label.as_deref(), Some("c"));
		assert!(node(&frame, 2).is_foreground());
	}
}
