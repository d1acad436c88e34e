use log::{debug, info, warn};

use super::config::GraphConfig;
use super::filter::FilterParams;
use super::interaction::{Input, Interaction, Key, Outcome, Selection};
use super::simulation::Simulation;
use super::snapshot::GraphSnapshot;
use super::style::{Frame, build_frame};
use super::types::{CatalogEntry, RuleDetails, RuleId, Viewport};

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node: Option<RuleId>,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// One rendering session: the current graph snapshot plus everything that
/// reacts to it. Every mutation goes through `&mut self`, so a rebuild is
/// always complete before the next tick reads positions.
pub struct RuleGraphState {
	pub config: GraphConfig,
	pub snapshot: GraphSnapshot,
	pub simulation: Simulation,
	pub interaction: Interaction,
	pub drag: DragState,
	pub pan: PanState,
	pub viewport: Viewport,
	pub animation_running: bool,
	pub flow_time: f64,
}

impl RuleGraphState {
	pub fn new(catalog: &[CatalogEntry], params: FilterParams, viewport: Viewport, config: GraphConfig) -> Self {
		let mut state = Self {
			simulation: Simulation::new(config.layout.clone(), viewport),
			interaction: Interaction::new(config.view.clone(), viewport),
			snapshot: GraphSnapshot::default(),
			config,
			drag: DragState::default(),
			pan: PanState::default(),
			viewport,
			animation_running: true,
			flow_time: 0.0,
		};
		state.rebuild(catalog, params);
		state
	}

	/// Rebuilds from a new catalog. Rules keep their position and selection
	/// across the rebuild when their name survives.
	pub fn rebuild(&mut self, catalog: &[CatalogEntry], params: FilterParams) -> Option<Outcome> {
		let snapshot = GraphSnapshot::build(catalog);
		log_report(&snapshot);

		let mapping = self.snapshot.id_mapping(&snapshot);
		self.end_gestures();
		self.simulation.remap(&mapping);
		let lost = self.interaction.remap(&mapping);
		self.snapshot = snapshot;

		let outcome = self.interaction.refilter(&self.snapshot, params);
		self.reseed();
		// A surviving selection may have a new id and new details.
		lost.or(outcome)
			.or_else(|| self.selected_details().map(Outcome::Activated))
	}

	pub fn selected_details(&self) -> Option<RuleDetails> {
		match self.interaction.selection() {
			Selection::NodeSelected(id) => self.snapshot.graph.node(id).map(|n| n.details()),
			Selection::Idle => None,
		}
	}

	/// Applies new filter parameters to the current catalog. A change of the
	/// search term alone goes through the search transition.
	pub fn set_filter(&mut self, params: FilterParams) -> Option<Outcome> {
		let current = self.interaction.params();
		if &params == current {
			return None;
		}
		if params.category_filter == current.category_filter
			&& params.show_draft_rules == current.show_draft_rules
		{
			return self.set_search(&params.search_term);
		}
		let generation = self.interaction.visible_generation();
		let outcome = self.interaction.refilter(&self.snapshot, params);
		if self.interaction.visible_generation() != generation {
			self.end_gestures();
			self.reseed();
		}
		outcome
	}

	pub fn set_search(&mut self, term: &str) -> Option<Outcome> {
		if term == self.interaction.search_term() {
			return None;
		}
		self.handle(Input::SearchChanged(term.to_owned()))
	}

	fn reseed(&mut self) {
		let filter = self.interaction.filter();
		let nodes = self
			.snapshot
			.graph
			.nodes
			.iter()
			.filter(|n| filter.is_visible(n.id));
		self.simulation.reseed(nodes, &filter.links);
		debug!(
			"Reseeded layout with {} nodes and {} links",
			self.simulation.len(),
			filter.links.len()
		);
	}

	pub fn handle(&mut self, input: Input) -> Option<Outcome> {
		let outcome = self.interaction.handle(input, &self.snapshot);
		if let Some(Outcome::Activated(details)) = &outcome {
			info!("Activated rule {}", details.name);
		}
		outcome
	}

	pub fn key(&mut self, key: Key) -> Option<Outcome> {
		self.handle(Input::Key(key))
	}

	pub fn frame(&self) -> Frame {
		build_frame(
			&self.snapshot.graph,
			&self.interaction,
			&self.simulation,
			&self.config.palette,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<RuleId> {
		let (gx, gy) = self.interaction.transform().screen_to_graph(sx, sy);
		self.simulation.node_at(gx, gy, self.config.view.hit_slop)
	}

	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		if let Some(id) = self.node_at_position(sx, sy) {
			let (nx, ny) = self.simulation.position(id).unwrap_or_default();
			self.drag = DragState {
				active: true,
				node: Some(id),
				moved: false,
				start_x: sx,
				start_y: sy,
				node_start_x: nx,
				node_start_y: ny,
			};
			self.simulation.drag_start(id);
		} else {
			let transform = self.interaction.transform();
			self.pan = PanState {
				active: true,
				moved: false,
				start_x: sx,
				start_y: sy,
				transform_start_x: transform.x,
				transform_start_y: transform.y,
			};
		}
	}

	fn beyond_click_tolerance(&self, start_x: f64, start_y: f64, sx: f64, sy: f64) -> bool {
		(sx - start_x).hypot(sy - start_y) > self.config.view.click_tolerance
	}

	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if self.drag.active {
			let Some(id) = self.drag.node else {
				return;
			};
			if !self.drag.moved && self.beyond_click_tolerance(self.drag.start_x, self.drag.start_y, sx, sy) {
				self.drag.moved = true;
			}
			if self.drag.moved {
				let k = self.interaction.transform().k;
				let (nx, ny) = (
					self.drag.node_start_x + (sx - self.drag.start_x) / k,
					self.drag.node_start_y + (sy - self.drag.start_y) / k,
				);
				self.simulation.drag_move(id, nx, ny);
			}
		} else if self.pan.active {
			if !self.pan.moved && self.beyond_click_tolerance(self.pan.start_x, self.pan.start_y, sx, sy) {
				self.pan.moved = true;
			}
			let transform = self.interaction.transform_mut();
			transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
			transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
		} else {
			let hovered = self.node_at_position(sx, sy);
			if hovered != self.interaction.hovered() {
				self.handle(Input::Hover(hovered));
			}
		}
	}

	/// Ends the current gesture. A press that never left the click tolerance
	/// activates the node under it, or clears the selection on background.
	pub fn pointer_up(&mut self) -> Option<Outcome> {
		let drag = std::mem::take(&mut self.drag);
		let pan = std::mem::take(&mut self.pan);
		if let (true, Some(id)) = (drag.active, drag.node) {
			self.simulation.drag_end(id);
			if !drag.moved {
				return self.handle(Input::NodeClick(id));
			}
		} else if pan.active && !pan.moved {
			return self.handle(Input::BackgroundClick);
		}
		None
	}

	pub fn pointer_leave(&mut self) {
		self.end_gestures();
		self.handle(Input::Hover(None));
	}

	fn end_gestures(&mut self) {
		if let (true, Some(id)) = (self.drag.active, self.drag.node) {
			self.simulation.drag_end(id);
		}
		self.drag = DragState::default();
		self.pan = PanState::default();
	}

	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let (min, max) = (self.config.view.min_scale, self.config.view.max_scale);
		self.interaction
			.transform_mut()
			.zoom_about(sx, sy, factor, min, max);
	}

	pub fn tick(&mut self, dt: f64) {
		if self.animation_running {
			self.simulation.tick(dt);
		}
		self.flow_time += dt;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.viewport = Viewport::new(width, height);
		self.simulation.resize(self.viewport);
		self.interaction.set_viewport(self.viewport);
	}

	/// Stops layout updates for good; used on teardown.
	pub fn stop(&mut self) {
		self.animation_running = false;
		self.simulation.stop();
	}
}

fn log_report(snapshot: &GraphSnapshot) {
	let report = &snapshot.report;
	info!(
		"Built rule graph: {} rules, {} links",
		snapshot.graph.nodes.len(),
		snapshot.graph.links.len()
	);
	if report.unnamed_entries > 0 {
		warn!("Dropped {} catalog entries without a name", report.unnamed_entries);
	}
	if !report.duplicate_names.is_empty() {
		warn!("Ignored duplicate rule names: {}", report.duplicate_names.join(", "));
	}
	if !report.dangling_refs.is_empty() {
		debug!("Dropped references to unknown rules: {}", report.dangling_refs.join(", "));
	}
}
