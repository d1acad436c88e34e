//! Selection, search and navigation state.
//!
//! Two orthogonal pieces of state compose here: the selection (`Idle` or
//! `NodeSelected`) and the active search term. Search styling always applies;
//! selection styling is layered over it by the frame builder. The viewport
//! transform is independent of both and never touches layout positions.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use super::config::ViewConfig;
use super::filter::{FilterParams, FilterResult, apply_filter};
use super::snapshot::GraphSnapshot;
use super::traversal::{ClosureSet, Direction, Traversal};
use super::types::{RuleDetails, RuleId, RuleLink, Viewport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
	Idle,
	NodeSelected(RuleId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
	Selected,
	Ancestor,
	Descendant,
	Unrelated,
}

/// Closures of the selected node over the visible subgraph.
#[derive(Clone, Debug)]
pub struct Highlight {
	pub selected: RuleId,
	pub ancestors: Rc<ClosureSet>,
	pub descendants: Rc<ClosureSet>,
	pub ancestor_links: BTreeSet<RuleLink>,
	pub descendant_links: BTreeSet<RuleLink>,
}

impl Highlight {
	fn compute(traversal: &Traversal, selected: RuleId) -> Self {
		Self {
			selected,
			ancestors: traversal.ancestors(selected),
			descendants: traversal.descendants(selected),
			ancestor_links: traversal.induced_links(selected, Direction::Ancestors),
			descendant_links: traversal.induced_links(selected, Direction::Descendants),
		}
	}

	/// On cycles a node in both closures counts as a descendant.
	pub fn role(&self, id: RuleId) -> Role {
		if id == self.selected {
			Role::Selected
		} else if self.descendants.contains(&id) {
			Role::Descendant
		} else if self.ancestors.contains(&id) {
			Role::Ancestor
		} else {
			Role::Unrelated
		}
	}

	/// Which closure a link belongs to; on cycles the descendant side wins.
	pub fn link_direction(&self, link: &RuleLink) -> Option<Direction> {
		if self.descendant_links.contains(link) {
			Some(Direction::Descendants)
		} else if self.ancestor_links.contains(link) {
			Some(Direction::Ancestors)
		} else {
			None
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

impl ViewTransform {
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	pub fn graph_to_screen(&self, gx: f64, gy: f64) -> (f64, f64) {
		(gx * self.k + self.x, gy * self.k + self.y)
	}

	/// Scales by `factor` keeping the screen point `(sx, sy)` fixed.
	pub fn zoom_about(&mut self, sx: f64, sy: f64, factor: f64, min: f64, max: f64) {
		let new_k = (self.k * factor).clamp(min, max);
		let ratio = new_k / self.k;
		self.x = sx - (sx - self.x) * ratio;
		self.y = sy - (sy - self.y) * ratio;
		self.k = new_k;
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
	Left,
	Right,
	Up,
	Down,
	ZoomIn,
	ZoomOut,
	ResetView,
	Tab,
	BackTab,
	Activate,
	Escape,
}

impl Key {
	/// Maps a DOM `KeyboardEvent.key` value.
	pub fn from_event_key(key: &str, shift: bool) -> Option<Self> {
		Some(match key {
			"ArrowLeft" => Key::Left,
			"ArrowRight" => Key::Right,
			"ArrowUp" => Key::Up,
			"ArrowDown" => Key::Down,
			"+" | "=" => Key::ZoomIn,
			"-" | "_" => Key::ZoomOut,
			"0" => Key::ResetView,
			"Tab" if shift => Key::BackTab,
			"Tab" => Key::Tab,
			"Enter" | " " | "Spacebar" => Key::Activate,
			"Escape" | "Esc" => Key::Escape,
			_ => return None,
		})
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Input {
	BackgroundClick,
	NodeClick(RuleId),
	Key(Key),
	SearchChanged(String),
	Hover(Option<RuleId>),
}

/// Notifications for the host of the state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
	Activated(RuleDetails),
	Deselected,
	FocusMoved(RuleId),
	/// Focus walked off either end of the node order.
	FocusReleased,
	ViewChanged,
	SearchApplied { matches: usize },
}

pub struct Interaction {
	view: ViewConfig,
	viewport: Viewport,
	transform: ViewTransform,
	selection: Selection,
	highlight: Option<Highlight>,
	params: FilterParams,
	filter: FilterResult,
	visible_graph: Traversal,
	visible_generation: u64,
	focused: Option<RuleId>,
	hovered: Option<RuleId>,
}

impl Interaction {
	pub fn new(view: ViewConfig, viewport: Viewport) -> Self {
		Self {
			view,
			viewport,
			transform: ViewTransform::default(),
			selection: Selection::Idle,
			highlight: None,
			params: FilterParams::default(),
			filter: FilterResult::default(),
			visible_graph: Traversal::empty(),
			visible_generation: 0,
			focused: None,
			hovered: None,
		}
	}

	pub fn selection(&self) -> Selection {
		self.selection
	}

	pub fn search_term(&self) -> &str {
		&self.params.search_term
	}

	pub fn params(&self) -> &FilterParams {
		&self.params
	}

	pub fn filter(&self) -> &FilterResult {
		&self.filter
	}

	pub fn highlight(&self) -> Option<&Highlight> {
		self.highlight.as_ref()
	}

	pub fn role(&self, id: RuleId) -> Option<Role> {
		self.highlight.as_ref().map(|h| h.role(id))
	}

	pub fn focused(&self) -> Option<RuleId> {
		self.focused
	}

	pub fn hovered(&self) -> Option<RuleId> {
		self.hovered
	}

	pub fn transform(&self) -> ViewTransform {
		self.transform
	}

	pub fn transform_mut(&mut self) -> &mut ViewTransform {
		&mut self.transform
	}

	pub fn view_config(&self) -> &ViewConfig {
		&self.view
	}

	/// Bumped whenever the visible node set changes.
	pub fn visible_generation(&self) -> u64 {
		self.visible_generation
	}

	pub fn set_viewport(&mut self, viewport: Viewport) {
		self.viewport = viewport;
	}

	/// Renames tracked ids after a catalog rebuild; ids without a mapping are
	/// forgotten. Call [`refilter`](Self::refilter) afterwards. Returns
	/// `Deselected` if the selected rule no longer exists.
	pub fn remap(&mut self, mapping: &HashMap<RuleId, RuleId>) -> Option<Outcome> {
		let map = |id: Option<RuleId>| id.and_then(|id| mapping.get(&id).copied());
		self.focused = map(self.focused);
		self.hovered = map(self.hovered);
		self.highlight = None;
		self.filter = FilterResult::default();
		self.visible_graph = Traversal::empty();
		self.visible_generation += 1;

		let Selection::NodeSelected(id) = self.selection else {
			return None;
		};
		match map(Some(id)) {
			Some(id) => {
				self.selection = Selection::NodeSelected(id);
				None
			}
			None => {
				self.selection = Selection::Idle;
				Some(Outcome::Deselected)
			}
		}
	}

	/// Recomputes the visible set for `params` and revalidates selection,
	/// focus and hover against it. Returns `Deselected` if the selected node
	/// was filtered out.
	pub fn refilter(&mut self, snapshot: &GraphSnapshot, params: FilterParams) -> Option<Outcome> {
		let filter = apply_filter(&snapshot.graph, &snapshot.traversal, &params);
		if filter.visible != self.filter.visible {
			self.visible_generation += 1;
		}
		self.visible_graph = Traversal::new(filter.visible.iter().copied(), filter.links.iter().copied());
		self.filter = filter;
		self.params = params;

		if self.focused.is_some_and(|id| !self.filter.is_visible(id)) {
			self.focused = None;
		}
		if self.hovered.is_some_and(|id| !self.filter.is_visible(id)) {
			self.hovered = None;
		}
		match self.selection {
			Selection::NodeSelected(id) if self.filter.is_visible(id) => {
				self.highlight = Some(Highlight::compute(&self.visible_graph, id));
				None
			}
			Selection::NodeSelected(_) => {
				self.selection = Selection::Idle;
				self.highlight = None;
				Some(Outcome::Deselected)
			}
			Selection::Idle => {
				self.highlight = None;
				None
			}
		}
	}

	pub fn handle(&mut self, input: Input, snapshot: &GraphSnapshot) -> Option<Outcome> {
		match input {
			Input::BackgroundClick => self.deselect(),
			Input::NodeClick(id) => self.activate(id, snapshot),
			Input::SearchChanged(term) => {
				let params = FilterParams {
					search_term: term,
					..self.params.clone()
				};
				let deselected = self.refilter(snapshot, params);
				deselected.or(Some(Outcome::SearchApplied {
					matches: self.filter.search_matches.len(),
				}))
			}
			Input::Hover(id) => {
				self.hovered = id.filter(|id| self.filter.is_visible(*id));
				None
			}
			Input::Key(key) => self.key(key, snapshot),
		}
	}

	fn deselect(&mut self) -> Option<Outcome> {
		match self.selection {
			Selection::NodeSelected(_) => {
				self.selection = Selection::Idle;
				self.highlight = None;
				Some(Outcome::Deselected)
			}
			Selection::Idle => None,
		}
	}

	fn activate(&mut self, id: RuleId, snapshot: &GraphSnapshot) -> Option<Outcome> {
		if !self.filter.is_visible(id) {
			return None;
		}
		let node = snapshot.graph.node(id)?;
		self.selection = Selection::NodeSelected(id);
		self.highlight = Some(Highlight::compute(&self.visible_graph, id));
		self.focused = Some(id);
		Some(Outcome::Activated(node.details()))
	}

	fn key(&mut self, key: Key, snapshot: &GraphSnapshot) -> Option<Outcome> {
		let step = self.view.pan_step;
		match key {
			Key::Left => self.pan(step, 0.0),
			Key::Right => self.pan(-step, 0.0),
			Key::Up => self.pan(0.0, step),
			Key::Down => self.pan(0.0, -step),
			Key::ZoomIn => self.zoom(self.view.zoom_step),
			Key::ZoomOut => self.zoom(1.0 / self.view.zoom_step),
			Key::ResetView => {
				self.transform = ViewTransform::default();
				Some(Outcome::ViewChanged)
			}
			Key::Tab => self.move_focus(true),
			Key::BackTab => self.move_focus(false),
			Key::Activate => {
				let id = self.focused?;
				self.activate(id, snapshot)
			}
			Key::Escape => self.deselect(),
		}
	}

	fn pan(&mut self, dx: f64, dy: f64) -> Option<Outcome> {
		self.transform.x += dx;
		self.transform.y += dy;
		Some(Outcome::ViewChanged)
	}

	fn zoom(&mut self, factor: f64) -> Option<Outcome> {
		let (cx, cy) = self.viewport.center();
		self.transform
			.zoom_about(cx, cy, factor, self.view.min_scale, self.view.max_scale);
		Some(Outcome::ViewChanged)
	}

	/// Walks focus through visible nodes in draw order.
	fn move_focus(&mut self, forward: bool) -> Option<Outcome> {
		let visible = &self.filter.visible;
		let next = match (self.focused, forward) {
			(None, true) => visible.first().copied(),
			(None, false) => visible.last().copied(),
			(Some(id), true) => visible.range(id + 1..).next().copied(),
			(Some(id), false) => visible.range(..id).next_back().copied(),
		};
		self.focused = next;
		Some(match next {
			Some(id) => Outcome::FocusMoved(id),
			None => Outcome::FocusReleased,
		})
	}
}
