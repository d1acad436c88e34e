//! Force-directed layout.
//!
//! All per-node state lives in parallel arrays indexed by the node's slot in
//! the current visible set. The caller owns the clock: every animation frame
//! calls [`Simulation::tick`], and drag handlers call the `drag_*` methods in
//! between frames. Nothing else writes positions.

use std::collections::HashMap;
use std::f64::consts::PI;

use super::config::LayoutConfig;
use super::types::{RuleId, RuleLink, RuleNode, Viewport};

/// Nominal frame length; one relaxation step is taken per elapsed frame.
pub const FRAME_DT: f64 = 1.0 / 60.0;
/// Frames worth of catch-up allowed in a single tick.
const MAX_STEPS_PER_TICK: u32 = 3;
const INITIAL_RADIUS: f64 = 10.0;
const DISTANCE_MIN2: f64 = 1.0;

pub struct Simulation {
	config: LayoutConfig,
	center: (f64, f64),
	ids: Vec<RuleId>,
	index: HashMap<RuleId, usize>,
	radius: Vec<f64>,
	x: Vec<f64>,
	y: Vec<f64>,
	vx: Vec<f64>,
	vy: Vec<f64>,
	fx: Vec<Option<f64>>,
	fy: Vec<Option<f64>>,
	links: Vec<(usize, usize)>,
	/// Share of each link's correction applied to its source end.
	link_bias: Vec<f64>,
	alpha: f64,
	alpha_target: f64,
	pending: f64,
	stopped: bool,
	jiggle_seed: u64,
}

impl Simulation {
	pub fn new(config: LayoutConfig, viewport: Viewport) -> Self {
		Self {
			config,
			center: viewport.center(),
			ids: Vec::new(),
			index: HashMap::new(),
			radius: Vec::new(),
			x: Vec::new(),
			y: Vec::new(),
			vx: Vec::new(),
			vy: Vec::new(),
			fx: Vec::new(),
			fy: Vec::new(),
			links: Vec::new(),
			link_bias: Vec::new(),
			alpha: 1.0,
			alpha_target: 0.0,
			pending: 0.0,
			stopped: false,
			jiggle_seed: 1,
		}
	}

	/// Replaces the simulated node set. Nodes that were already simulated
	/// keep their position and pin; new ones are placed on a spiral around
	/// the viewport center. Links with an endpoint outside `nodes` are skipped.
	pub fn reseed<'a>(&mut self, nodes: impl IntoIterator<Item = &'a RuleNode>, links: &[RuleLink]) {
		let previous: HashMap<RuleId, (f64, f64, Option<f64>, Option<f64>)> = self
			.ids
			.iter()
			.enumerate()
			.map(|(i, &id)| (id, (self.x[i], self.y[i], self.fx[i], self.fy[i])))
			.collect();

		self.ids.clear();
		self.radius.clear();
		for node in nodes {
			self.ids.push(node.id);
			self.radius.push(node.radius);
		}
		let n = self.ids.len();
		self.index = self.ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
		self.x = vec![0.0; n];
		self.y = vec![0.0; n];
		self.vx = vec![0.0; n];
		self.vy = vec![0.0; n];
		self.fx = vec![None; n];
		self.fy = vec![None; n];

		let (cx, cy) = self.center;
		let golden_angle = PI * (3.0 - 5f64.sqrt());
		for i in 0..n {
			if let Some(&(x, y, fx, fy)) = previous.get(&self.ids[i]) {
				(self.x[i], self.y[i], self.fx[i], self.fy[i]) = (x, y, fx, fy);
			} else {
				let r = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
				let angle = i as f64 * golden_angle;
				self.x[i] = cx + r * angle.cos();
				self.y[i] = cy + r * angle.sin();
			}
		}

		self.links = links
			.iter()
			.filter_map(|l| Some((*self.index.get(&l.source)?, *self.index.get(&l.target)?)))
			.filter(|(s, t)| s != t)
			.collect();
		let mut degree = vec![0usize; n];
		for &(s, t) in &self.links {
			degree[s] += 1;
			degree[t] += 1;
		}
		self.link_bias = self
			.links
			.iter()
			.map(|&(s, t)| degree[s] as f64 / (degree[s] + degree[t]) as f64)
			.collect();

		self.alpha = if self.stopped { 0.0 } else { 1.0 };
		self.pending = 0.0;
	}

	/// Renames simulated ids after a catalog rebuild so the next
	/// [`reseed`](Self::reseed) carries positions over. Unmapped ids are dropped.
	pub fn remap(&mut self, mapping: &HashMap<RuleId, RuleId>) {
		let keep: Vec<usize> = (0..self.ids.len()).filter(|i| mapping.contains_key(&self.ids[*i])).collect();
		let pick = |v: &[f64]| keep.iter().map(|&i| v[i]).collect::<Vec<_>>();
		let pick_pin = |v: &[Option<f64>]| keep.iter().map(|&i| v[i]).collect::<Vec<_>>();
		(self.x, self.y, self.vx, self.vy) = (pick(&self.x), pick(&self.y), pick(&self.vx), pick(&self.vy));
		(self.fx, self.fy) = (pick_pin(&self.fx), pick_pin(&self.fy));
		self.radius = pick(&self.radius);
		self.ids = keep.iter().map(|&i| mapping[&self.ids[i]]).collect();
		self.index = self.ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
		self.links.clear();
		self.link_bias.clear();
	}

	pub fn resize(&mut self, viewport: Viewport) {
		self.center = viewport.center();
		self.reheat(self.alpha.max(0.3));
	}

	pub fn reheat(&mut self, alpha: f64) {
		if !self.stopped {
			self.alpha = alpha;
		}
	}

	/// Halts the simulation for good; later ticks leave positions untouched
	/// and nothing restarts it.
	pub fn stop(&mut self) {
		self.stopped = true;
		self.alpha = 0.0;
		self.alpha_target = 0.0;
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn is_settled(&self) -> bool {
		self.stopped || (self.alpha < self.config.alpha_min && self.alpha_target < self.config.alpha_min)
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn position(&self, id: RuleId) -> Option<(f64, f64)> {
		self.index.get(&id).map(|&i| (self.x[i], self.y[i]))
	}

	pub fn positions(&self) -> impl Iterator<Item = (RuleId, f64, f64)> + '_ {
		self.ids.iter().enumerate().map(|(i, &id)| (id, self.x[i], self.y[i]))
	}

	pub fn is_pinned(&self, id: RuleId) -> bool {
		self.index.get(&id).is_some_and(|&i| self.fx[i].is_some())
	}

	/// Node under a world-space point, nearest first, within its radius plus `slop`.
	pub fn node_at(&self, x: f64, y: f64, slop: f64) -> Option<RuleId> {
		let mut best: Option<(f64, RuleId)> = None;
		for i in 0..self.ids.len() {
			let d = ((self.x[i] - x).powi(2) + (self.y[i] - y).powi(2)).sqrt();
			if d <= self.radius[i] + slop && best.is_none_or(|(bd, _)| d < bd) {
				best = Some((d, self.ids[i]));
			}
		}
		best.map(|(_, id)| id)
	}

	/// Pins `id` where it is and keeps the layout warm while it is held.
	pub fn drag_start(&mut self, id: RuleId) {
		let Some(&i) = self.index.get(&id) else {
			return;
		};
		self.fx[i] = Some(self.x[i]);
		self.fy[i] = Some(self.y[i]);
		if !self.stopped {
			self.alpha_target = self.config.drag_alpha_target;
		}
	}

	/// Moves a node pinned by [`drag_start`](Self::drag_start); others are left alone.
	pub fn drag_move(&mut self, id: RuleId, x: f64, y: f64) {
		let Some(&i) = self.index.get(&id).filter(|&&i| self.fx[i].is_some()) else {
			return;
		};
		self.fx[i] = Some(x);
		self.fy[i] = Some(y);
		self.x[i] = x;
		self.y[i] = y;
	}

	pub fn drag_end(&mut self, id: RuleId) {
		let Some(&i) = self.index.get(&id) else {
			return;
		};
		self.fx[i] = None;
		self.fy[i] = None;
		self.alpha_target = 0.0;
	}

	/// Advances the layout by `dt` seconds. Returns whether any step ran.
	pub fn tick(&mut self, dt: f64) -> bool {
		if self.is_settled() || self.ids.is_empty() {
			self.pending = 0.0;
			return false;
		}
		self.pending += dt.max(0.0);
		let mut steps = 0;
		while self.pending + 1e-9 >= FRAME_DT && steps < MAX_STEPS_PER_TICK {
			self.pending -= FRAME_DT;
			self.step();
			steps += 1;
		}
		if steps == MAX_STEPS_PER_TICK {
			self.pending = 0.0;
		}
		steps > 0
	}

	fn step(&mut self) {
		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
		let alpha = self.alpha;

		self.apply_links(alpha);
		self.apply_charge(alpha);
		self.apply_centering(alpha);
		self.apply_collisions();

		let keep = 1.0 - self.config.velocity_decay;
		for i in 0..self.ids.len() {
			match (self.fx[i], self.fy[i]) {
				(Some(fx), Some(fy)) => {
					self.x[i] = fx;
					self.y[i] = fy;
					self.vx[i] = 0.0;
					self.vy[i] = 0.0;
				}
				_ => {
					self.vx[i] *= keep;
					self.vy[i] *= keep;
					self.x[i] += self.vx[i];
					self.y[i] += self.vy[i];
				}
			}
		}
	}

	fn jiggle(&mut self) -> f64 {
		self.jiggle_seed = self
			.jiggle_seed
			.wrapping_mul(6364136223846793005)
			.wrapping_add(1442695040888963407);
		((self.jiggle_seed >> 33) as f64 / (1u64 << 31) as f64 - 0.5) * 1e-6
	}

	fn nonzero(&mut self, v: f64) -> f64 {
		if v == 0.0 { self.jiggle() } else { v }
	}

	fn apply_links(&mut self, alpha: f64) {
		let (distance, strength) = (self.config.link_distance, self.config.link_strength);
		for k in 0..self.links.len() {
			let (s, t) = self.links[k];
			let dx = self.x[t] + self.vx[t] - self.x[s] - self.vx[s];
			let dy = self.y[t] + self.vy[t] - self.y[s] - self.vy[s];
			let (dx, dy) = (self.nonzero(dx), self.nonzero(dy));
			let len = (dx * dx + dy * dy).sqrt();
			let scale = (len - distance) / len * alpha * strength;
			let (dx, dy) = (dx * scale, dy * scale);
			let bias = self.link_bias[k];
			self.vx[t] -= dx * bias;
			self.vy[t] -= dy * bias;
			self.vx[s] += dx * (1.0 - bias);
			self.vy[s] += dy * (1.0 - bias);
		}
	}

	fn apply_charge(&mut self, alpha: f64) {
		let max2 = self.config.charge_distance_max.powi(2);
		let strength = self.config.charge_strength;
		let n = self.ids.len();
		for i in 0..n {
			for j in 0..n {
				if i == j {
					continue;
				}
				let dx = self.x[j] - self.x[i];
				let dy = self.y[j] - self.y[i];
				let mut l = dx * dx + dy * dy;
				if l >= max2 {
					continue;
				}
				let (dx, dy) = (self.nonzero(dx), self.nonzero(dy));
				if l == 0.0 {
					l = dx * dx + dy * dy;
				}
				if l < DISTANCE_MIN2 {
					l = (DISTANCE_MIN2 * l).sqrt();
				}
				self.vx[i] += dx * strength * alpha / l;
				self.vy[i] += dy * strength * alpha / l;
			}
		}
	}

	fn apply_centering(&mut self, alpha: f64) {
		let (cx, cy) = self.center;
		let k = self.config.center_strength * alpha;
		for i in 0..self.ids.len() {
			self.vx[i] += (cx - self.x[i]) * k;
			self.vy[i] += (cy - self.y[i]) * k;
		}
	}

	fn apply_collisions(&mut self) {
		let (padding, strength) = (self.config.collide_padding, self.config.collide_strength);
		let n = self.ids.len();
		for i in 0..n {
			let ri = self.radius[i] + padding;
			let (xi, yi) = (self.x[i] + self.vx[i], self.y[i] + self.vy[i]);
			for j in (i + 1)..n {
				let rj = self.radius[j] + padding;
				let r = ri + rj;
				let dx = xi - self.x[j] - self.vx[j];
				let dy = yi - self.y[j] - self.vy[j];
				let l = dx * dx + dy * dy;
				if l >= r * r {
					continue;
				}
				let (dx, dy) = (self.nonzero(dx), self.nonzero(dy));
				let l = (dx * dx + dy * dy).sqrt();
				let push = (r - l) / l * strength;
				let (dx, dy) = (dx * push, dy * push);
				let share = rj * rj / (ri * ri + rj * rj);
				self.vx[i] += dx * share;
				self.vy[i] += dy * share;
				self.vx[j] -= dx * (1.0 - share);
				self.vy[j] -= dy * (1.0 - share);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::rule_graph::builder::build_graph;
	use crate::components::rule_graph::types::CatalogEntry;

	fn chain_simulation() -> Simulation {
		let catalog = vec![
			CatalogEntry::new("a").with_children(["b"]),
			CatalogEntry::new("b").with_children(["c"]),
			CatalogEntry::new("c"),
		];
		let (graph, _) = build_graph(&catalog);
		let mut sim = Simulation::new(LayoutConfig::default(), Viewport::new(800.0, 600.0));
		sim.reseed(&graph.nodes, &graph.links);
		sim
	}

	/// Drops a node at a point through a full drag gesture.
	fn place(sim: &mut Simulation, id: RuleId, x: f64, y: f64) {
		sim.drag_start(id);
		sim.drag_move(id, x, y);
		sim.drag_end(id);
	}

	fn run(sim: &mut Simulation, frames: usize) {
		for _ in 0..frames {
			sim.tick(FRAME_DT);
		}
	}

	#[test]
	fn seeds_around_viewport_center() {
		let sim = chain_simulation();
		for (_, x, y) in sim.positions() {
			assert!((x - 400.0).abs() < 50.0 && (y - 300.0).abs() < 50.0);
		}
	}

	#[test]
	fn dragged_node_stays_pinned_until_released() {
		let mut sim = chain_simulation();
		run(&mut sim, 30);

		sim.drag_start(1);
		sim.drag_move(1, 50.0, 50.0);
		assert!(sim.is_pinned(1));
		for _ in 0..120 {
			sim.tick(FRAME_DT);
			assert_eq!(sim.position(1), Some((50.0, 50.0)));
		}

		sim.drag_end(1);
		assert!(!sim.is_pinned(1));
		run(&mut sim, 3);
		assert_ne!(sim.position(1), Some((50.0, 50.0)));
	}

	#[test]
	fn drag_reheats_the_layout() {
		let mut sim = chain_simulation();
		run(&mut sim, 600);
		assert!(sim.is_settled());

		sim.drag_start(0);
		assert!(!sim.is_settled());
		run(&mut sim, 200);
		assert!(sim.alpha() > 0.25);

		sim.drag_end(0);
		run(&mut sim, 600);
		assert!(sim.is_settled());
	}

	#[test]
	fn settles_and_stops_moving() {
		let mut sim = chain_simulation();
		run(&mut sim, 400);
		assert!(sim.is_settled());
		let before: Vec<_> = sim.positions().collect();
		assert!(!sim.tick(FRAME_DT));
		assert_eq!(before, sim.positions().collect::<Vec<_>>());
	}

	#[test]
	fn overlapping_nodes_are_pushed_apart() {
		let catalog = vec![CatalogEntry::new("a"), CatalogEntry::new("b")];
		let (graph, _) = build_graph(&catalog);
		let mut sim = Simulation::new(LayoutConfig::default(), Viewport::new(800.0, 600.0));
		sim.reseed(&graph.nodes, &graph.links);
		sim.drag_start(0);
		sim.drag_move(0, 400.0, 300.0);
		sim.drag_end(0);
		sim.drag_start(1);
		sim.drag_move(1, 400.0, 300.0);
		sim.drag_end(1);

		run(&mut sim, 300);
		let (ax, ay) = sim.position(0).unwrap();
		let (bx, by) = sim.position(1).unwrap();
		let min_gap = graph.nodes[0].radius + graph.nodes[1].radius;
		assert!(((ax - bx).powi(2) + (ay - by).powi(2)).sqrt() > min_gap);
		assert!(ax.is_finite() && ay.is_finite() && bx.is_finite() && by.is_finite());
	}

	#[test]
	fn reseed_keeps_positions_of_surviving_nodes() {
		let mut sim = chain_simulation();
		run(&mut sim, 50);
		let b = sim.position(1).unwrap();

		let catalog = vec![CatalogEntry::new("a"), CatalogEntry::new("b")];
		let (graph, _) = build_graph(&catalog);
		sim.reseed(&graph.nodes, &graph.links);

		assert_eq!(sim.len(), 2);
		assert_eq!(sim.position(1), Some(b));
		assert_eq!(sim.position(2), None);
		assert_eq!(sim.alpha(), 1.0);
	}

	#[test]
	fn remap_carries_positions_to_new_ids() {
		let mut sim = chain_simulation();
		run(&mut sim, 20);
		let a = sim.position(0).unwrap();

		// "a" becomes id 1 in the new catalog, "b" and "c" are gone.
		sim.remap(&HashMap::from([(0, 1)]));
		assert_eq!(sim.position(1), Some(a));
		assert_eq!(sim.len(), 1);

		let catalog = vec![CatalogEntry::new("z"), CatalogEntry::new("a")];
		let (graph, _) = build_graph(&catalog);
		sim.reseed(&graph.nodes, &graph.links);
		assert_eq!(sim.position(1), Some(a));
	}

	#[test]
	fn stop_freezes_positions() {
		let mut sim = chain_simulation();
		sim.stop();
		let before: Vec<_> = sim.positions().collect();
		run(&mut sim, 10);
		assert_eq!(before, sim.positions().collect::<Vec<_>>());
	}

	#[test]
	fn stopped_simulation_cannot_be_restarted() {
		let mut sim = chain_simulation();
		sim.stop();
		let before: Vec<_> = sim.positions().collect();

		sim.resize(Viewport::new(1600.0, 1200.0));
		sim.reheat(1.0);
		sim.drag_start(1);
		sim.drag_end(1);
		let (graph, _) = build_graph(&[CatalogEntry::new("a"), CatalogEntry::new("b"), CatalogEntry::new("c")]);
		sim.reseed(&graph.nodes, &[]);
		run(&mut sim, 10);

		assert!(sim.is_settled());
		assert_eq!(before, sim.positions().collect::<Vec<_>>());
	}

	#[test]
	fn drag_move_without_drag_start_is_ignored() {
		let mut sim = chain_simulation();
		let before = sim.position(0);
		sim.drag_move(0, 5.0, 5.0);
		assert_eq!(sim.position(0), before);
		assert!(!sim.is_pinned(0));
	}

	#[test]
	fn unknown_ids_are_ignored() {
		let mut sim = chain_simulation();
		sim.drag_start(42);
		sim.drag_move(42, 1.0, 1.0);
		sim.drag_end(42);
		assert_eq!(sim.position(42), None);
		assert!(!sim.is_pinned(42));
	}

	#[test]
	fn hit_testing_prefers_nearest_node() {
		let mut sim = chain_simulation();
		place(&mut sim, 0, 100.0, 100.0);
		place(&mut sim, 1, 110.0, 100.0);
		place(&mut sim, 2, 300.0, 300.0);
		assert!(!sim.is_pinned(0));
		assert_eq!(sim.node_at(108.0, 100.0, 4.0), Some(1));
		assert_eq!(sim.node_at(200.0, 200.0, 4.0), None);
	}
}
