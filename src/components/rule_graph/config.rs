use serde::{Deserialize, Serialize};

use super::error::Result;

/// Force and cooling parameters of the layout simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	pub link_distance: f64,
	/// Kept below 1 so links stretch instead of snapping to rest length.
	pub link_strength: f64,
	/// Negative values repel.
	pub charge_strength: f64,
	pub charge_distance_max: f64,
	pub center_strength: f64,
	pub collide_padding: f64,
	pub collide_strength: f64,
	pub alpha_decay: f64,
	pub alpha_min: f64,
	pub velocity_decay: f64,
	/// Alpha target held while a node is dragged.
	pub drag_alpha_target: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			link_distance: 60.0,
			link_strength: 0.7,
			charge_strength: -180.0,
			charge_distance_max: 400.0,
			center_strength: 0.06,
			collide_padding: 6.0,
			collide_strength: 0.7,
			// 1 - 0.001^(1/300): cools from 1 to alpha_min in ~300 frames.
			alpha_decay: 0.0228,
			alpha_min: 0.001,
			velocity_decay: 0.4,
			drag_alpha_target: 0.3,
		}
	}
}

/// Viewport navigation limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
	pub min_scale: f64,
	pub max_scale: f64,
	pub zoom_step: f64,
	pub pan_step: f64,
	/// Pointer travel, in screen pixels, below which a press counts as a click.
	pub click_tolerance: f64,
	/// Extra world-space slack around a node's radius for hit testing.
	pub hit_slop: f64,
	/// Labels of unemphasized nodes are hidden below this scale.
	pub label_min_scale: f64,
}

impl Default for ViewConfig {
	fn default() -> Self {
		Self {
			min_scale: 0.1,
			max_scale: 10.0,
			zoom_step: 1.2,
			pan_step: 40.0,
			click_tolerance: 4.0,
			hit_slop: 4.0,
			label_min_scale: 0.6,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
	pub background: String,
	pub node: String,
	pub draft_node: String,
	pub selected: String,
	pub ancestor: String,
	pub descendant: String,
	pub link: String,
	pub search_match: String,
	pub focus_ring: String,
	pub label: String,
}

impl Default for Palette {
	fn default() -> Self {
		Self {
			background: "#1a1a2e".into(),
			node: "#1f77b4".into(),
			draft_node: "#7f7f7f".into(),
			selected: "#d62728".into(),
			ancestor: "#ff7f0e".into(),
			descendant: "#2ca02c".into(),
			link: "rgb(100, 180, 255)".into(),
			search_match: "#ffd700".into(),
			focus_ring: "#ffffff".into(),
			label: "#ffffff".into(),
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
	pub layout: LayoutConfig,
	pub view: ViewConfig,
	pub palette: Palette,
}

impl GraphConfig {
	/// Parses a possibly partial JSON document; absent keys keep defaults.
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_json_keeps_defaults() {
		let config = GraphConfig::from_json(r#"{"layout": {"link_distance": 90.0}, "view": {"max_scale": 4}}"#)
			.unwrap();
		assert_eq!(config.layout.link_distance, 90.0);
		assert_eq!(config.layout.link_strength, LayoutConfig::default().link_strength);
		assert_eq!(config.view.max_scale, 4.0);
		assert_eq!(config.palette, Palette::default());
	}

	#[test]
	fn malformed_json_is_an_error() {
		assert!(GraphConfig::from_json("{").is_err());
	}

	#[test]
	fn default_link_strength_is_semi_elastic() {
		assert!(LayoutConfig::default().link_strength < 1.0);
	}
}
