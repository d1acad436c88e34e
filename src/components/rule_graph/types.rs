use serde::{Deserialize, Deserializer, Serialize};

/// Dense node identifier assigned by the graph builder.
pub type RuleId = u32;

/// Reference from one catalog entry to another rule by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRef {
	#[serde(default)]
	pub name: Option<String>,
}

impl RuleRef {
	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
		}
	}
}

/// One rule as delivered by the catalog source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub filepath: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub is_published: Option<bool>,
	#[serde(default)]
	pub review_branch: Option<String>,
	#[serde(default, rename = "parent_rules", deserialize_with = "null_as_empty")]
	pub parent_rules: Vec<RuleRef>,
	#[serde(default, rename = "child_rules", deserialize_with = "null_as_empty")]
	pub child_rules: Vec<RuleRef>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<RuleRef>, D::Error> {
	Ok(Option::<Vec<RuleRef>>::deserialize(deserializer)?.unwrap_or_default())
}

impl CatalogEntry {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			..Default::default()
		}
	}

	pub fn with_children<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
		self.child_rules.extend(names.into_iter().map(RuleRef::named));
		self
	}

	pub fn with_parents<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
		self.parent_rules.extend(names.into_iter().map(RuleRef::named));
		self
	}

	pub fn with_filepath(mut self, filepath: impl Into<String>) -> Self {
		self.filepath = Some(filepath.into());
		self
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn published(mut self, is_published: bool) -> Self {
		self.is_published = Some(is_published);
		self
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleNode {
	pub id: RuleId,
	pub name: String,
	pub label: Option<String>,
	pub filepath: Option<String>,
	pub description: Option<String>,
	pub url: Option<String>,
	pub is_published: bool,
	pub review_branch: Option<String>,
	/// Display size only; the collision force reads it but springs do not.
	pub radius: f64,
}

impl RuleNode {
	pub fn display_name(&self) -> &str {
		self.label.as_deref().unwrap_or(&self.name)
	}

	pub fn details(&self) -> RuleDetails {
		RuleDetails {
			id: self.id,
			label: self.display_name().to_owned(),
			name: self.name.clone(),
			filepath: self.filepath.clone(),
			description: self.description.clone(),
			url: self.url.clone(),
			is_published: self.is_published,
			review_branch: self.review_branch.clone(),
		}
	}
}

/// Directed edge: `source` references `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleLink {
	pub source: RuleId,
	pub target: RuleId,
}

impl RuleLink {
	pub fn new(source: RuleId, target: RuleId) -> Self {
		Self { source, target }
	}

	pub fn touches(&self, id: RuleId) -> bool {
		self.source == id || self.target == id
	}
}

/// Payload of the "node activated" event, shown by the detail view.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleDetails {
	pub id: RuleId,
	pub label: String,
	pub name: String,
	pub filepath: Option<String>,
	pub description: Option<String>,
	pub url: Option<String>,
	pub is_published: bool,
	pub review_branch: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
}

impl Viewport {
	pub fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}

	pub fn center(&self) -> (f64, f64) {
		(self.width / 2.0, self.height / 2.0)
	}
}

impl Default for Viewport {
	fn default() -> Self {
		Self::new(800.0, 600.0)
	}
}
