//! Decoding errors. The graph engine itself has no failure modes.

use thiserror::Error;

use super::types::CatalogEntry;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
	#[error("Invalid JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Catalog must be a JSON array of rules, found {found}")]
	NotAnArray { found: &'static str },
}

fn kind_of(value: &serde_json::Value) -> &'static str {
	match value {
		serde_json::Value::Null => "null",
		serde_json::Value::Bool(_) => "a boolean",
		serde_json::Value::Number(_) => "a number",
		serde_json::Value::String(_) => "a string",
		serde_json::Value::Array(_) => "an array",
		serde_json::Value::Object(_) => "an object",
	}
}

/// A decoded catalog document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedCatalog {
	pub entries: Vec<CatalogEntry>,
	/// Array items that were not entries (wrong field types, non-objects); skipped.
	pub malformed_entries: usize,
}

/// Decodes a catalog document. Only invalid JSON or a document that is not
/// an array fails; each item is decoded on its own and bad items are counted
/// and skipped. Entries that are merely incomplete are kept and later dropped by
/// the graph builder.
pub fn parse_catalog(json: &str) -> Result<ParsedCatalog> {
	let items = match serde_json::from_str::<serde_json::Value>(json)? {
		serde_json::Value::Array(items) => items,
		other => {
			return Err(CatalogError::NotAnArray {
				found: kind_of(&other),
			});
		}
	};
	let mut parsed = ParsedCatalog::default();
	for item in items {
		match serde_json::from_value::<CatalogEntry>(item) {
			Ok(entry) => parsed.entries.push(entry),
			Err(_) => parsed.malformed_entries += 1,
		}
	}
	Ok(parsed)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_catalog_fields() {
		let json = r#"[
			{"name": "a", "isPublished": false, "reviewBranch": "rb/1",
			 "child_rules": [{"name": "b"}], "parent_rules": []},
			{"name": "b", "url": "https://rules.example/b"},
			{"label": "no name"}
		]"#;
		let parsed = parse_catalog(json).unwrap();
		let catalog = &parsed.entries;

		assert_eq!(parsed.malformed_entries, 0);
		assert_eq!(catalog.len(), 3);
		assert_eq!(catalog[0].is_published, Some(false));
		assert_eq!(catalog[0].review_branch.as_deref(), Some("rb/1"));
		assert_eq!(catalog[0].child_rules[0].name.as_deref(), Some("b"));
		assert_eq!(catalog[1].url.as_deref(), Some("https://rules.example/b"));
		assert!(catalog[2].name.is_none());
	}

	#[test]
	fn bad_entries_are_skipped_not_fatal() {
		let json = r#"[
			{"name": "a", "child_rules": [{"name": "b"}]},
			{"name": "b"},
			{"name": "c", "child_rules": null, "parent_rules": null},
			{"name": 42},
			{"name": "d", "isPublished": "yes"},
			"not an entry"
		]"#;
		let parsed = parse_catalog(json).unwrap();

		let names: Vec<_> = parsed.entries.iter().filter_map(|e| e.name.as_deref()).collect();
		assert_eq!(names, vec!["a", "b", "c"]);
		assert!(parsed.entries[2].child_rules.is_empty());
		assert_eq!(parsed.malformed_entries, 3);
	}

	#[test]
	fn rejects_non_array_documents() {
		let err = parse_catalog(r#"{"name": "a"}"#).unwrap_err();
		assert!(matches!(err, CatalogError::NotAnArray { found: "an object" }));
	}

	#[test]
	fn rejects_malformed_json() {
		assert!(matches!(parse_catalog("[{"), Err(CatalogError::Json(_))));
	}
}
