use leptos::prelude::*;
use log::warn;

use crate::components::rule_graph::{CatalogEntry, GraphConfig, Palette, RuleDetails, RuleGraphCanvas, parse_catalog};

const SAMPLE_CATALOG: &str = include_str!("../../assets/sample_catalog.json");
const GRAPH_CONFIG: &str = include_str!("../../assets/graph_config.json");

/// Splits the category box on commas; blank pieces are dropped.
fn category_terms(text: &str) -> Vec<String> {
	text.split(',')
		.map(str::trim)
		.filter(|t| !t.is_empty())
		.map(str::to_owned)
		.collect()
}

fn load_config() -> GraphConfig {
	GraphConfig::from_json(GRAPH_CONFIG).unwrap_or_else(|e| {
		warn!("Ignoring bundled graph config: {e}");
		GraphConfig::default()
	})
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>
			{parse_catalog(SAMPLE_CATALOG)
				.map(|parsed| {
					if parsed.malformed_entries > 0 {
						warn!("Skipped {} malformed catalog entries", parsed.malformed_entries);
					}
					let entries = parsed.entries;
					view! { <RuleExplorer entries /> }
				})}
		</ErrorBoundary>
	}
}

#[component]
fn RuleExplorer(entries: Vec<CatalogEntry>) -> impl IntoView {
	let config = load_config();
	let palette = config.palette.clone();

	let catalog = RwSignal::new(entries);
	let category_text = RwSignal::new(String::new());
	let search = RwSignal::new(String::new());
	let show_drafts = RwSignal::new(true);
	let selected = RwSignal::new(None::<RuleDetails>);
	let category_filter = Signal::derive(move || category_terms(&category_text.get()));

	view! {
		<div class="fullscreen-graph">
			<RuleGraphCanvas
				catalog
				category_filter
				search_term=search
				show_draft_rules=show_drafts
				selected
				config
				fullscreen=true
			/>
			<div class="graph-overlay">
				<h1>"Rule Relationships"</h1>
				<p class="subtitle">
					"Click a rule to trace what it depends on and what depends on it. Drag to move, scroll to zoom."
				</p>
				<div class="graph-controls">
					<input
						type="text"
						placeholder="Categories, comma separated"
						prop:value=move || category_text.get()
						on:input=move |ev| category_text.set(event_target_value(&ev))
					/>
					<input
						type="search"
						placeholder="Search rules"
						prop:value=move || search.get()
						on:input=move |ev| search.set(event_target_value(&ev))
					/>
					<label>
						<input
							type="checkbox"
							prop:checked=move || show_drafts.get()
							on:change=move |ev| show_drafts.set(event_target_checked(&ev))
						/>
						" Show draft rules"
					</label>
				</div>
				<Legend palette />
			</div>
			<DetailsPanel selected />
		</div>
	}
}

#[component]
fn Legend(palette: Palette) -> impl IntoView {
	let entries = [
		(palette.selected, "Selected"),
		(palette.ancestor, "Depends on it"),
		(palette.descendant, "It depends on"),
		(palette.node, "Published"),
		(palette.draft_node, "Draft"),
		(palette.search_match, "Search match"),
	];

	view! {
		<ul class="graph-legend">
			{entries
				.into_iter()
				.map(|(color, text)| {
					view! {
						<li>
							<span class="swatch" style=format!("background: {color};")></span>
							{text}
						</li>
					}
				})
				.collect_view()}
		</ul>
	}
}

#[component]
fn DetailsPanel(selected: RwSignal<Option<RuleDetails>>) -> impl IntoView {
	move || {
		selected.get().map(|details| {
			let status = if details.is_published { "Published" } else { "Draft" };
			view! {
				<aside class="rule-details">
					<button class="close" on:click=move |_| selected.set(None)>"×"</button>
					<h2>{details.label}</h2>
					<p class="rule-name"><code>{details.name}</code></p>
					{details.filepath.map(|path| view! { <p class="rule-path">{path}</p> })}
					{details.description.map(|text| view! { <p>{text}</p> })}
					<p class="rule-status">{status}</p>
					{details
						.review_branch
						.map(|branch| view! { <p class="rule-branch">"Review branch: " {branch}</p> })}
					{details
						.url
						.map(|url| {
							view! {
								<a href=url target="_blank" rel="noopener">
									"Open full record"
								</a>
							}
						})}
				</aside>
			}
		})
	}
}
