use leptos::prelude::*;

/// 404 Not Found Page
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<div class="not-found">
			<h1>"Page not found"</h1>
			<p>
				"Nothing lives at this address. "
				<a href="/">"Back to the rule graph"</a>
			</p>
		</div>
	}
}
