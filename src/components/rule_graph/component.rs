use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, error};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent, Window};

use super::config::GraphConfig;
use super::filter::FilterParams;
use super::interaction::{Input, Key, Outcome, Selection};
use super::render;
use super::simulation::FRAME_DT;
use super::state::RuleGraphState;
use super::types::{CatalogEntry, RuleDetails, Viewport};

/// Longest frame gap fed to the simulation, in seconds.
const MAX_FRAME_GAP: f64 = 0.1;

/// Forwards state-machine notifications to the host's selection signal.
fn publish(outcome: Option<Outcome>, selected: RwSignal<Option<RuleDetails>>) {
	match outcome {
		Some(Outcome::Activated(details)) => selected.set(Some(details)),
		Some(Outcome::Deselected) => selected.set(None),
		_ => {}
	}
}

fn canvas_size(canvas: &HtmlCanvasElement, window: &Window, fullscreen: bool, width: Option<f64>, height: Option<f64>) -> (f64, f64) {
	if fullscreen {
		let dim = |v: Result<JsValue, JsValue>, fallback| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
		return (dim(window.inner_width(), 800.0), dim(window.inner_height(), 600.0));
	}
	(
		width.unwrap_or_else(|| {
			canvas
				.parent_element()
				.map(|p| p.client_width() as f64)
				.unwrap_or(800.0)
		}),
		height.unwrap_or_else(|| {
			canvas
				.parent_element()
				.map(|p| p.client_height() as f64)
				.unwrap_or(600.0)
		}),
	)
}

fn pointer_position(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

#[component]
pub fn RuleGraphCanvas(
	#[prop(into)] catalog: Signal<Vec<CatalogEntry>>,
	#[prop(into)] category_filter: Signal<Vec<String>>,
	#[prop(into)] search_term: Signal<String>,
	#[prop(into)] show_draft_rules: Signal<bool>,
	/// Details of the activated rule; cleared on deselection. Writing `None`
	/// from outside deselects.
	selected: RwSignal<Option<RuleDetails>>,
	#[prop(optional)] config: Option<GraphConfig>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let params = Memo::new(move |_| FilterParams {
		category_filter: category_filter.get(),
		search_term: search_term.get(),
		show_draft_rules: show_draft_rules.get(),
	});
	let state = Rc::new(RefCell::new(RuleGraphState::new(
		&catalog.get_untracked(),
		params.get_untracked(),
		Viewport::default(),
		config.unwrap_or_default(),
	)));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if animate_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			error!("No window available, graph canvas not started");
			return;
		};

		let (w, h) = canvas_size(&canvas, &window, fullscreen, width, height);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		state_init.borrow_mut().resize(w, h);

		let ctx: CanvasRenderingContext2d = match canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into().ok())
		{
			Some(ctx) => ctx,
			None => {
				error!("Canvas 2d context unavailable");
				return;
			}
		};

		{
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = canvas_size(&canvas_resize, &win, fullscreen, width, height);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				state_resize.borrow_mut().resize(nw, nh);
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner, resize_inner) =
			(state_init.clone(), animate_init.clone(), resize_cb_init.clone());
		let last_frame = Cell::new(None::<f64>);
		*animate_init.borrow_mut() = Some(Closure::new(move |now: f64| {
			if !canvas.is_connected() {
				// Torn down: no more position writes, no more frames.
				state_anim.borrow_mut().stop();
				if let (Some(win), Some(cb)) = (web_sys::window(), resize_inner.borrow_mut().take()) {
					let _ = win.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
				}
				let _ = animate_inner.borrow_mut().take();
				debug!("Graph canvas detached, animation stopped");
				return;
			}

			let dt = last_frame
				.replace(Some(now))
				.map_or(FRAME_DT, |prev| ((now - prev) / 1000.0).clamp(0.0, MAX_FRAME_GAP));
			{
				let mut s = state_anim.borrow_mut();
				s.tick(dt);
				let frame = s.frame();
				render::render(&frame, s.flow_time, s.viewport.width, s.viewport.height, &ctx);
			}

			if let (Some(win), Some(cb)) = (web_sys::window(), animate_inner.borrow().as_ref()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_catalog = state.clone();
	Effect::new(move |prev: Option<()>| {
		let entries = catalog.get();
		if prev.is_none() {
			return;
		}
		let outcome = state_catalog
			.borrow_mut()
			.rebuild(&entries, params.get_untracked());
		publish(outcome, selected);
	});

	let state_filter = state.clone();
	Effect::new(move |_| {
		let params = params.get();
		let outcome = state_filter.borrow_mut().set_filter(params);
		publish(outcome, selected);
	});

	// The selection signal is shared with the host; follow writes made there.
	let state_selected = state.clone();
	Effect::new(move |_| {
		let wanted = selected.get().map(|d| d.id);
		let current = match state_selected.borrow().interaction.selection() {
			Selection::NodeSelected(id) => Some(id),
			Selection::Idle => None,
		};
		if wanted == current {
			return;
		}
		let input = match wanted {
			Some(id) => Input::NodeClick(id),
			None => Input::BackgroundClick,
		};
		let outcome = state_selected.borrow_mut().handle(input);
		match outcome {
			Some(outcome) => publish(Some(outcome), selected),
			// Asked for a rule that is not drawn.
			None if wanted.is_some() => selected.set(None),
			None => {}
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else {
			return;
		};
		state_md.borrow_mut().pointer_down(x, y);
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else {
			return;
		};
		state_mm.borrow_mut().pointer_move(x, y);
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		let outcome = state_mu.borrow_mut().pointer_up();
		publish(outcome, selected);
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		state_ml.borrow_mut().pointer_leave();
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else {
			return;
		};
		state_wh.borrow_mut().wheel(x, y, ev.delta_y());
	};

	let state_kd = state.clone();
	let on_keydown = move |ev: KeyboardEvent| {
		let Some(key) = Key::from_event_key(&ev.key(), ev.shift_key()) else {
			return;
		};
		let outcome = state_kd.borrow_mut().key(key);
		// Past the last node, Tab falls through to the browser's focus order.
		if outcome != Some(Outcome::FocusReleased) {
			ev.prevent_default();
		}
		publish(outcome, selected);
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="rule-graph-canvas"
			tabindex="0"
			role="application"
			aria-label="Rule relationship graph. Tab through rules, Enter to select, arrows to pan, plus and minus to zoom."
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			on:keydown=on_keydown
			style="display: block; cursor: grab; outline: none;"
		/>
	}
}
