use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::interaction::Role;
use super::style::{Frame, StyledLink, StyledNode};

/// Draws one frame: links first, then dimmed nodes, then emphasized nodes on top.
pub fn render(frame: &Frame, flow_time: f64, width: f64, height: f64, ctx: &CanvasRenderingContext2d) {
	ctx.set_global_alpha(1.0);
	ctx.set_fill_style_str(&frame.background);
	ctx.fill_rect(0.0, 0.0, width, height);
	ctx.save();
	let _ = ctx.translate(frame.transform.x, frame.transform.y);
	let _ = ctx.scale(frame.transform.k, frame.transform.k);
	for link in &frame.links {
		draw_link(link, frame.transform.k, flow_time, ctx);
	}
	for node in frame.nodes.iter().filter(|n| !n.is_foreground()) {
		draw_node(node, frame, ctx);
	}
	for node in frame.nodes.iter().filter(|n| n.is_foreground()) {
		draw_node(node, frame, ctx);
	}
	ctx.restore();
	ctx.set_global_alpha(1.0);
}

fn draw_link(link: &StyledLink, k: f64, flow_time: f64, ctx: &CanvasRenderingContext2d) {
	let ((x1, y1), (x2, y2)) = (link.from, link.to);
	let (dx, dy) = (x2 - x1, y2 - y1);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < link.source_radius + link.target_radius {
		return;
	}
	let arrow_size = (6.0 + 2.0 * link.width) / k.max(0.5);
	let (ux, uy) = (dx / dist, dy / dist);

	ctx.set_global_alpha(link.opacity);
	ctx.set_stroke_style_str(&link.color);
	ctx.set_line_width(link.width / k.max(0.5));
	if link.dashed {
		let (dash, gap) = (8.0 / k, 4.0 / k);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(-(flow_time * 30.0) % (dash + gap));
	}
	ctx.begin_path();
	ctx.move_to(x1 + ux * link.source_radius, y1 + uy * link.source_radius);
	ctx.line_to(
		x2 - ux * (link.target_radius + arrow_size),
		y2 - uy * (link.target_radius + arrow_size),
	);
	ctx.stroke();
	if link.dashed {
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	}

	ctx.set_fill_style_str(&link.color);
	let (tip_x, tip_y) = (x2 - ux * link.target_radius, y2 - uy * link.target_radius);
	let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
	let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
	ctx.begin_path();
	ctx.move_to(tip_x, tip_y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_node(node: &StyledNode, frame: &Frame, ctx: &CanvasRenderingContext2d) {
	let (x, y, radius, k) = (node.x, node.y, node.radius, frame.transform.k);

	let glow = matches!(node.role, Some(Role::Selected)) || node.hovered;
	if glow {
		let glow_radius = radius * 2.4;
		if let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius) {
			let _ = gradient.add_color_stop(0.0, "rgba(255, 255, 255, 0.35)");
			let _ = gradient.add_color_stop(0.6, "rgba(200, 220, 255, 0.1)");
			let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
			ctx.set_global_alpha(1.0);
			ctx.begin_path();
			let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
			ctx.fill();
		}
	}

	ctx.set_global_alpha(node.opacity);
	ctx.begin_path();
	let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(&node.fill);
	ctx.fill();

	if node.draft {
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(2.0 / k),
			&JsValue::from_f64(2.0 / k),
		));
		ctx.set_stroke_style_str(&frame.label_color);
		ctx.set_line_width(1.0 / k);
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	}

	if let Some(stroke) = &node.stroke {
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(stroke);
		ctx.set_line_width(2.0 / k);
		ctx.stroke();
	}

	if node.focused {
		ctx.set_global_alpha(1.0);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius + 5.0 / k, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(&frame.focus_ring);
		ctx.set_line_width(1.5 / k);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(3.0 / k),
			&JsValue::from_f64(3.0 / k),
		));
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	}

	if let Some(label) = &node.label {
		ctx.set_global_alpha(node.opacity.max(0.3));
		ctx.set_fill_style_str(&frame.label_color);
		ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
		let _ = ctx.fill_text(label, x + radius + 3.0, y + 3.0);
	}
}
