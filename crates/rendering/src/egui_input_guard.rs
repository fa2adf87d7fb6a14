//! Egui input guard: keeps brush strokes from landing on terrain under a panel.
//!
//! When egui is handling the pointer (hovering the editor panel or dragging
//! one of its sliders), world input systems must not act on the click.

use bevy_egui::EguiContexts;

/// Returns `true` when the cursor is over an egui area or egui is handling
/// a drag or click.
#[inline]
pub fn egui_wants_pointer(contexts: &mut EguiContexts) -> bool {
    let ctx = contexts.ctx_mut();
    ctx.wants_pointer_input() || ctx.is_pointer_over_area()
}
