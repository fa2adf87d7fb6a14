use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use terrain::editor::EditorState;
use terrain::mouse_ray::MouseRayReadback;
use terrain::world::TerrainWorld;

use crate::camera::TerrainViewport;

/// Casts the cursor ray of whichever viewport the cursor is over. At most one
/// query is in flight; a new one starts only after the previous one landed.
pub fn submit_mouse_ray(
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<TerrainViewport>>,
    editor: Res<EditorState>,
    world: Res<TerrainWorld>,
    mut readback: ResMut<MouseRayReadback>,
) {
    if !editor.is_height_editing() || readback.is_in_flight() {
        return;
    }
    let Ok(window) = windows.get_single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };

    for (camera, transform) in &cameras {
        let viewport_origin = match camera.logical_viewport_rect() {
            Some(rect) if rect.contains(cursor) => rect.min,
            Some(_) => continue,
            None => Vec2::ZERO,
        };
        let Ok(ray) = camera.viewport_to_world(transform, cursor - viewport_origin) else {
            continue;
        };
        readback.submit(&world.height_texture, ray.origin, *ray.direction);
        return;
    }
}
