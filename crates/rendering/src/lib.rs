use bevy::prelude::*;
use bevy::render::view::RenderLayers;

use terrain::config::MAX_VIEWPORTS;
use terrain::recalculate::poll_mouse_ray_readback;
use terrain::TerrainSet;

pub mod brush_input;
pub mod brush_panel;
pub mod camera;
pub mod chunk_meshes;
pub mod chunk_renderer;
pub mod egui_input_guard;
pub mod mouse_ray;
pub mod terrain_material;

use camera::{viewport_render_layer, CameraDragState};
use chunk_renderer::HeightMapDrawList;
use terrain_material::TerrainMaterial;

/// Draws the terrain and feeds editor input (cursor ray, brush buttons,
/// shortcuts) into the terrain systems.
pub struct TerrainRenderPlugin;

impl Plugin for TerrainRenderPlugin {
    fn build(&self, app: &mut App) {
        terrain_material::load_terrain_shader(app);
        app.add_plugins(MaterialPlugin::<TerrainMaterial>::default())
            .init_resource::<CameraDragState>()
            .init_resource::<HeightMapDrawList>()
            .add_systems(
                Startup,
                (
                    camera::setup_camera,
                    setup_lighting,
                    terrain_material::setup_terrain_material,
                ),
            )
            .add_systems(
                Update,
                (
                    brush_input::toggle_height_editor,
                    brush_input::update_paint_input,
                    mouse_ray::submit_mouse_ray.after(poll_mouse_ray_readback),
                )
                    .in_set(TerrainSet::Input),
            )
            .add_systems(
                Update,
                (
                    camera::camera_keyboard,
                    camera::camera_mouse_drag,
                    camera::camera_zoom,
                    camera::apply_orbit_camera,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    brush_panel::height_editor_panel,
                    brush_input::save_shortcut,
                )
                    .before(TerrainSet::Input),
            )
            .add_systems(
                Update,
                (
                    chunk_meshes::sync_chunk_meshes,
                    chunk_renderer::update_height_map_draw_list,
                    chunk_meshes::apply_draw_list_visibility,
                    terrain_material::sync_road_mask_texture,
                    terrain_material::update_texture_scaling,
                )
                    .chain()
                    .after(TerrainSet::Rebuild),
            );
    }
}

fn setup_lighting(mut commands: Commands) {
    let light_layers: Vec<usize> = std::iter::once(0)
        .chain((0..MAX_VIEWPORTS).map(viewport_render_layer))
        .collect();
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.9, 0.9, 1.0),
        brightness: 300.0,
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::XYZ,
            -std::f32::consts::FRAC_PI_4,
            std::f32::consts::FRAC_PI_6,
            0.0,
        )),
        // Lights every viewport's terrain layer.
        RenderLayers::from_layers(&light_layers),
    ));
}
