use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use save::SaveMapEvent;
use terrain::config::HEIGHTMAP_SCALE_Y;
use terrain::editor::{EditorMode, EditorState};
use terrain::map::MapStore;
use terrain::painter::BrushSettings;
use terrain::recalculate::RecalculateHeightMapData;
use terrain::road_mask::RoadMaskSettings;
use terrain::world::TerrainWorld;

use crate::brush_input::placed_map_names;

/// Editor window: brush parameters, road mask shaping and map actions.
#[allow(clippy::too_many_arguments)]
pub fn height_editor_panel(
    mut contexts: EguiContexts,
    mut editor: ResMut<EditorState>,
    mut brush: ResMut<BrushSettings>,
    mut road: ResMut<RoadMaskSettings>,
    world: Res<TerrainWorld>,
    store: Res<MapStore>,
    mut recalculate: EventWriter<RecalculateHeightMapData>,
    mut save: EventWriter<SaveMapEvent>,
) {
    if !editor.open {
        return;
    }

    let mut open = true;
    let mut mode = editor.mode;
    let mut next_brush = *brush;
    let mut next_road = *road;
    let mut rebuild = false;
    let mut save_clicked = false;

    egui::Window::new("Map Editor")
        .open(&mut open)
        .resizable(false)
        .default_width(280.0)
        .show(contexts.ctx_mut(), |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut mode, EditorMode::MapHeightEditor, "Height");
                ui.selectable_value(&mut mode, EditorMode::MapObjectEditor, "Objects");
            });
            ui.separator();

            if mode == EditorMode::MapHeightEditor {
                ui.heading("Brush");
                ui.add(egui::Slider::new(&mut next_brush.size, 1.0..=128.0).text("Size (texels)"));
                ui.add(egui::Slider::new(&mut next_brush.strength, 0.0..=10.0).text("Strength"));
                ui.add(
                    egui::Slider::new(&mut next_brush.noise_strength, 0.0..=1.0)
                        .text("Noise strength"),
                );
                ui.add(
                    egui::Slider::new(&mut next_brush.noise_scale, 0.01..=4.0).text("Noise scale"),
                );
                ui.add(
                    egui::Slider::new(&mut next_brush.min_paint_height, 0.0..=HEIGHTMAP_SCALE_Y)
                        .text("Min height"),
                );
                ui.add(
                    egui::Slider::new(&mut next_brush.max_paint_height, 0.0..=HEIGHTMAP_SCALE_Y)
                        .text("Max height"),
                );
                ui.label(
                    egui::RichText::new("Left mouse raises, right mouse lowers")
                        .color(egui::Color32::from_rgb(160, 160, 160))
                        .size(10.0),
                );
                ui.separator();
            }

            ui.heading("Road");
            ui.add(egui::Slider::new(&mut next_road.road_width, 0.5..=16.0).text("Width (m)"));
            ui.add(egui::Slider::new(&mut next_road.feather, 0.0..=4.0).text("Feather (m)"));
            ui.add(egui::Slider::new(&mut next_road.exponent, 0.1..=8.0).text("Exponent"));
            ui.separator();

            ui.horizontal(|ui| {
                if ui.button("Recalculate").clicked() {
                    rebuild = true;
                }
                if ui.button("Save").clicked() {
                    save_clicked = true;
                }
            });
        });

    if !open {
        editor.open = false;
    }
    if mode != editor.mode {
        editor.mode = mode;
    }
    if next_brush.min_paint_height > next_brush.max_paint_height {
        next_brush.min_paint_height = next_brush.max_paint_height;
    }
    brush.set_if_neq(next_brush);
    if road.set_if_neq(next_road) {
        rebuild = true;
    }
    if rebuild {
        recalculate.send(RecalculateHeightMapData {
            blit_world_map: true,
        });
    }
    if save_clicked {
        for map_name in placed_map_names(&world, &store) {
            save.send(SaveMapEvent { map_name });
        }
    }
}
