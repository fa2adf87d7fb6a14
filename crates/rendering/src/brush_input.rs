use bevy::prelude::*;
use bevy_egui::EguiContexts;

use save::SaveMapEvent;
use terrain::editor::EditorState;
use terrain::map::MapStore;
use terrain::painter::PaintInput;
use terrain::world::TerrainWorld;

use crate::egui_input_guard::egui_wants_pointer;

/// Mirrors the mouse buttons into `PaintInput`. Left raises, right lowers.
pub fn update_paint_input(
    buttons: Res<ButtonInput<MouseButton>>,
    mut contexts: EguiContexts,
    mut input: ResMut<PaintInput>,
) {
    let next = PaintInput {
        primary_down: buttons.pressed(MouseButton::Left),
        secondary_down: buttons.pressed(MouseButton::Right),
        ui_owns_mouse: egui_wants_pointer(&mut contexts),
    };
    input.set_if_neq(next);
}

/// F2 opens or closes the height editor.
pub fn toggle_height_editor(keys: Res<ButtonInput<KeyCode>>, mut editor: ResMut<EditorState>) {
    if keys.just_pressed(KeyCode::F2) {
        editor.toggle_height_editor();
        info!(
            "Height editor {}",
            if editor.is_height_editing() { "opened" } else { "closed" }
        );
    }
}

/// Names of every map placed in the world, each listed once.
pub fn placed_map_names(world: &TerrainWorld, store: &MapStore) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for instance in world.map_instances() {
        if let Some(map) = store.get_by_index(instance.map_index) {
            if !names.iter().any(|n| n == map.name()) {
                names.push(map.name().to_string());
            }
        }
    }
    names
}

/// Ctrl+S saves every placed map.
pub fn save_shortcut(
    keys: Res<ButtonInput<KeyCode>>,
    world: Res<TerrainWorld>,
    store: Res<MapStore>,
    mut save: EventWriter<SaveMapEvent>,
) {
    let ctrl = keys.pressed(KeyCode::ControlLeft) || keys.pressed(KeyCode::ControlRight);
    if ctrl && keys.just_pressed(KeyCode::KeyS) {
        for map_name in placed_map_names(&world, &store) {
            save.send(SaveMapEvent { map_name });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrain::world::MapInstanceCreateInfo;

    #[test]
    fn test_placed_map_names_are_unique() {
        let mut store = MapStore::default();
        store.new_map("a", 1, 1, 0.0);
        store.new_map("b", 1, 1, 0.0);
        store.new_map("unused", 1, 1, 0.0);
        let mut world = TerrainWorld::default();
        world.load_map_instances(
            &store,
            &[
                MapInstanceCreateInfo::new("a", 0, 0),
                MapInstanceCreateInfo::new("b", 1, 0),
                MapInstanceCreateInfo::new("a", 2, 0),
            ],
        );
        assert_eq!(placed_map_names(&world, &store), vec!["a", "b"]);
    }
}
