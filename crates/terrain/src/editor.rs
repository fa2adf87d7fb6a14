use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    MapHeightEditor,
    MapObjectEditor,
}

/// Whether the map editor is open and which tool set it is showing.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditorState {
    pub open: bool,
    pub mode: EditorMode,
}

impl EditorState {
    pub fn is_height_editing(&self) -> bool {
        self.open && self.mode == EditorMode::MapHeightEditor
    }

    /// Chunks are only frustum culled outside the editor.
    pub fn culling_enabled(&self) -> bool {
        !self.open
    }

    pub fn toggle_height_editor(&mut self) {
        if self.is_height_editing() {
            self.open = false;
        } else {
            self.open = true;
            self.mode = EditorMode::MapHeightEditor;
        }
    }
}
