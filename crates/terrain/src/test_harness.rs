//! # TestTerrain: headless harness for terrain integration tests
//!
//! Wraps a `bevy::app::App` with `MinimalPlugins` + `TerrainPlugin` so maps
//! can be created, placed and edited through the same events and systems
//! the editor uses.

use bevy::app::App;
use bevy::prelude::*;

use crate::collision::HeightFieldRegistry;
use crate::editor::{EditorMode, EditorState};
use crate::map::MapStore;
use crate::mouse_ray::MouseRayReadback;
use crate::painter::{BrushSettings, PaintInput};
use crate::recalculate::{HeightMapRecalculated, LoadMapInstances};
use crate::world::{ChunkCoord, HeightMapChunk, MapInstanceCreateInfo, TerrainWorld};
use crate::TerrainPlugin;

pub struct TestTerrain {
    app: App,
}

impl Default for TestTerrain {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTerrain {
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(TerrainPlugin);
        Self { app }
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    pub fn with_map(mut self, name: &str, chunk_count_x: u32, chunk_count_z: u32, height: f32) -> Self {
        self.app
            .world_mut()
            .resource_mut::<MapStore>()
            .new_map(name, chunk_count_x, chunk_count_z, height);
        self
    }

    /// Places maps through `LoadMapInstances` and runs one frame so the
    /// full rebuild completes.
    pub fn with_instances(mut self, instances: &[(&str, u32, u32)]) -> Self {
        self.load_instances(instances);
        self
    }

    pub fn with_brush(mut self, brush: BrushSettings) -> Self {
        self.app.insert_resource(brush);
        self
    }

    pub fn load_instances(&mut self, instances: &[(&str, u32, u32)]) {
        let infos = instances
            .iter()
            .map(|(name, x, z)| MapInstanceCreateInfo::new(name, *x, *z))
            .collect();
        self.app.world_mut().send_event(LoadMapInstances(infos));
        self.tick(1);
    }

    // -----------------------------------------------------------------------
    // Editor input
    // -----------------------------------------------------------------------

    pub fn open_height_editor(&mut self) {
        *self.app.world_mut().resource_mut::<EditorState>() = EditorState {
            open: true,
            mode: EditorMode::MapHeightEditor,
        };
    }

    pub fn set_cursor_hit(&mut self, hit: Option<Vec3>) {
        self.app
            .world_mut()
            .resource_mut::<MouseRayReadback>()
            .set_result(hit);
    }

    pub fn set_mouse(&mut self, primary_down: bool, secondary_down: bool) {
        let mut input = self.app.world_mut().resource_mut::<PaintInput>();
        input.primary_down = primary_down;
        input.secondary_down = secondary_down;
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.update();
            std::thread::yield_now();
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world(&self) -> &TerrainWorld {
        self.app.world().resource::<TerrainWorld>()
    }

    pub fn world_mut(&mut self) -> Mut<'_, TerrainWorld> {
        self.app.world_mut().resource_mut::<TerrainWorld>()
    }

    pub fn registry(&self) -> &HeightFieldRegistry {
        self.app.world().resource::<HeightFieldRegistry>()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn chunk(&self, x: u32, z: u32) -> &HeightMapChunk {
        self.world()
            .chunk(ChunkCoord::new(x, z))
            .unwrap_or_else(|| panic!("chunk ({x}, {z}) does not exist"))
    }

    /// Drains `HeightMapRecalculated` events sent since the last call.
    pub fn recalculated_events(&mut self) -> Vec<HeightMapRecalculated> {
        self.app
            .world_mut()
            .resource_mut::<Events<HeightMapRecalculated>>()
            .drain()
            .collect()
    }
}
