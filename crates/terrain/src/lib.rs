use bevy::prelude::*;

pub mod collision;
pub mod compositor;
pub mod config;
pub mod editor;
pub mod map;
pub mod mesh_gen;
pub mod mouse_ray;
pub mod painter;
pub mod raster;
pub mod readback;
pub mod recalculate;
pub mod road;
pub mod road_mask;
pub mod world;

#[cfg(test)]
pub mod test_harness;

use collision::{flush_height_field_removals, HeightFieldRegistry};
use editor::EditorState;
use map::MapStore;
use mouse_ray::MouseRayReadback;
use painter::{BrushSettings, PaintInput, PaintSession};
use recalculate::{
    load_map_instances_system, paint_height_map_system, poll_mouse_ray_readback,
    recalculate_height_map_system, sync_height_field_collision_system, HeightMapRecalculated,
    LoadMapInstances, RecalculateHeightMapData, SyncHeightFieldCollision,
};
use road_mask::RoadMaskSettings;
use world::TerrainWorld;

/// Ordering of the per-frame terrain work. Input producers (cursor rays,
/// mouse buttons) belong in `Input`; consumers of rebuilt terrain run after
/// `Rebuild`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerrainSet {
    Input,
    Paint,
    Rebuild,
}

pub struct TerrainPlugin;

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MapStore>()
            .init_resource::<TerrainWorld>()
            .init_resource::<HeightFieldRegistry>()
            .init_resource::<EditorState>()
            .init_resource::<BrushSettings>()
            .init_resource::<RoadMaskSettings>()
            .init_resource::<PaintInput>()
            .init_resource::<PaintSession>()
            .init_resource::<MouseRayReadback>()
            .add_event::<LoadMapInstances>()
            .add_event::<RecalculateHeightMapData>()
            .add_event::<SyncHeightFieldCollision>()
            .add_event::<HeightMapRecalculated>()
            .configure_sets(
                Update,
                (TerrainSet::Input, TerrainSet::Paint, TerrainSet::Rebuild).chain(),
            )
            .add_systems(
                Update,
                (
                    poll_mouse_ray_readback.in_set(TerrainSet::Input),
                    paint_height_map_system.in_set(TerrainSet::Paint),
                    (
                        load_map_instances_system,
                        recalculate_height_map_system,
                        sync_height_field_collision_system,
                    )
                        .chain()
                        .in_set(TerrainSet::Rebuild),
                ),
            )
            .add_systems(PostUpdate, flush_height_field_removals);
    }
}
