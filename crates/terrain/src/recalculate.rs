//! The full height-map rebuild and the systems that drive terrain passes
//! from events.

use bevy::prelude::*;

use crate::collision::{generate_physics_height_fields, HeightFieldPhysics, HeightFieldRegistry};
use crate::compositor::blit_world_map;
use crate::config::HEIGHT_MAP_CHUNK_PIXEL_SIZE;
use crate::editor::EditorState;
use crate::map::{Map, MapStore};
use crate::mesh_gen::generate_height_map_vertex_data;
use crate::mouse_ray::MouseRayReadback;
use crate::painter::{BrushSettings, PaintInput, PaintOutcome, PaintSession, PaintState};
use crate::raster::{PixelRegion, ReadbackError};
use crate::road_mask::{blit_road_mask, RoadMaskSettings};
use crate::world::{MapInstanceCreateInfo, TerrainWorld};

/// Replace the world's placed maps.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct LoadMapInstances(pub Vec<MapInstanceCreateInfo>);

/// Request a rebuild. `blit_world_map` re-composites the height texture and
/// road mask first; without it only the mesh and collision are regenerated.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecalculateHeightMapData {
    pub blit_world_map: bool,
}

/// Resynchronize collision and chunk bounds without touching the mesh.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncHeightFieldCollision;

/// Sent after every rebuild.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeightMapRecalculated {
    pub blitted_instances: usize,
    pub chunks_generated: usize,
    pub height_fields_created: usize,
}

/// Composite (optionally), rebuild the mesh, then rebuild collision and bounds.
pub fn recalculate_all_height_map_data(
    world: &mut TerrainWorld,
    store: &MapStore,
    physics: &mut dyn HeightFieldPhysics,
    road_settings: &RoadMaskSettings,
    blit: bool,
) -> HeightMapRecalculated {
    let mut report = HeightMapRecalculated::default();
    if blit {
        report.blitted_instances = blit_world_map(world, store);
        world.resnap_roads();
        blit_road_mask(world, road_settings);
    }
    report.chunks_generated = generate_height_map_vertex_data(world);
    report.height_fields_created = generate_physics_height_fields(world, physics);
    report
}

/// Full-resolution readback of `map`'s footprint in the world height texture
/// into the map's host data. The map is read at its first placement, or the
/// world origin when it is not placed.
pub fn read_back_height_map_data(
    world: &TerrainWorld,
    map_index: usize,
    map: &mut Map,
) -> Result<(), ReadbackError> {
    let (offset_x, offset_z) = world
        .map_instances()
        .iter()
        .find(|i| i.map_index == map_index)
        .map(|i| {
            (
                i.spawn_offset_chunk_x * HEIGHT_MAP_CHUNK_PIXEL_SIZE,
                i.spawn_offset_chunk_z * HEIGHT_MAP_CHUNK_PIXEL_SIZE,
            )
        })
        .unwrap_or((0, 0));
    let data = world.height_texture.read_region(PixelRegion::new(
        offset_x,
        offset_z,
        map.texture_width(),
        map.texture_height(),
    ))?;
    map.set_read_back_data(data);
    Ok(())
}

pub fn load_map_instances_system(
    mut events: EventReader<LoadMapInstances>,
    store: Res<MapStore>,
    mut world: ResMut<TerrainWorld>,
    mut recalculate: EventWriter<RecalculateHeightMapData>,
) {
    let Some(LoadMapInstances(infos)) = events.read().last() else {
        return;
    };
    world.load_map_instances(&store, infos);
    recalculate.send(RecalculateHeightMapData {
        blit_world_map: true,
    });
}

pub fn poll_mouse_ray_readback(mut mouse_ray: ResMut<MouseRayReadback>) {
    if mouse_ray.is_in_flight() {
        mouse_ray.poll();
    }
}

pub fn paint_height_map_system(
    mut world: ResMut<TerrainWorld>,
    mut session: ResMut<PaintSession>,
    editor: Res<EditorState>,
    brush: Res<BrushSettings>,
    input: Res<PaintInput>,
    mouse_ray: Res<MouseRayReadback>,
    mut sync: EventWriter<SyncHeightFieldCollision>,
) {
    if !editor.is_height_editing() && session.state() == PaintState::Idle {
        return;
    }
    let outcome = session.update(&mut world, &editor, &brush, *input, &mouse_ray);
    if let PaintOutcome::StrokeFinished { touched } = outcome {
        if !touched.is_empty() {
            sync.send(SyncHeightFieldCollision);
        }
    }
}

pub fn recalculate_height_map_system(
    mut requests: EventReader<RecalculateHeightMapData>,
    store: Res<MapStore>,
    mut world: ResMut<TerrainWorld>,
    mut registry: ResMut<HeightFieldRegistry>,
    road_settings: Res<RoadMaskSettings>,
    mut recalculated: EventWriter<HeightMapRecalculated>,
) {
    let mut requested = false;
    let mut blit = false;
    for request in requests.read() {
        requested = true;
        blit |= request.blit_world_map;
    }
    if !requested {
        return;
    }
    let report = recalculate_all_height_map_data(
        &mut world,
        &store,
        &mut *registry,
        &road_settings,
        blit,
    );
    info!(
        "Recalculated height map: {} instance(s) blitted, {} chunks, {} height fields",
        report.blitted_instances, report.chunks_generated, report.height_fields_created
    );
    recalculated.send(report);
}

pub fn sync_height_field_collision_system(
    mut requests: EventReader<SyncHeightFieldCollision>,
    mut world: ResMut<TerrainWorld>,
    mut registry: ResMut<HeightFieldRegistry>,
) {
    if requests.read().count() == 0 {
        return;
    }
    let created = generate_physics_height_fields(&mut world, &mut *registry);
    info!("Resynchronized {} terrain height fields", created);
}
