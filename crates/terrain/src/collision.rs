//! Keeps the physics height fields and per-chunk bounds in step with the
//! world height texture.

use bevy::prelude::*;

use crate::config::{CHUNK_VERTEX_EDGE, HEIGHTMAP_SCALE_XZ, HEIGHTMAP_SCALE_Y, HEIGHT_MAP_CHUNK_PIXEL_SIZE};
use crate::raster::{PixelRegion, Raster, ReadbackError};
use crate::world::{ChunkAabb, ChunkCoord, TerrainWorld};

/// The physics backend's view of terrain collision.
pub trait HeightFieldPhysics {
    /// Registers a height field of `CHUNK_VERTEX_EDGE` squared normalized
    /// samples whose minimum corner sits at `offset` on the XZ plane.
    fn create_height_field(&mut self, offset: Vec2, samples: &[f32]);

    /// Flags every existing height field for removal on the next physics step.
    fn mark_all_height_fields_for_removal(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeightFieldShape {
    pub offset: Vec2,
    pub samples: Vec<f32>,
    pub marked_for_removal: bool,
}

impl HeightFieldShape {
    /// World-space surface height at a position inside the field.
    pub fn height_at_world_xz(&self, x: f32, z: f32) -> Option<f32> {
        let local = (Vec2::new(x, z) - self.offset) / HEIGHTMAP_SCALE_XZ;
        let edge = CHUNK_VERTEX_EDGE;
        let raster_edge = edge as f32 - 1.0;
        if local.x < 0.0 || local.y < 0.0 || local.x > raster_edge || local.y > raster_edge {
            return None;
        }
        let mut raster = Raster::new(edge, edge);
        raster.upload(&self.samples);
        raster
            .sample_bilinear(local.x, local.y)
            .map(|h| h * HEIGHTMAP_SCALE_Y)
    }
}

/// In-process height field store. Fields marked for removal are dropped by
/// [`flush_height_field_removals`] at the end of the frame.
#[derive(Resource, Debug, Default)]
pub struct HeightFieldRegistry {
    fields: Vec<HeightFieldShape>,
}

impl HeightFieldRegistry {
    pub fn fields(&self) -> &[HeightFieldShape] {
        &self.fields
    }

    pub fn live_fields(&self) -> impl Iterator<Item = &HeightFieldShape> {
        self.fields.iter().filter(|f| !f.marked_for_removal)
    }

    pub fn remove_marked(&mut self) -> usize {
        let before = self.fields.len();
        self.fields.retain(|f| !f.marked_for_removal);
        before - self.fields.len()
    }

    pub fn height_at_world_xz(&self, x: f32, z: f32) -> Option<f32> {
        self.live_fields().find_map(|f| f.height_at_world_xz(x, z))
    }
}

impl HeightFieldPhysics for HeightFieldRegistry {
    fn create_height_field(&mut self, offset: Vec2, samples: &[f32]) {
        self.fields.push(HeightFieldShape {
            offset,
            samples: samples.to_vec(),
            marked_for_removal: false,
        });
    }

    fn mark_all_height_fields_for_removal(&mut self) {
        for field in &mut self.fields {
            field.marked_for_removal = true;
        }
    }
}

pub fn flush_height_field_removals(mut registry: ResMut<HeightFieldRegistry>) {
    if registry.fields.iter().any(|f| f.marked_for_removal) {
        registry.remove_marked();
    }
}

/// Reads the chunk's shared-border sample block from the height texture.
pub fn read_back_chunk(height: &Raster, coord: ChunkCoord) -> Result<Vec<f32>, ReadbackError> {
    height.read_region(PixelRegion::new(
        coord.x * HEIGHT_MAP_CHUNK_PIXEL_SIZE,
        coord.z * HEIGHT_MAP_CHUNK_PIXEL_SIZE,
        CHUNK_VERTEX_EDGE,
        CHUNK_VERTEX_EDGE,
    ))
}

/// World-space bounds of a chunk's normalized samples.
pub fn chunk_aabb(coord: ChunkCoord, samples: &[f32]) -> ChunkAabb {
    let edge = CHUNK_VERTEX_EDGE as usize;
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for (j, sample) in samples.iter().enumerate() {
        let point = Vec3::new(
            ((j % edge) as u32 + coord.x * HEIGHT_MAP_CHUNK_PIXEL_SIZE) as f32 * HEIGHTMAP_SCALE_XZ,
            sample * HEIGHTMAP_SCALE_Y,
            ((j / edge) as u32 + coord.z * HEIGHT_MAP_CHUNK_PIXEL_SIZE) as f32 * HEIGHTMAP_SCALE_XZ,
        );
        min = min.min(point);
        max = max.max(point);
    }
    if samples.is_empty() {
        let origin = coord.world_origin();
        min = Vec3::new(origin.x, 0.0, origin.y);
        max = min;
    }
    ChunkAabb { min, max }
}

/// Rebuilds every chunk's height field and bounds from a full readback.
/// Chunks whose readback fails are logged and keep their previous bounds.
/// Returns the number of height fields created.
pub fn generate_physics_height_fields(
    world: &mut TerrainWorld,
    physics: &mut dyn HeightFieldPhysics,
) -> usize {
    let texture_width = world.height_texture.width();
    let texture_height = world.height_texture.height();
    let chunk_count = world.chunk_count();

    let mut readbacks = Vec::with_capacity(chunk_count);
    for chunk in world.chunks() {
        match read_back_chunk(&world.height_texture, chunk.coord) {
            Ok(samples) => readbacks.push((chunk.coord, samples)),
            Err(err) => error!(
                "Height field readback failed for chunk ({}, {}): {} \
                 [texture {}x{}, offset ({}, {}), region {}x{}, chunks {}x{} ({} total)]",
                chunk.coord.x,
                chunk.coord.z,
                err,
                texture_width,
                texture_height,
                chunk.coord.x * HEIGHT_MAP_CHUNK_PIXEL_SIZE,
                chunk.coord.z * HEIGHT_MAP_CHUNK_PIXEL_SIZE,
                CHUNK_VERTEX_EDGE,
                CHUNK_VERTEX_EDGE,
                world.chunk_count_x(),
                world.chunk_count_z(),
                chunk_count,
            ),
        }
    }

    physics.mark_all_height_fields_for_removal();

    for (coord, samples) in &readbacks {
        if let Some(index) = world.chunk_index(*coord) {
            world.chunks_mut()[index].aabb = chunk_aabb(*coord, samples);
        }
        physics.create_height_field(coord.world_origin(), samples);
    }
    readbacks.len()
}
