//! Composites every placed map into the world height texture.

use bevy::prelude::*;

use crate::config::{HEIGHT_MAP_CHUNK_PIXEL_SIZE, ROAD_MASK_SCALE};
use crate::map::MapStore;
use crate::raster::PixelRegion;
use crate::world::TerrainWorld;

/// Blits each instance's map texture at its chunk offset, in placement
/// order, so later instances overwrite earlier ones where they overlap.
/// The world's outermost row and column are copied from their neighbours
/// since no map covers them. Returns the number of instances blitted.
pub fn blit_world_map(world: &mut TerrainWorld, store: &MapStore) -> usize {
    let width = world.texture_width();
    let height = world.texture_height();
    if world.chunk_count() == 0 {
        return 0;
    }

    if world.height_texture.width() != width || world.height_texture.height() != height {
        info!("Resizing world height texture to {}x{}", width, height);
        world.height_texture.resize(width, height);
        world
            .road_mask
            .resize(width * ROAD_MASK_SCALE, height * ROAD_MASK_SCALE);
    }

    let mut blitted = 0;
    for instance in world.map_instances().to_vec() {
        let Some(map) = store.get(instance.map_index) else {
            warn!(
                "blit_world_map: map index {} no longer exists",
                instance.map_index
            );
            continue;
        };
        let source = map.texture();
        let offset_x = instance.spawn_offset_chunk_x * HEIGHT_MAP_CHUNK_PIXEL_SIZE;
        let offset_z = instance.spawn_offset_chunk_z * HEIGHT_MAP_CHUNK_PIXEL_SIZE;
        let region = PixelRegion::new(offset_x, offset_z, source.width(), source.height());
        world.height_texture.dispatch(region, |x, z, _| {
            source.texel_clamped((x - offset_x) as i64, (z - offset_z) as i64)
        });
        blitted += 1;
    }

    replicate_far_edges(world);
    blitted
}

fn replicate_far_edges(world: &mut TerrainWorld) {
    let texture = &mut world.height_texture;
    let last_x = texture.width() - 1;
    let last_z = texture.height() - 1;
    let column: Vec<f32> = (0..texture.height())
        .map(|z| texture.texel_clamped(last_x as i64 - 1, z as i64))
        .collect();
    texture.dispatch(PixelRegion::new(last_x, 0, 1, texture.height()), |_, z, _| {
        column[z as usize]
    });
    let row: Vec<f32> = (0..texture.width())
        .map(|x| texture.texel_clamped(x as i64, last_z as i64 - 1))
        .collect();
    texture.dispatch(PixelRegion::new(0, last_z, texture.width(), 1), |x, _, _| {
        row[x as usize]
    });
}
