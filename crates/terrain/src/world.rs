//! The loaded world: placed map instances, the chunk list derived from them
//! and the world-sized textures and mesh buffer every pass writes into.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::config::{
    CHUNK_WORLD_SPACE_SIZE, HEIGHTMAP_SCALE_XZ, HEIGHTMAP_SCALE_Y, HEIGHT_MAP_CHUNK_PIXEL_SIZE,
    INDICES_PER_CHUNK, VERTICES_PER_CHUNK,
};
use crate::map::MapStore;
use crate::mesh_gen::TerrainMesh;
use crate::raster::Raster;
use crate::road::{Road, RoadCurveType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChunkCoord {
    pub x: u32,
    pub z: u32,
}

impl ChunkCoord {
    pub const fn new(x: u32, z: u32) -> Self {
        Self { x, z }
    }

    /// World-space position of the chunk's minimum corner on the XZ plane.
    pub fn world_origin(&self) -> Vec2 {
        Vec2::new(
            self.x as f32 * CHUNK_WORLD_SPACE_SIZE,
            self.z as f32 * CHUNK_WORLD_SPACE_SIZE,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChunkAabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl ChunkAabb {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeightMapChunk {
    pub coord: ChunkCoord,
    pub base_vertex: u32,
    pub base_index: u32,
    pub aabb: ChunkAabb,
}

impl HeightMapChunk {
    /// Placeholder bounds until the first collision sync reads real heights.
    fn flat_aabb(coord: ChunkCoord) -> ChunkAabb {
        let origin = coord.world_origin();
        ChunkAabb {
            min: Vec3::new(origin.x, 0.0, origin.y),
            max: Vec3::new(
                origin.x + CHUNK_WORLD_SPACE_SIZE,
                0.0,
                origin.y + CHUNK_WORLD_SPACE_SIZE,
            ),
        }
    }
}

/// Where to place a named map, in chunk units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapInstanceCreateInfo {
    pub map_name: String,
    pub spawn_offset_chunk_x: u32,
    pub spawn_offset_chunk_z: u32,
}

impl MapInstanceCreateInfo {
    pub fn new(map_name: &str, spawn_offset_chunk_x: u32, spawn_offset_chunk_z: u32) -> Self {
        Self {
            map_name: map_name.to_string(),
            spawn_offset_chunk_x,
            spawn_offset_chunk_z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapInstance {
    pub map_index: usize,
    pub spawn_offset_chunk_x: u32,
    pub spawn_offset_chunk_z: u32,
}

#[derive(Resource, Debug, Default)]
pub struct TerrainWorld {
    map_instances: Vec<MapInstance>,
    chunk_count_x: u32,
    chunk_count_z: u32,
    chunks: Vec<HeightMapChunk>,
    chunk_lookup: HashMap<ChunkCoord, usize>,
    pub height_texture: Raster,
    pub road_mask: Raster,
    pub mesh: TerrainMesh,
    pub roads: Vec<Road>,
}

impl TerrainWorld {
    /// Drops every instance and chunk. Textures, roads and the mesh buffer
    /// keep their allocation.
    pub fn reset(&mut self) {
        self.map_instances.clear();
        self.chunks.clear();
        self.chunk_lookup.clear();
        self.chunk_count_x = 0;
        self.chunk_count_z = 0;
    }

    /// Replaces the placed instances and rebuilds extents and the chunk list.
    /// Instances naming unknown maps are skipped. Returns the chunk count.
    pub fn load_map_instances(&mut self, store: &MapStore, infos: &[MapInstanceCreateInfo]) -> usize {
        self.reset();

        for info in infos {
            let Some(map_index) = store.index_of(&info.map_name) else {
                error!(
                    "TerrainWorld::load_map_instances: no map named \"{}\"",
                    info.map_name
                );
                continue;
            };
            self.map_instances.push(MapInstance {
                map_index,
                spawn_offset_chunk_x: info.spawn_offset_chunk_x,
                spawn_offset_chunk_z: info.spawn_offset_chunk_z,
            });
        }

        for instance in &self.map_instances {
            let Some(map) = store.get(instance.map_index) else {
                continue;
            };
            self.chunk_count_x = self
                .chunk_count_x
                .max(instance.spawn_offset_chunk_x + map.chunk_count_x());
            self.chunk_count_z = self
                .chunk_count_z
                .max(instance.spawn_offset_chunk_z + map.chunk_count_z());
        }

        let mut base_vertex = 0u32;
        let mut base_index = 0u32;
        for x in 0..self.chunk_count_x {
            for z in 0..self.chunk_count_z {
                let coord = ChunkCoord::new(x, z);
                self.chunk_lookup.insert(coord, self.chunks.len());
                self.chunks.push(HeightMapChunk {
                    coord,
                    base_vertex,
                    base_index,
                    aabb: HeightMapChunk::flat_aabb(coord),
                });
                base_vertex += VERTICES_PER_CHUNK as u32;
                base_index += INDICES_PER_CHUNK as u32;
            }
        }

        info!(
            "Loaded {} map instance(s): {}x{} chunks",
            self.map_instances.len(),
            self.chunk_count_x,
            self.chunk_count_z
        );
        self.chunks.len()
    }

    /// Places a single map at the world origin.
    pub fn load_map_instance(&mut self, store: &MapStore, map_name: &str) -> usize {
        self.load_map_instances(store, &[MapInstanceCreateInfo::new(map_name, 0, 0)])
    }

    pub fn map_instances(&self) -> &[MapInstance] {
        &self.map_instances
    }

    pub fn chunk_count_x(&self) -> u32 {
        self.chunk_count_x
    }

    pub fn chunk_count_z(&self) -> u32 {
        self.chunk_count_z
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> &[HeightMapChunk] {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut [HeightMapChunk] {
        &mut self.chunks
    }

    pub fn chunk_exists(&self, coord: ChunkCoord) -> bool {
        self.chunk_lookup.contains_key(&coord)
    }

    pub fn chunk_index(&self, coord: ChunkCoord) -> Option<usize> {
        self.chunk_lookup.get(&coord).copied()
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&HeightMapChunk> {
        self.chunk_index(coord).map(|i| &self.chunks[i])
    }

    /// Height texture size: one texel per grid vertex, so one more than the chunk span.
    pub fn texture_width(&self) -> u32 {
        self.chunk_count_x * HEIGHT_MAP_CHUNK_PIXEL_SIZE + 1
    }

    pub fn texture_height(&self) -> u32 {
        self.chunk_count_z * HEIGHT_MAP_CHUNK_PIXEL_SIZE + 1
    }

    pub fn world_space_width(&self) -> f32 {
        self.chunk_count_x as f32 * CHUNK_WORLD_SPACE_SIZE
    }

    pub fn world_space_depth(&self) -> f32 {
        self.chunk_count_z as f32 * CHUNK_WORLD_SPACE_SIZE
    }

    /// Terrain height in world units, `None` outside the loaded world.
    pub fn height_at_world_xz(&self, x: f32, z: f32) -> Option<f32> {
        self.height_texture
            .sample_bilinear(x / HEIGHTMAP_SCALE_XZ, z / HEIGHTMAP_SCALE_XZ)
            .map(|h| h * HEIGHTMAP_SCALE_Y)
    }

    /// Lays a road through `control_points`, snapped to the current terrain.
    pub fn add_road(&mut self, control_points: &[Vec2], curve: RoadCurveType, spacing: f32) {
        let road = Road::from_control_points(control_points, curve, spacing, self);
        self.roads.push(road);
    }

    /// Re-snaps every road to the current height texture.
    pub fn resnap_roads(&mut self) {
        let mut roads = std::mem::take(&mut self.roads);
        for road in &mut roads {
            road.resnap(self);
        }
        self.roads = roads;
    }

    /// The chunk containing a world-space XZ position.
    pub fn chunk_at_world_xz(&self, x: f32, z: f32) -> Option<ChunkCoord> {
        if x < 0.0 || z < 0.0 {
            return None;
        }
        let coord = ChunkCoord::new(
            (x / CHUNK_WORLD_SPACE_SIZE) as u32,
            (z / CHUNK_WORLD_SPACE_SIZE) as u32,
        );
        self.chunk_exists(coord).then_some(coord)
    }
}
