//! Builds the shared terrain vertex/index buffer from the world height texture.
//!
//! Every chunk owns the contiguous range starting at its `base_vertex` and
//! `base_index`. Chunks are generated in parallel, each task writing only
//! its own slice of the buffers.

use std::collections::HashSet;

use bevy::prelude::*;
use bevy::tasks::{ComputeTaskPool, TaskPool};

use crate::config::{
    CHUNK_VERTEX_EDGE, HEIGHTMAP_SCALE_XZ, HEIGHTMAP_SCALE_Y, HEIGHT_MAP_CHUNK_PIXEL_SIZE,
    INDICES_PER_CHUNK, VERTICES_PER_CHUNK,
};
use crate::raster::Raster;
use crate::world::{ChunkCoord, HeightMapChunk, TerrainWorld};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TerrainVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub tangent: Vec3,
}

#[derive(Debug, Default)]
pub struct TerrainMesh {
    vertices: Vec<TerrainVertex>,
    indices: Vec<u32>,
    revision: u64,
    chunk_revisions: Vec<u64>,
}

impl TerrainMesh {
    /// Sizes the buffers for `chunk_count` chunks. Backing storage only ever grows.
    pub fn allocate(&mut self, chunk_count: usize) {
        let vertex_count = chunk_count * VERTICES_PER_CHUNK;
        let index_count = chunk_count * INDICES_PER_CHUNK;
        if self.vertices.capacity() < vertex_count {
            info!(
                "Growing terrain mesh buffer to {} vertices / {} indices",
                vertex_count, index_count
            );
        }
        self.vertices.resize(vertex_count, TerrainVertex::default());
        self.indices.resize(index_count, 0);
        self.chunk_revisions.resize(chunk_count, 0);
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertices.capacity()
    }

    /// Bumped on every generation pass.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Revision of the pass that last wrote the chunk at `chunk_index`.
    pub fn chunk_revision(&self, chunk_index: usize) -> u64 {
        self.chunk_revisions.get(chunk_index).copied().unwrap_or(0)
    }

    pub fn chunk_vertices(&self, chunk: &HeightMapChunk) -> &[TerrainVertex] {
        let start = chunk.base_vertex as usize;
        self.vertices
            .get(start..start + VERTICES_PER_CHUNK)
            .unwrap_or(&[])
    }

    pub fn chunk_indices(&self, chunk: &HeightMapChunk) -> &[u32] {
        let start = chunk.base_index as usize;
        self.indices
            .get(start..start + INDICES_PER_CHUNK)
            .unwrap_or(&[])
    }

    fn is_sized_for(&self, chunk_count: usize) -> bool {
        self.vertices.len() == chunk_count * VERTICES_PER_CHUNK
            && self.indices.len() == chunk_count * INDICES_PER_CHUNK
    }
}

/// Regenerates every chunk. Returns the number of chunks written.
pub fn generate_height_map_vertex_data(world: &mut TerrainWorld) -> usize {
    world.mesh.allocate(world.chunk_count());
    generate(world, |_| true)
}

/// Regenerates only the listed chunks. Falls back to a full pass when the
/// buffer is not sized for the current chunk list.
pub fn generate_dirty_chunks(world: &mut TerrainWorld, dirty: &HashSet<ChunkCoord>) -> usize {
    if dirty.is_empty() {
        return 0;
    }
    if !world.mesh.is_sized_for(world.chunk_count()) {
        return generate_height_map_vertex_data(world);
    }
    generate(world, |coord| dirty.contains(&coord))
}

fn generate<F>(world: &mut TerrainWorld, include: F) -> usize
where
    F: Fn(ChunkCoord) -> bool,
{
    let span = Vec2::new(
        (world.texture_width().max(2) - 1) as f32,
        (world.texture_height().max(2) - 1) as f32,
    );
    let height = world.height_texture.snapshot();
    let chunks: Vec<HeightMapChunk> = world.chunks().to_vec();
    let mesh = &mut world.mesh;
    mesh.revision += 1;
    let revision = mesh.revision;

    let mut written = 0;
    let pool = ComputeTaskPool::get_or_init(TaskPool::default);
    let height = &height;
    pool.scope(|scope| {
        let slices = mesh
            .vertices
            .chunks_mut(VERTICES_PER_CHUNK)
            .zip(mesh.indices.chunks_mut(INDICES_PER_CHUNK))
            .zip(mesh.chunk_revisions.iter_mut())
            .zip(chunks.iter());
        for (((vertices, indices), chunk_revision), chunk) in slices {
            if !include(chunk.coord) {
                continue;
            }
            *chunk_revision = revision;
            written += 1;
            scope.spawn(async move {
                write_chunk(height, chunk, span, vertices, indices);
            });
        }
    });
    written
}

fn write_chunk(
    height: &Raster,
    chunk: &HeightMapChunk,
    span: Vec2,
    vertices: &mut [TerrainVertex],
    indices: &mut [u32],
) {
    let edge = CHUNK_VERTEX_EDGE as usize;
    let origin_x = (chunk.coord.x * HEIGHT_MAP_CHUNK_PIXEL_SIZE) as i64;
    let origin_z = (chunk.coord.z * HEIGHT_MAP_CHUNK_PIXEL_SIZE) as i64;
    let sample = |x: i64, z: i64| height.texel_clamped(x, z) * HEIGHTMAP_SCALE_Y;

    for (i, vertex) in vertices.iter_mut().enumerate() {
        let gx = origin_x + (i % edge) as i64;
        let gz = origin_z + (i / edge) as i64;
        let dx = (sample(gx + 1, gz) - sample(gx - 1, gz)) / (2.0 * HEIGHTMAP_SCALE_XZ);
        let dz = (sample(gx, gz + 1) - sample(gx, gz - 1)) / (2.0 * HEIGHTMAP_SCALE_XZ);
        *vertex = TerrainVertex {
            position: Vec3::new(
                gx as f32 * HEIGHTMAP_SCALE_XZ,
                sample(gx, gz),
                gz as f32 * HEIGHTMAP_SCALE_XZ,
            ),
            normal: Vec3::new(-dx, 1.0, -dz).normalize(),
            uv: Vec2::new(gx as f32, gz as f32) / span,
            tangent: Vec3::new(1.0, dx, 0.0).normalize(),
        };
    }

    let cells = HEIGHT_MAP_CHUNK_PIXEL_SIZE as usize;
    for (cell, quad) in indices.chunks_mut(6).enumerate() {
        let row = cell / cells;
        let col = cell % cells;
        let i = chunk.base_vertex + (row * edge + col) as u32;
        let below = i + edge as u32;
        quad.copy_from_slice(&[i, below, i + 1, i + 1, below, below + 1]);
    }
}
