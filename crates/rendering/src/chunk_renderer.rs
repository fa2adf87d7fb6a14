//! Per-viewport chunk culling into a flat draw list.
//!
//! Each viewport's frustum is tested against every chunk's bounds. Culling
//! is skipped while the map editor is open so chunks under the brush never
//! disappear mid-stroke because their bounds are stale.

use bevy::math::Affine3A;
use bevy::prelude::*;
use bevy::render::primitives::{Aabb, Frustum};

use terrain::config::{INDICES_PER_CHUNK, MAX_VIEWPORTS};
use terrain::editor::EditorState;
use terrain::world::{HeightMapChunk, TerrainWorld};

use crate::camera::TerrainViewport;

/// One indexed draw of a chunk's range in the terrain index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDraw {
    pub viewport_index: usize,
    pub chunk_index: usize,
    pub base_index: u32,
    pub index_count: u32,
}

#[derive(Resource, Debug, Default)]
pub struct HeightMapDrawList {
    pub draws: Vec<ChunkDraw>,
}

impl HeightMapDrawList {
    /// Viewport indices drawing each chunk, indexed by chunk. Chunks past the
    /// last drawn one are left out.
    pub fn viewports_by_chunk(&self) -> Vec<Vec<usize>> {
        let len = self.draws.iter().map(|d| d.chunk_index + 1).max().unwrap_or(0);
        let mut by_chunk = vec![Vec::new(); len];
        for draw in &self.draws {
            let viewports = &mut by_chunk[draw.chunk_index];
            if !viewports.contains(&draw.viewport_index) {
                viewports.push(draw.viewport_index);
            }
        }
        by_chunk
    }
}

pub fn build_height_map_draw_list(
    chunks: &[HeightMapChunk],
    viewports: &[(usize, Frustum)],
    culling: bool,
) -> Vec<ChunkDraw> {
    let mut draws = Vec::new();
    for (viewport_index, frustum) in viewports.iter().take(MAX_VIEWPORTS) {
        for (chunk_index, chunk) in chunks.iter().enumerate() {
            if culling {
                let aabb = Aabb::from_min_max(chunk.aabb.min, chunk.aabb.max);
                if !frustum.intersects_obb(&aabb, &Affine3A::IDENTITY, true, false) {
                    continue;
                }
            }
            draws.push(ChunkDraw {
                viewport_index: *viewport_index,
                chunk_index,
                base_index: chunk.base_index,
                index_count: INDICES_PER_CHUNK as u32,
            });
        }
    }
    draws
}

pub fn update_height_map_draw_list(
    world: Res<TerrainWorld>,
    editor: Res<EditorState>,
    cameras: Query<(&TerrainViewport, &Frustum)>,
    mut draw_list: ResMut<HeightMapDrawList>,
    mut warned: Local<bool>,
) {
    let mut viewports: Vec<(usize, Frustum)> =
        cameras.iter().map(|(v, f)| (v.index, *f)).collect();
    viewports.sort_by_key(|(index, _)| *index);
    if viewports.len() > MAX_VIEWPORTS && !*warned {
        warn!(
            "{} terrain viewports active, only the first {} are drawn",
            viewports.len(),
            MAX_VIEWPORTS
        );
        *warned = true;
    }
    draw_list.draws =
        build_height_map_draw_list(world.chunks(), &viewports, editor.culling_enabled());
}
