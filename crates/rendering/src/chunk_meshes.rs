//! One Bevy mesh entity per terrain chunk, copied out of the shared terrain
//! buffer whenever the generator rewrites that chunk.

use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::view::{NoFrustumCulling, RenderLayers};

use terrain::world::{HeightMapChunk, TerrainWorld};

use crate::camera::viewport_render_layer;
use crate::chunk_renderer::HeightMapDrawList;
use crate::terrain_material::TerrainMaterialSet;

#[derive(Component, Debug)]
pub struct TerrainChunkMesh {
    pub chunk_index: usize,
    revision: u64,
}

/// Chunk grid the current entities were spawned for.
#[derive(Default)]
pub struct SpawnedLayout {
    chunk_count_x: u32,
    chunk_count_z: u32,
    spawned: bool,
}

/// Builds a standalone mesh for `chunk`, rebasing its indices to zero.
pub fn build_chunk_mesh(world: &TerrainWorld, chunk: &HeightMapChunk) -> Mesh {
    let vertices = world.mesh.chunk_vertices(chunk);
    let mut positions = Vec::with_capacity(vertices.len());
    let mut normals = Vec::with_capacity(vertices.len());
    let mut uvs = Vec::with_capacity(vertices.len());
    let mut tangents = Vec::with_capacity(vertices.len());
    for v in vertices {
        positions.push(v.position.to_array());
        normals.push(v.normal.to_array());
        uvs.push(v.uv.to_array());
        tangents.push([v.tangent.x, v.tangent.y, v.tangent.z, 1.0]);
    }
    let indices: Vec<u32> = world
        .mesh
        .chunk_indices(chunk)
        .iter()
        .map(|i| i - chunk.base_vertex)
        .collect();

    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
    .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
    .with_inserted_attribute(Mesh::ATTRIBUTE_TANGENT, tangents)
    .with_inserted_indices(Indices::U32(indices))
}

/// Respawns chunk entities when the chunk grid changes and refreshes the
/// meshes of chunks the generator has rewritten since the last frame.
#[allow(clippy::too_many_arguments)]
pub fn sync_chunk_meshes(
    mut commands: Commands,
    world: Res<TerrainWorld>,
    material_set: Option<Res<TerrainMaterialSet>>,
    images: Res<Assets<Image>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut chunk_meshes: Query<(Entity, &mut TerrainChunkMesh, &Mesh3d)>,
    mut layout: Local<SpawnedLayout>,
    mut missing_logged: Local<bool>,
) {
    let Some(material) = material_set.as_ref().and_then(|set| set.resolve(&images)) else {
        if !*missing_logged {
            let missing = material_set
                .as_ref()
                .map(|set| set.missing_textures(&images))
                .unwrap_or_default();
            error!(
                "Terrain draw skipped: material set unavailable (missing textures: {:?})",
                missing
            );
            *missing_logged = true;
        }
        return;
    };
    *missing_logged = false;

    let grid_changed = !layout.spawned
        || layout.chunk_count_x != world.chunk_count_x()
        || layout.chunk_count_z != world.chunk_count_z();
    if grid_changed {
        for (entity, _, _) in &chunk_meshes {
            commands.entity(entity).despawn();
        }
        for (chunk_index, chunk) in world.chunks().iter().enumerate() {
            commands.spawn((
                Mesh3d(meshes.add(build_chunk_mesh(&world, chunk))),
                MeshMaterial3d(material.clone()),
                Transform::IDENTITY,
                NoFrustumCulling,
                RenderLayers::none(),
                TerrainChunkMesh {
                    chunk_index,
                    revision: world.mesh.chunk_revision(chunk_index),
                },
            ));
        }
        debug!("Spawned {} terrain chunk meshes", world.chunk_count());
        *layout = SpawnedLayout {
            chunk_count_x: world.chunk_count_x(),
            chunk_count_z: world.chunk_count_z(),
            spawned: true,
        };
        return;
    }

    for (_, mut chunk_mesh, mesh3d) in &mut chunk_meshes {
        let revision = world.mesh.chunk_revision(chunk_mesh.chunk_index);
        if revision == chunk_mesh.revision {
            continue;
        }
        let Some(chunk) = world.chunks().get(chunk_mesh.chunk_index) else {
            continue;
        };
        if let Some(mesh) = meshes.get_mut(&mesh3d.0) {
            *mesh = build_chunk_mesh(&world, chunk);
        }
        chunk_mesh.revision = revision;
    }
}

/// Puts each chunk entity on the render layers of exactly the viewports
/// whose draw list contains it. Chunks no viewport draws are hidden.
pub fn apply_draw_list_visibility(
    draw_list: Res<HeightMapDrawList>,
    mut chunk_meshes: Query<(&TerrainChunkMesh, &mut Visibility, &mut RenderLayers)>,
) {
    if !draw_list.is_changed() {
        return;
    }
    let viewports = draw_list.viewports_by_chunk();
    for (chunk_mesh, mut visibility, mut layers) in &mut chunk_meshes {
        let drawn_by = viewports
            .get(chunk_mesh.chunk_index)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let wanted = if drawn_by.is_empty() {
            Visibility::Hidden
        } else {
            Visibility::Inherited
        };
        let on_layers: Vec<usize> = drawn_by.iter().map(|i| viewport_render_layer(*i)).collect();
        visibility.set_if_neq(wanted);
        layers.set_if_neq(RenderLayers::from_layers(&on_layers));
    }
}
