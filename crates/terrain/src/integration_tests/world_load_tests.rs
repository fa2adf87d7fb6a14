use crate::config::{INDICES_PER_CHUNK, VERTICES_PER_CHUNK};
use crate::test_harness::TestTerrain;

// ====================================================================
// Loading and compositing placed maps
// ====================================================================

#[test]
fn test_default_map_builds_every_chunk_flat() {
    let terrain = TestTerrain::new()
        .with_map("Shit", 8, 16, 30.0)
        .with_instances(&[("Shit", 0, 0)]);

    let world = terrain.world();
    assert_eq!((world.chunk_count_x(), world.chunk_count_z()), (8, 16));
    assert_eq!(world.chunk_count(), 128);
    assert_eq!(world.mesh.vertices().len(), 128 * VERTICES_PER_CHUNK);
    assert_eq!(world.mesh.indices().len(), 128 * INDICES_PER_CHUNK);

    for chunk in world.chunks() {
        assert_eq!(chunk.aabb.min.y, 30.0, "chunk {:?}", chunk.coord);
        assert_eq!(chunk.aabb.max.y, 30.0, "chunk {:?}", chunk.coord);
    }
    assert_eq!(terrain.registry().live_fields().count(), 128);
}

#[test]
fn test_offset_instances_extend_world_and_bounds() {
    let mut terrain = TestTerrain::new()
        .with_map("low", 4, 4, 10.0)
        .with_map("high", 4, 4, 20.0)
        .with_instances(&[("low", 0, 0), ("high", 8, 4)]);

    let world = terrain.world();
    assert_eq!((world.chunk_count_x(), world.chunk_count_z()), (12, 8));

    let chunk = terrain.chunk(9, 5);
    assert_eq!(chunk.aabb.min.x, 72.0);
    assert_eq!(chunk.aabb.max.x, 80.0);
    assert_eq!(chunk.aabb.min.z, 40.0);
    assert_eq!(chunk.aabb.max.z, 48.0);
    assert_eq!(chunk.aabb.max.y, 20.0);

    assert_eq!(terrain.chunk(1, 1).aabb.max.y, 10.0);
    // Between the two footprints nothing is composited.
    assert_eq!(terrain.chunk(5, 1).aabb.max.y, 0.0);

    let events = terrain.recalculated_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].blitted_instances, 2);
    assert_eq!(events[0].chunks_generated, 96);
}

#[test]
fn test_base_ranges_are_disjoint_and_cover_buffer() {
    let terrain = TestTerrain::new()
        .with_map("a", 3, 5, 5.0)
        .with_instances(&[("a", 0, 0), ("a", 2, 1)]);
    let world = terrain.world();

    let mut ranges: Vec<(u32, u32)> = world
        .chunks()
        .iter()
        .map(|c| (c.base_vertex, c.base_index))
        .collect();
    ranges.sort_unstable();
    for (i, (base_vertex, base_index)) in ranges.iter().enumerate() {
        assert_eq!(*base_vertex as usize, i * VERTICES_PER_CHUNK);
        assert_eq!(*base_index as usize, i * INDICES_PER_CHUNK);
    }
}

#[test]
fn test_reload_replaces_collision() {
    let mut terrain = TestTerrain::new()
        .with_map("a", 2, 2, 5.0)
        .with_map("b", 1, 1, 5.0)
        .with_instances(&[("a", 0, 0)]);
    assert_eq!(terrain.registry().fields().len(), 4);

    terrain.load_instances(&[("b", 0, 0)]);
    assert_eq!(terrain.world().chunk_count(), 1);
    assert_eq!(terrain.registry().fields().len(), 1);
}

#[test]
fn test_unknown_map_contributes_nothing() {
    let terrain = TestTerrain::new()
        .with_map("a", 2, 2, 5.0)
        .with_instances(&[("nope", 6, 6), ("a", 0, 0)]);
    let world = terrain.world();
    assert_eq!(world.chunk_count(), 4);
    assert_eq!(world.map_instances().len(), 1);
}
