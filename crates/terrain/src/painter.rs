//! Interactive height painting.
//!
//! A stroke starts on the first frame a mouse button is held in height-edit
//! mode and ends when it is released. Each painted frame runs the brush
//! kernel on the height texture and regenerates only the chunks it touched;
//! collision is resynchronized once, when the stroke ends.

use std::collections::HashSet;

use bevy::prelude::*;
use fastnoise_lite::{FastNoiseLite, NoiseType};

use crate::config::{
    BRUSH_RATE, HEIGHTMAP_SCALE_XZ, HEIGHTMAP_SCALE_Y, HEIGHT_MAP_CHUNK_PIXEL_SIZE,
};
use crate::editor::EditorState;
use crate::mesh_gen::generate_dirty_chunks;
use crate::mouse_ray::MouseRayReadback;
use crate::raster::{PixelRegion, Raster};
use crate::world::{ChunkCoord, TerrainWorld};

const NOISE_SEED: i32 = 1337;
const NOISE_FREQUENCY: f32 = 0.1;

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct BrushSettings {
    /// Radius in height texels.
    pub size: f32,
    pub strength: f32,
    /// 0 paints a smooth falloff, 1 fully modulates it with noise.
    pub noise_strength: f32,
    pub noise_scale: f32,
    /// Painting never pushes heights outside this range (world units).
    pub min_paint_height: f32,
    pub max_paint_height: f32,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 16.0,
            strength: 1.0,
            noise_strength: 1.0,
            noise_scale: 0.5,
            min_paint_height: 0.0,
            max_paint_height: HEIGHTMAP_SCALE_Y,
        }
    }
}

/// Mouse state as seen by the painter, filled in by the input layer.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintInput {
    pub primary_down: bool,
    pub secondary_down: bool,
    /// The UI has claimed the pointer this frame.
    pub ui_owns_mouse: bool,
}

impl PaintInput {
    fn any_down(&self) -> bool {
        self.primary_down || self.secondary_down
    }

    /// Raising with the primary button, lowering with the secondary.
    fn direction(&self) -> f32 {
        if self.secondary_down {
            -1.0
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintState {
    #[default]
    Idle,
    Painting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaintOutcome {
    /// Nothing was painted this frame.
    Skipped,
    Painted { chunks_regenerated: usize },
    /// The stroke ended. Carries every chunk it touched.
    StrokeFinished { touched: HashSet<ChunkCoord> },
}

#[derive(Resource)]
pub struct PaintSession {
    state: PaintState,
    stroke_chunks: HashSet<ChunkCoord>,
    noise: FastNoiseLite,
}

impl Default for PaintSession {
    fn default() -> Self {
        let mut noise = FastNoiseLite::with_seed(NOISE_SEED);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(NOISE_FREQUENCY));
        Self {
            state: PaintState::Idle,
            stroke_chunks: HashSet::new(),
            noise,
        }
    }
}

impl PaintSession {
    pub fn state(&self) -> PaintState {
        self.state
    }

    /// Advances the session by one frame.
    pub fn update(
        &mut self,
        world: &mut TerrainWorld,
        editor: &EditorState,
        brush: &BrushSettings,
        input: PaintInput,
        mouse_ray: &MouseRayReadback,
    ) -> PaintOutcome {
        let can_paint = editor.is_height_editing() && !input.ui_owns_mouse;

        match self.state {
            PaintState::Idle => {
                if !(can_paint && input.any_down()) {
                    return PaintOutcome::Skipped;
                }
                self.state = PaintState::Painting;
            }
            PaintState::Painting => {
                if !input.any_down() || !editor.is_height_editing() {
                    self.state = PaintState::Idle;
                    return PaintOutcome::StrokeFinished {
                        touched: std::mem::take(&mut self.stroke_chunks),
                    };
                }
                if input.ui_owns_mouse {
                    return PaintOutcome::Skipped;
                }
            }
        }

        let Some(hit) = mouse_ray.world_position() else {
            return PaintOutcome::Skipped;
        };

        let region = paint_height_map(
            &mut world.height_texture,
            hit.xz(),
            brush,
            input.direction(),
            &self.noise,
        );
        if region.is_empty() {
            return PaintOutcome::Skipped;
        }
        // Normals read one texel either side, so neighbours of the region are dirty too.
        let touched = chunks_in_region(world, region.expanded(1));
        let chunks_regenerated = generate_dirty_chunks(world, &touched);
        self.stroke_chunks.extend(touched);
        PaintOutcome::Painted { chunks_regenerated }
    }
}

/// Applies one frame of the brush centred on `center` (world XZ). Positive
/// `direction` raises, negative lowers. Returns the texel region it covered.
pub fn paint_height_map(
    height: &mut Raster,
    center: Vec2,
    brush: &BrushSettings,
    direction: f32,
    noise: &FastNoiseLite,
) -> PixelRegion {
    let radius = brush.size.max(1.0);
    let center_texel = center / HEIGHTMAP_SCALE_XZ;
    let (lo, hi) = {
        let a = brush.min_paint_height / HEIGHTMAP_SCALE_Y;
        let b = brush.max_paint_height / HEIGHTMAP_SCALE_Y;
        (a.min(b), a.max(b))
    };

    let min = (center_texel - Vec2::splat(radius)).floor().max(Vec2::ZERO);
    let max = (center_texel + Vec2::splat(radius)).ceil();
    if max.x < 0.0 || max.y < 0.0 {
        return PixelRegion::default();
    }
    let region = PixelRegion::new(
        min.x as u32,
        min.y as u32,
        (max.x - min.x) as u32 + 1,
        (max.y - min.y) as u32 + 1,
    )
    .clipped_to(height.width(), height.height());

    let rate = direction.signum() * brush.strength.max(0.0) * BRUSH_RATE;
    let noise_strength = brush.noise_strength.clamp(0.0, 1.0);
    let noise_scale = brush.noise_scale;
    height.dispatch(region, |x, z, current| {
        let distance = Vec2::new(x as f32, z as f32).distance(center_texel);
        if distance > radius {
            return current;
        }
        let t = distance / radius;
        let falloff = (1.0 - t * t) * (1.0 - t * t);
        let modulation = if noise_strength > 0.0 {
            let n = noise.get_noise_2d(x as f32 * noise_scale, z as f32 * noise_scale) * 0.5 + 0.5;
            1.0 - noise_strength + noise_strength * n
        } else {
            1.0
        };
        let painted = current + rate * falloff * modulation;
        if rate > 0.0 {
            painted.max(current).clamp(lo, hi.max(current))
        } else {
            painted.min(current).clamp(lo.min(current), hi)
        }
    });
    region
}

/// Every chunk whose vertex grid includes a texel of `region`.
pub fn chunks_in_region(world: &TerrainWorld, region: PixelRegion) -> HashSet<ChunkCoord> {
    let mut chunks = HashSet::new();
    if region.is_empty() || world.chunk_count() == 0 {
        return chunks;
    }
    let size = HEIGHT_MAP_CHUNK_PIXEL_SIZE;
    let last_x = region.x + region.width - 1;
    let last_z = region.z + region.height - 1;
    let x_range = region.x.saturating_sub(1) / size..=(last_x / size).min(world.chunk_count_x() - 1);
    let z_range = region.z.saturating_sub(1) / size..=(last_z / size).min(world.chunk_count_z() - 1);
    for x in x_range {
        for z in z_range.clone() {
            let coord = ChunkCoord::new(x, z);
            if world.chunk_exists(coord) {
                chunks.insert(coord);
            }
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::blit_world_map;
    use crate::editor::EditorMode;
    use crate::map::MapStore;
    use crate::mesh_gen::generate_height_map_vertex_data;
    use crate::world::MapInstanceCreateInfo;

    fn world(height: f32) -> TerrainWorld {
        let mut store = MapStore::default();
        store.new_map("a", 4, 4, height);
        let mut world = TerrainWorld::default();
        world.load_map_instances(&store, &[MapInstanceCreateInfo::new("a", 0, 0)]);
        blit_world_map(&mut world, &store);
        generate_height_map_vertex_data(&mut world);
        world
    }

    fn height_editor() -> EditorState {
        EditorState {
            open: true,
            mode: EditorMode::MapHeightEditor,
        }
    }

    fn ray_at(x: f32, z: f32) -> MouseRayReadback {
        let mut ray = MouseRayReadback::default();
        ray.set_result(Some(Vec3::new(x, 0.0, z)));
        ray
    }

    const PRIMARY: PaintInput = PaintInput {
        primary_down: true,
        secondary_down: false,
        ui_owns_mouse: false,
    };

    const SECONDARY: PaintInput = PaintInput {
        primary_down: false,
        secondary_down: true,
        ui_owns_mouse: false,
    };

    #[test]
    fn test_raise_never_lowers_and_stays_local() {
        let mut world = world(10.0);
        let before = world.height_texture.snapshot();
        let mut session = PaintSession::default();
        let brush = BrushSettings::default();
        session.update(&mut world, &height_editor(), &brush, PRIMARY, &ray_at(16.0, 16.0));

        let center = Vec2::new(64.0, 64.0);
        for z in 0..world.texture_height() {
            for x in 0..world.texture_width() {
                let (x, z) = (x as i64, z as i64);
                let old = before.texel_clamped(x, z);
                let new = world.height_texture.texel_clamped(x, z);
                assert!(new >= old);
                if Vec2::new(x as f32, z as f32).distance(center) > brush.size {
                    assert_eq!(new, old);
                }
            }
        }
        let raised = (0..world.texture_width() as i64)
            .filter(|&x| world.height_texture.texel_clamped(x, 64) > before.texel_clamped(x, 64))
            .count();
        assert!(raised > 0);
    }

    #[test]
    fn test_secondary_button_lowers() {
        let mut world = world(10.0);
        let before = world.height_texture.texel_clamped(64, 64);
        let brush = BrushSettings {
            noise_strength: 0.0,
            ..Default::default()
        };
        let mut session = PaintSession::default();
        session.update(
            &mut world,
            &height_editor(),
            &brush,
            SECONDARY,
            &ray_at(16.0, 16.0),
        );
        assert!(world.height_texture.texel_clamped(64, 64) < before);
    }

    #[test]
    fn test_paint_respects_height_limits() {
        let mut world = world(10.0);
        let brush = BrushSettings {
            strength: 1000.0,
            max_paint_height: 12.0,
            noise_strength: 0.0,
            ..Default::default()
        };
        let mut session = PaintSession::default();
        session.update(&mut world, &height_editor(), &brush, PRIMARY, &ray_at(16.0, 16.0));
        assert_eq!(world.height_texture.texel_clamped(64, 64), 12.0 / HEIGHTMAP_SCALE_Y);
    }

    #[test]
    fn test_held_stroke_rises_monotonically_to_cap() {
        let mut world = world(10.0);
        let max_paint_height = 25.0;
        let brush = BrushSettings {
            strength: 10.0,
            max_paint_height,
            noise_strength: 0.0,
            ..Default::default()
        };
        let mut session = PaintSession::default();
        let mut previous = world.height_texture.texel_clamped(64, 64) * HEIGHTMAP_SCALE_Y;
        for _ in 0..40 {
            session.update(&mut world, &height_editor(), &brush, PRIMARY, &ray_at(16.0, 16.0));
            let center = world.height_texture.texel_clamped(64, 64) * HEIGHTMAP_SCALE_Y;
            assert!(center >= previous, "center dropped from {previous} to {center}");
            assert!(center <= max_paint_height + 1e-4, "center {center} above cap");
            previous = center;
        }
        assert!((previous - max_paint_height).abs() < 1e-4);
    }

    #[test]
    fn test_gating_skips_painting() {
        let mut world = world(10.0);
        let before = world.height_texture.snapshot();
        let brush = BrushSettings::default();

        let mut session = PaintSession::default();
        let closed = EditorState::default();
        assert_eq!(
            session.update(&mut world, &closed, &brush, PRIMARY, &ray_at(16.0, 16.0)),
            PaintOutcome::Skipped
        );

        let ui_input = PaintInput {
            ui_owns_mouse: true,
            ..PRIMARY
        };
        assert_eq!(
            session.update(&mut world, &height_editor(), &brush, ui_input, &ray_at(16.0, 16.0)),
            PaintOutcome::Skipped
        );

        assert_eq!(
            session.update(
                &mut world,
                &height_editor(),
                &brush,
                PRIMARY,
                &MouseRayReadback::default()
            ),
            PaintOutcome::Skipped
        );
        assert_eq!(session.state(), PaintState::Painting);
        assert_eq!(world.height_texture, before);
    }

    #[test]
    fn test_stroke_reports_touched_chunks_on_release() {
        let mut world = world(10.0);
        let brush = BrushSettings::default();
        let mut session = PaintSession::default();
        // Texel (64, 64) is the corner shared by chunks (1..=2, 1..=2).
        let outcome =
            session.update(&mut world, &height_editor(), &brush, PRIMARY, &ray_at(16.0, 16.0));
        assert_eq!(outcome, PaintOutcome::Painted { chunks_regenerated: 4 });

        let released = session.update(
            &mut world,
            &height_editor(),
            &brush,
            PaintInput::default(),
            &ray_at(16.0, 16.0),
        );
        let PaintOutcome::StrokeFinished { touched } = released else {
            panic!("expected stroke to finish, got {released:?}");
        };
        assert_eq!(touched.len(), 4);
        assert!(touched.contains(&ChunkCoord::new(2, 2)));
        assert_eq!(session.state(), PaintState::Idle);
    }

    #[test]
    fn test_painted_chunks_mesh_matches_texture() {
        let mut world = world(10.0);
        let mut session = PaintSession::default();
        session.update(
            &mut world,
            &height_editor(),
            &BrushSettings::default(),
            PRIMARY,
            &ray_at(16.0, 16.0),
        );
        let painted = world.mesh.vertices().to_vec();
        generate_height_map_vertex_data(&mut world);
        assert_eq!(world.mesh.vertices(), painted.as_slice());
    }

    #[test]
    fn test_chunks_in_region_includes_shared_borders() {
        let world = world(0.0);
        let touched = chunks_in_region(&world, PixelRegion::new(32, 0, 1, 1));
        assert_eq!(
            touched,
            [ChunkCoord::new(0, 0), ChunkCoord::new(1, 0)].into_iter().collect()
        );
        let inner = chunks_in_region(&world, PixelRegion::new(40, 40, 2, 2));
        assert_eq!(inner, [ChunkCoord::new(1, 1)].into_iter().collect());
        let far_edge = chunks_in_region(&world, PixelRegion::new(128, 128, 1, 1));
        assert_eq!(far_edge, [ChunkCoord::new(3, 3)].into_iter().collect());
    }
}
