//! Rasterizes road centrelines into the world-aligned road mask.

use bevy::prelude::*;

use crate::config::HEIGHTMAP_SCALE_XZ;
use crate::raster::PixelRegion;
use crate::world::TerrainWorld;

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct RoadMaskSettings {
    /// Full road width in world units.
    pub road_width: f32,
    /// Distance either side of the road edge over which the weight fades.
    pub feather: f32,
    pub exponent: f32,
}

impl Default for RoadMaskSettings {
    fn default() -> Self {
        Self {
            road_width: 4.3,
            feather: 0.3,
            exponent: 1.0,
        }
    }
}

/// World-space XZ extent covered by the road mask: the whole height texture,
/// including its final texel.
pub fn road_mask_span(world: &TerrainWorld) -> Vec2 {
    Vec2::new(world.texture_width() as f32, world.texture_height() as f32) * HEIGHTMAP_SCALE_XZ
}

/// Road weight for a point `distance` world units from the centreline.
/// 1 inside the road core, 0 beyond the feathered edge.
pub fn road_weight(distance: f32, settings: &RoadMaskSettings) -> f32 {
    let half_width = settings.road_width * 0.5;
    let edge0 = half_width - settings.feather;
    let edge1 = half_width + settings.feather;
    let fade = if edge1 <= edge0 {
        if distance < half_width {
            0.0
        } else {
            1.0
        }
    } else {
        smoothstep(edge0, edge1, distance)
    };
    (1.0 - fade).powf(settings.exponent.max(0.0)).clamp(0.0, 1.0)
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Shortest XZ distance from `point` to the polyline.
pub fn distance_to_polyline(point: Vec2, polyline: &[Vec2]) -> f32 {
    polyline
        .windows(2)
        .map(|segment| distance_to_segment(point, segment[0], segment[1]))
        .fold(f32::MAX, f32::min)
}

fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let length_squared = ab.length_squared();
    if length_squared <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / length_squared).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Clears and re-rasterizes the road mask from the first road. Skipped,
/// leaving the mask untouched, when there is no road with at least two points.
pub fn blit_road_mask(world: &mut TerrainWorld, settings: &RoadMaskSettings) -> bool {
    let Some(road) = world.roads.first() else {
        return false;
    };
    if road.world_points.len() < 2 {
        return false;
    }
    if !world.road_mask.is_allocated() {
        return false;
    }

    let polyline: Vec<Vec2> = road.world_points.iter().map(|p| p.xz()).collect();
    let mask_width = world.road_mask.width() as f32;
    let mask_height = world.road_mask.height() as f32;
    let span = road_mask_span(world);
    let settings = *settings;

    let region = PixelRegion::full(world.road_mask.width(), world.road_mask.height());
    world.road_mask.dispatch(region, |x, z, _| {
        let point = Vec2::new(
            (x as f32 + 0.5) / mask_width * span.x,
            (z as f32 + 0.5) / mask_height * span.y,
        );
        road_weight(distance_to_polyline(point, &polyline), &settings)
    });
    true
}
